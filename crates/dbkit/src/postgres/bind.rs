//! Rewrites named `@param` markers into PostgreSQL's positional `$n` form.

use std::borrow::Cow;

use crate::error::{DbError, DbResult};
use crate::param::{Params, Value};

/// SQL with positional markers plus the values in `$1..$n` order.
#[derive(Debug)]
pub(crate) struct BoundSql<'a, 'p> {
    pub sql: Cow<'a, str>,
    pub values: Vec<&'p Value>,
}

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    /// `E'...'`, where a backslash escapes the next character.
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Replace every `@name` outside literals, quoted identifiers and comments
/// with `$n`. A name used twice binds the same position twice; `@@` is left
/// alone. Names missing from `params` fail with [`DbError::MissingParameter`].
pub(crate) fn bind_named<'a, 'p>(sql: &'a str, params: &'p Params) -> DbResult<BoundSql<'a, 'p>> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut names: Vec<&'a str> = Vec::new();
    let mut values: Vec<&'p Value> = Vec::new();
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'E' | b'e'
                    if bytes.get(idx + 1) == Some(&b'\'')
                        && (idx == 0 || !is_name_char(bytes[idx - 1])) =>
                {
                    state = State::EscapeQuoted;
                    idx += 1;
                }
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = end;
                    }
                }
                b'@' if bytes.get(idx + 1) == Some(&b'@') => idx += 1,
                b'@' if bytes.get(idx + 1).is_some_and(|c| is_name_start(*c)) => {
                    let end = scan_name(bytes, idx + 1);
                    let name = &sql[idx + 1..end];
                    let position = match names.iter().position(|n| *n == name) {
                        Some(pos) => pos + 1,
                        None => {
                            let value = params
                                .get(name)
                                .ok_or_else(|| DbError::MissingParameter(name.to_string()))?;
                            names.push(name);
                            values.push(value);
                            values.len()
                        }
                    };
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                    buf.push_str(&sql[copied..idx]);
                    buf.push('$');
                    buf.push_str(&position.to_string());
                    copied = end;
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::EscapeQuoted => match b {
                b'\\' => idx += 1,
                b'\'' if bytes.get(idx + 1) == Some(&b'\'') => idx += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    Ok(BoundSql { sql, values })
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && is_name_char(bytes[idx]) {
        idx += 1;
    }
    idx
}

/// `$tag$` opening at `start`; returns the tag and the index of the closing `$`.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') || (idx == start + 1 && b.is_ascii_digit()) {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() {
        let tag = std::str::from_utf8(&bytes[start + 1..idx]).ok()?.to_string();
        Some((tag, idx))
    } else {
        None
    }
}

/// Whether `$tag$` starts at `idx`.
fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end) == Some(tag.as_bytes()) && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params::new()
            .with("characterID", 7)
            .with("name", "Aria")
            .with("cash", 1200)
    }

    #[test]
    fn rewrites_markers_in_order_of_first_use() {
        let params = params();
        let bound = bind_named(
            "UPDATE \"character\" SET \"cash\"=@cash WHERE \"characterID\"=@characterID",
            &params,
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "UPDATE \"character\" SET \"cash\"=$1 WHERE \"characterID\"=$2"
        );
        assert_eq!(bound.values, vec![&Value::Int(1200), &Value::Int(7)]);
    }

    #[test]
    fn repeated_names_reuse_position() {
        let params = params();
        let bound = bind_named("SELECT @name, @cash, @name", &params).unwrap();
        assert_eq!(bound.sql, "SELECT $1, $2, $1");
        assert_eq!(bound.values.len(), 2);
    }

    #[test]
    fn skips_literals_identifiers_and_comments() {
        let params = params();
        let sql = "SELECT 'me@name', \"@cash\", @name -- @cash\n/* @cash /* @x */ */ FROM t";
        let bound = bind_named(sql, &params).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT 'me@name', \"@cash\", $1 -- @cash\n/* @cash /* @x */ */ FROM t"
        );
        assert_eq!(bound.values, vec![&Value::Text("Aria".into())]);
    }

    #[test]
    fn honors_backslash_escapes_in_escape_strings() {
        let params = params();
        let bound = bind_named(r"SELECT E'it\'s @cash', @name", &params).unwrap();
        assert_eq!(bound.sql, r"SELECT E'it\'s @cash', $1");
        assert_eq!(bound.values, vec![&Value::Text("Aria".into())]);

        let bound = bind_named(r"SELECT e'C:\\', @cash", &params).unwrap();
        assert_eq!(bound.sql, r"SELECT e'C:\\', $1");

        // Plain literals keep standard-conforming backslashes.
        let bound = bind_named(r"SELECT 'C:\', @name, some_e'x'", &params).unwrap();
        assert_eq!(bound.sql, r"SELECT 'C:\', $1, some_e'x'");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let params = params();
        let bound = bind_named("SELECT $body$ @cash $body$, @cash, $1", &params).unwrap();
        assert_eq!(bound.sql, "SELECT $body$ @cash $body$, $1, $1");
    }

    #[test]
    fn leaves_system_variables_and_operators() {
        let params = params();
        let bound = bind_named("SELECT @@version, '{}'::jsonb @> '{}'", &params).unwrap();
        assert!(matches!(bound.sql, Cow::Borrowed(_)));
        assert!(bound.values.is_empty());
    }

    #[test]
    fn missing_parameter() {
        let params = params();
        let err = bind_named("SELECT * FROM t WHERE a=@missing", &params).unwrap_err();
        assert!(matches!(err, DbError::MissingParameter(ref name) if name == "missing"));
    }

    #[test]
    fn keeps_non_ascii_text() {
        let params = params();
        let bound = bind_named("SELECT 'héros', @name AS \"nöm\"", &params).unwrap();
        assert_eq!(bound.sql, "SELECT 'héros', $1 AS \"nöm\"");
    }
}
