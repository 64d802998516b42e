//! Per-backend SQL syntax rules.
//!
//! A [`DialectSettings`] value decides how identifiers are escaped and
//! validated, how aliases and parameter markers are written, and which
//! keywords a backend uses for the clauses that differ between databases
//! (insert-ignore, upserts, `REPLACE`).
//!
//! Settings are immutable. Build one per backend and share it (the
//! [`QueryBuilder`](crate::qb::QueryBuilder) keeps it behind an `Arc`).
//!
//! ```ignore
//! use dbkit::DialectSettings;
//!
//! let mysql = DialectSettings::mysql();
//! assert_eq!(mysql.escape_column("name"), "`name`");
//! assert_eq!(mysql.escape_column("t.name"), "t.name");
//! assert_eq!(mysql.parameterize("characterID"), "@characterID");
//! ```

use std::borrow::Cow;

use crate::error::{IdentifierKind, QueryError, QueryResult};
use crate::param::Value;

/// How column names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseRule {
    Sensitive,
    Insensitive,
}

/// How an insert skips rows that collide with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreStyle {
    /// A keyword spliced into the insert verb, e.g. `INSERT IGNORE INTO`.
    Verb(&'static str),
    /// A trailing `ON CONFLICT DO NOTHING`.
    OnConflictDoNothing,
}

/// How an insert updates the existing row on a key collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertStyle {
    /// `ON DUPLICATE KEY UPDATE col=val,...`
    OnDuplicateKeyUpdate,
    /// `ON CONFLICT (keys) DO UPDATE SET col=val,...`
    OnConflictDoUpdate,
}

/// Immutable syntax rules for one database backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectSettings {
    name: &'static str,
    quote_open: char,
    quote_close: char,
    parameter_prefix: char,
    column_case: CaseRule,
    ignore_style: IgnoreStyle,
    upsert_style: UpsertStyle,
    replace_verb: Option<&'static str>,
    unbounded_limit: Option<&'static str>,
    last_insert_id_sql: &'static str,
    now_sql: &'static str,
    unix_timestamp_sql: &'static str,
    auto_increment_value: Option<Value>,
}

impl DialectSettings {
    /// MySQL / MariaDB.
    pub fn mysql() -> Self {
        Self {
            name: "mysql",
            quote_open: '`',
            quote_close: '`',
            parameter_prefix: '@',
            column_case: CaseRule::Insensitive,
            ignore_style: IgnoreStyle::Verb("INSERT IGNORE INTO"),
            upsert_style: UpsertStyle::OnDuplicateKeyUpdate,
            replace_verb: Some("REPLACE INTO"),
            unbounded_limit: Some("18446744073709551615"),
            last_insert_id_sql: "SELECT LAST_INSERT_ID()",
            now_sql: "NOW()",
            unix_timestamp_sql: "UNIX_TIMESTAMP()",
            auto_increment_value: Some(Value::Null),
        }
    }

    /// PostgreSQL. Parameter markers are named (`@name`) and bound to
    /// positional `$n` placeholders at execution time.
    pub fn postgres() -> Self {
        Self {
            name: "postgres",
            quote_open: '"',
            quote_close: '"',
            parameter_prefix: '@',
            column_case: CaseRule::Sensitive,
            ignore_style: IgnoreStyle::OnConflictDoNothing,
            upsert_style: UpsertStyle::OnConflictDoUpdate,
            replace_verb: None,
            unbounded_limit: None,
            last_insert_id_sql: "SELECT lastval()",
            now_sql: "now()",
            unix_timestamp_sql: "CAST(EXTRACT(EPOCH FROM now()) AS BIGINT)",
            auto_increment_value: None,
        }
    }

    /// SQLite.
    pub fn sqlite() -> Self {
        Self {
            name: "sqlite",
            quote_open: '"',
            quote_close: '"',
            parameter_prefix: '@',
            column_case: CaseRule::Insensitive,
            ignore_style: IgnoreStyle::Verb("INSERT OR IGNORE INTO"),
            upsert_style: UpsertStyle::OnConflictDoUpdate,
            replace_verb: Some("REPLACE INTO"),
            unbounded_limit: Some("-1"),
            last_insert_id_sql: "SELECT last_insert_rowid()",
            now_sql: "CURRENT_TIMESTAMP",
            unix_timestamp_sql: "CAST(strftime('%s','now') AS INTEGER)",
            auto_increment_value: Some(Value::Null),
        }
    }

    /// Short backend name used in error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_prefix(&self) -> char {
        self.parameter_prefix
    }

    pub fn column_case(&self) -> CaseRule {
        self.column_case
    }

    pub fn ignore_style(&self) -> IgnoreStyle {
        self.ignore_style
    }

    pub fn upsert_style(&self) -> UpsertStyle {
        self.upsert_style
    }

    /// The `REPLACE` verb, if the backend has one.
    pub fn replace_verb(&self) -> Option<&'static str> {
        self.replace_verb
    }

    /// Literal used as LIMIT when only an OFFSET is requested, for backends
    /// that do not accept a bare OFFSET.
    pub fn unbounded_limit(&self) -> Option<&'static str> {
        self.unbounded_limit
    }

    /// Statement returning the id generated by the last insert on the same connection.
    pub fn last_insert_id_sql(&self) -> &'static str {
        self.last_insert_id_sql
    }

    pub fn now_sql(&self) -> &'static str {
        self.now_sql
    }

    pub fn unix_timestamp_sql(&self) -> &'static str {
        self.unix_timestamp_sql
    }

    /// Value that makes the backend generate the next auto-increment id
    /// when inserted into an auto-increment column. `None` when the backend
    /// can only do so by omitting the column.
    pub fn auto_increment_value(&self) -> Option<Value> {
        self.auto_increment_value.clone()
    }

    // ==================== Escaping ====================

    /// Escape a column name.
    ///
    /// Composite expressions (anything with `.`, `(`, `)` or a space), the
    /// bare `*` and already escaped names are returned unchanged.
    pub fn escape_column<'a>(&self, name: &'a str) -> Cow<'a, str> {
        self.escape_identifier(name)
    }

    /// Escape a table name. Same passthrough rules as [`escape_column`](Self::escape_column).
    pub fn escape_table<'a>(&self, name: &'a str) -> Cow<'a, str> {
        self.escape_identifier(name)
    }

    fn escape_identifier<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if is_composite(name) || name == "*" || self.is_quoted(name) {
            return Cow::Borrowed(name);
        }
        let mut out = String::with_capacity(name.len() + 2);
        out.push(self.quote_open);
        out.push_str(name);
        out.push(self.quote_close);
        Cow::Owned(out)
    }

    fn is_quoted(&self, name: &str) -> bool {
        name.len() >= 2 && name.starts_with(self.quote_open) && name.ends_with(self.quote_close)
    }

    /// Strip the dialect quotes from an escaped identifier.
    pub fn unescape<'a>(&self, name: &'a str) -> &'a str {
        if self.is_quoted(name) {
            &name[self.quote_open.len_utf8()..name.len() - self.quote_close.len_utf8()]
        } else {
            name
        }
    }

    /// Prefix the parameter marker unless it is already there.
    pub fn parameterize(&self, name: &str) -> String {
        if name.starts_with(self.parameter_prefix) {
            name.to_string()
        } else {
            let mut out = String::with_capacity(name.len() + 1);
            out.push(self.parameter_prefix);
            out.push_str(name);
            out
        }
    }

    /// Strip the parameter marker if present.
    pub fn strip_parameter_prefix<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.parameter_prefix).unwrap_or(name)
    }

    // ==================== Aliases ====================

    /// Validate `alias` and return `sql AS alias`.
    pub fn apply_column_alias(&self, sql: &str, alias: &str) -> QueryResult<String> {
        self.validate_column_alias(alias)?;
        Ok(format!("{sql} AS {alias}"))
    }

    /// Validate `alias` and return `sql AS alias`.
    pub fn apply_table_alias(&self, sql: &str, alias: &str) -> QueryResult<String> {
        self.validate_table_alias(alias)?;
        Ok(format!("{sql} AS {alias}"))
    }

    // ==================== Validation ====================

    pub fn validate_column_name(&self, value: &str) -> QueryResult<()> {
        validate(IdentifierKind::Column, value)
    }

    pub fn validate_table_name(&self, value: &str) -> QueryResult<()> {
        validate(IdentifierKind::Table, value)
    }

    pub fn validate_column_alias(&self, value: &str) -> QueryResult<()> {
        validate(IdentifierKind::ColumnAlias, value)
    }

    pub fn validate_table_alias(&self, value: &str) -> QueryResult<()> {
        validate(IdentifierKind::TableAlias, value)
    }

    /// Validate a parameter name, with or without the marker.
    pub fn validate_parameter_name(&self, value: &str) -> QueryResult<()> {
        let bare = self.strip_parameter_prefix(value);
        if bare.is_empty() {
            return Err(QueryError::invalid_identifier(IdentifierKind::Parameter, value));
        }
        validate(IdentifierKind::Parameter, value)
    }

    pub fn is_valid_column_name(&self, value: &str) -> bool {
        self.validate_column_name(value).is_ok()
    }

    pub fn is_valid_table_name(&self, value: &str) -> bool {
        self.validate_table_name(value).is_ok()
    }

    pub fn is_valid_column_alias(&self, value: &str) -> bool {
        self.validate_column_alias(value).is_ok()
    }

    pub fn is_valid_table_alias(&self, value: &str) -> bool {
        self.validate_table_alias(value).is_ok()
    }

    pub fn is_valid_parameter_name(&self, value: &str) -> bool {
        self.validate_parameter_name(value).is_ok()
    }

    // ==================== Comparison ====================

    /// Compare two column names under this dialect's case rule, ignoring quotes.
    pub fn column_names_equal(&self, a: &str, b: &str) -> bool {
        let (a, b) = (self.unescape(a), self.unescape(b));
        match self.column_case {
            CaseRule::Sensitive => a == b,
            CaseRule::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// An identifier that is really an expression and must not be quoted.
fn is_composite(name: &str) -> bool {
    name.contains(['.', '(', ')', ' '])
}

fn validate(kind: IdentifierKind, value: &str) -> QueryResult<()> {
    if value.is_empty() || value.contains(' ') {
        return Err(QueryError::invalid_identifier(kind, value));
    }
    Ok(())
}
