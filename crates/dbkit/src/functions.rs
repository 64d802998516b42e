//! SQL expression helpers.
//!
//! Every helper returns a plain SQL fragment. Operands are inserted as
//! given, so callers pass columns already escaped and parameters already
//! prefixed:
//!
//! ```ignore
//! let qb = QueryBuilder::new(DialectSettings::mysql());
//! let f = qb.functions();
//! let s = qb.settings();
//! let pred = f.equals(&s.escape_column("character_id"), &s.parameterize("characterID"));
//! assert_eq!(pred, "`character_id` = @characterID");
//! ```

use std::sync::Arc;

use crate::dialect::DialectSettings;

/// Expression helper bound to one dialect.
#[derive(Debug, Clone)]
pub struct Functions {
    settings: Arc<DialectSettings>,
}

impl Functions {
    pub fn new(settings: Arc<DialectSettings>) -> Self {
        Self { settings }
    }

    // ==================== Comparison ====================

    pub fn equals(&self, left: &str, right: &str) -> String {
        binary(left, "=", right)
    }

    pub fn not_equals(&self, left: &str, right: &str) -> String {
        binary(left, "<>", right)
    }

    pub fn greater_than(&self, left: &str, right: &str) -> String {
        binary(left, ">", right)
    }

    pub fn greater_or_equal(&self, left: &str, right: &str) -> String {
        binary(left, ">=", right)
    }

    pub fn less_than(&self, left: &str, right: &str) -> String {
        binary(left, "<", right)
    }

    pub fn less_or_equal(&self, left: &str, right: &str) -> String {
        binary(left, "<=", right)
    }

    pub fn like(&self, left: &str, pattern: &str) -> String {
        binary(left, "LIKE", pattern)
    }

    pub fn is_null(&self, expr: &str) -> String {
        format!("{expr} IS NULL")
    }

    pub fn is_not_null(&self, expr: &str) -> String {
        format!("{expr} IS NOT NULL")
    }

    /// `expr IN (a,b,...)`. An empty list matches nothing.
    pub fn in_list<S: AsRef<str>>(&self, expr: &str, values: &[S]) -> String {
        if values.is_empty() {
            return "1=0".to_string();
        }
        format!("{expr} IN ({})", join(values, ","))
    }

    pub fn between(&self, expr: &str, low: &str, high: &str) -> String {
        format!("{expr} BETWEEN {low} AND {high}")
    }

    // ==================== Boolean ====================

    /// Parenthesized conjunction. A single part is returned unwrapped.
    pub fn and<S: AsRef<str>>(&self, parts: &[S]) -> String {
        combine(parts, " AND ")
    }

    /// Parenthesized disjunction. A single part is returned unwrapped.
    pub fn or<S: AsRef<str>>(&self, parts: &[S]) -> String {
        combine(parts, " OR ")
    }

    pub fn not(&self, expr: &str) -> String {
        format!("NOT ({expr})")
    }

    // ==================== Arithmetic ====================

    pub fn add(&self, left: &str, right: &str) -> String {
        format!("({left} + {right})")
    }

    pub fn subtract(&self, left: &str, right: &str) -> String {
        format!("({left} - {right})")
    }

    pub fn coalesce<S: AsRef<str>>(&self, exprs: &[S]) -> String {
        format!("COALESCE({})", join(exprs, ","))
    }

    // ==================== Aggregates ====================

    pub fn count(&self, expr: &str) -> String {
        format!("COUNT({expr})")
    }

    pub fn max(&self, expr: &str) -> String {
        format!("MAX({expr})")
    }

    pub fn min(&self, expr: &str) -> String {
        format!("MIN({expr})")
    }

    pub fn sum(&self, expr: &str) -> String {
        format!("SUM({expr})")
    }

    pub fn avg(&self, expr: &str) -> String {
        format!("AVG({expr})")
    }

    // ==================== Dialect-specific ====================

    /// Current timestamp.
    pub fn now(&self) -> String {
        self.settings.now_sql().to_string()
    }

    /// Current time as seconds since the unix epoch.
    pub fn unix_timestamp(&self) -> String {
        self.settings.unix_timestamp_sql().to_string()
    }
}

fn binary(left: &str, op: &str, right: &str) -> String {
    format!("{left} {op} {right}")
}

fn join<S: AsRef<str>>(items: &[S], sep: &str) -> String {
    items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(sep)
}

/// Blank parts are dropped; nothing left renders as an empty string, which
/// the WHERE clause ignores.
fn combine<S: AsRef<str>>(parts: &[S], sep: &str) -> String {
    let parts: Vec<&str> = parts
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.trim().is_empty())
        .collect();
    match parts.as_slice() {
        [] => String::new(),
        [single] => single.to_string(),
        _ => parts
            .iter()
            .map(|p| format!("({p})"))
            .collect::<Vec<_>>()
            .join(sep),
    }
}
