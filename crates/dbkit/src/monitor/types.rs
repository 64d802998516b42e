use std::fmt;
use std::time::Duration;

/// The kind of statement being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    /// DDL, `SHOW`, anything else.
    Other,
}

impl QueryType {
    /// Detect the statement kind from its first keyword.
    ///
    /// Leading whitespace, comments and parentheses are skipped; a `WITH`
    /// prefix counts as a select.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") || starts_with_keyword(trimmed, "WITH") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "REPLACE") {
            QueryType::Replace
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            return s;
        }
    }
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => prefix.eq_ignore_ascii_case(keyword),
        None => false,
    }
}

/// What the collector knows about a statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// SQL as sent to the connection (named markers, before binding).
    pub sql: String,
    /// Number of bound parameters.
    pub param_count: usize,
    /// Detected statement kind.
    pub query_type: QueryType,
    /// Where the statement ran, e.g. `"pool"` or `"runner"`.
    pub tag: Option<String>,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Maximum length for error messages in `QueryOutcome::Error`.
const MAX_ERROR_LEN: usize = 512;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// A reader yielded this many rows before it finished or was dropped.
    Rows(u64),
    /// Affected-row count of a non-reader statement.
    Affected(u64),
    /// An insert returned this auto-increment id.
    InsertedId(i64),
    /// The statement failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryOutcome {
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryOutcome::Error(_))
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Rows(n) => write!(f, "{n} rows"),
            QueryOutcome::Affected(n) => write!(f, "{n} affected"),
            QueryOutcome::InsertedId(id) => write!(f, "inserted id {id}"),
            QueryOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Receives timing and count data from the runner.
pub trait StatsCollector: Send + Sync {
    /// Called before a statement is sent.
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called once per statement, on success or failure.
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome);

    /// Called before `on_query_complete` when the statement exceeded the
    /// configured threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}
