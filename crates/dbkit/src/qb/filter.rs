//! WHERE / ORDER BY / LIMIT chain shared by the select builders.

use crate::dialect::DialectSettings;
use crate::error::{QueryError, QueryResult};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    fn keyword(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Accumulated WHERE predicate.
///
/// `and` terms are kept separately and parenthesized on render; `or`
/// folds everything gathered so far into a single term. Blank predicates
/// are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    terms: Vec<String>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, predicate: impl Into<String>) {
        let predicate = predicate.into();
        if !predicate.trim().is_empty() {
            self.terms.push(predicate);
        }
    }

    pub fn or(&mut self, predicate: impl Into<String>) {
        let predicate = predicate.into();
        if predicate.trim().is_empty() {
            return;
        }
        match self.render() {
            None => self.terms.push(predicate),
            Some(current) => self.terms = vec![format!("({current}) OR ({predicate})")],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The predicate without the `WHERE` keyword, or `None` when empty.
    pub fn render(&self) -> Option<String> {
        match self.terms.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            terms => Some(
                terms
                    .iter()
                    .map(|t| format!("({t})"))
                    .collect::<Vec<_>>()
                    .join(" AND "),
            ),
        }
    }

    /// ` WHERE <predicate>`, or nothing.
    pub(crate) fn render_clause(&self, out: &mut String) {
        if let Some(pred) = self.render() {
            out.push_str(" WHERE ");
            out.push_str(&pred);
        }
    }
}

/// Result filter of a select query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    where_clause: WhereClause,
    order: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    error: Option<QueryError>,
}

impl ResultFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(&self) -> &WhereClause {
        &self.where_clause
    }

    pub fn where_clause_mut(&mut self) -> &mut WhereClause {
        &mut self.where_clause
    }

    /// Append an ORDER BY term. Plain names are escaped on render.
    pub fn order_by(&mut self, settings: &DialectSettings, column: &str, order: Order) -> &mut Self {
        if let Err(e) = super::check_column(settings, column) {
            self.error.get_or_insert(e);
        }
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.where_clause.is_empty()
            && self.order.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    /// Render ` WHERE ... ORDER BY ... LIMIT ... OFFSET ...`, each part
    /// present only when set.
    pub fn render(&self, settings: &DialectSettings) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        let mut sql = String::new();
        self.where_clause.render_clause(&mut sql);

        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            let terms: Vec<String> = self
                .order
                .iter()
                .map(|(col, dir)| format!("{} {}", settings.escape_column(col), dir.keyword()))
                .collect();
            sql.push_str(&terms.join(","));
        }

        match (self.limit, self.offset) {
            (Some(limit), _) => {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
            (None, Some(_)) => {
                if let Some(unbounded) = settings.unbounded_limit() {
                    sql.push_str(" LIMIT ");
                    sql.push_str(unbounded);
                }
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(sql)
    }
}
