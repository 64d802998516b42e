//! Column/value pairs shared by the insert, replace, update and upsert builders.

use std::sync::Arc;

use crate::dialect::DialectSettings;
use crate::error::{QueryError, QueryResult};

/// Ordered `column = value expression` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueList {
    settings: Arc<DialectSettings>,
    columns: Vec<String>,
    values: Vec<String>,
    error: Option<QueryError>,
}

impl ValueList {
    pub(crate) fn new(settings: Arc<DialectSettings>) -> Self {
        Self {
            settings,
            columns: Vec::new(),
            values: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn push(&mut self, column: &str, value: &str) {
        if let Err(e) = self.settings.validate_column_name(column) {
            self.error.get_or_insert(e);
        }
        self.columns.push(column.to_string());
        self.values.push(value.to_string());
    }

    pub(crate) fn push_auto_param(&mut self, column: &str) {
        if let Err(e) = self.settings.validate_parameter_name(column) {
            self.error.get_or_insert(e);
        }
        let param = self.settings.parameterize(column);
        self.push(column, &param);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate `(column, value expression)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Fail with the first recorded error, or when nothing was added.
    pub(crate) fn check(&self, query: &'static str) -> QueryResult<()> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        if self.columns.is_empty() {
            return Err(QueryError::EmptyColumnList { query });
        }
        Ok(())
    }

    /// `` `a`,`b` ``
    pub(crate) fn render_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| self.settings.escape_column(c))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `@a,@b`
    pub(crate) fn render_values(&self) -> String {
        self.values.join(",")
    }

    /// `` `a`=@a,`b`=@b ``
    pub(crate) fn render_assignments(&self) -> String {
        self.iter()
            .map(|(c, v)| format!("{}={}", self.settings.escape_column(c), v))
            .collect::<Vec<_>>()
            .join(",")
    }
}
