//! DELETE query builder.

use std::sync::Arc;

use crate::dialect::DialectSettings;
use crate::error::{QueryError, QueryResult};
use crate::qb::filter::WhereClause;
use crate::qb::traits::{HasWhereClause, Renderable};

/// DELETE query builder. Without a predicate every row is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    settings: Arc<DialectSettings>,
    table: String,
    where_clause: WhereClause,
    error: Option<QueryError>,
}

impl DeleteQuery {
    pub(crate) fn new(settings: Arc<DialectSettings>, table: &str) -> Self {
        Self {
            error: settings.validate_table_name(table).err(),
            settings,
            table: table.to_string(),
            where_clause: WhereClause::new(),
        }
    }
}

impl HasWhereClause for DeleteQuery {
    fn where_clause_mut(&mut self) -> &mut WhereClause {
        &mut self.where_clause
    }
}

impl Renderable for DeleteQuery {
    fn to_sql(&self) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let mut sql = format!("DELETE FROM {}", self.settings.escape_table(&self.table));
        self.where_clause.render_clause(&mut sql);
        Ok(sql)
    }
}
