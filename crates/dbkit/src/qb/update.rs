//! UPDATE query builder.

use std::sync::Arc;

use crate::dialect::DialectSettings;
use crate::error::{QueryError, QueryResult};
use crate::qb::filter::WhereClause;
use crate::qb::traits::{HasValueList, HasWhereClause, Renderable};
use crate::qb::values::ValueList;

/// UPDATE query builder.
///
/// Rendering without a WHERE clause fails unless [`all_rows`](Self::all_rows)
/// was called.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    settings: Arc<DialectSettings>,
    table: String,
    values: ValueList,
    where_clause: WhereClause,
    all_rows: bool,
    error: Option<QueryError>,
}

impl UpdateQuery {
    pub(crate) fn new(settings: Arc<DialectSettings>, table: &str) -> Self {
        Self {
            error: settings.validate_table_name(table).err(),
            values: ValueList::new(Arc::clone(&settings)),
            settings,
            table: table.to_string(),
            where_clause: WhereClause::new(),
            all_rows: false,
        }
    }

    /// Allow rendering without a WHERE clause.
    pub fn all_rows(mut self) -> Self {
        self.all_rows = true;
        self
    }
}

impl HasValueList for UpdateQuery {
    fn value_list_mut(&mut self) -> &mut ValueList {
        &mut self.values
    }
}

impl HasWhereClause for UpdateQuery {
    fn where_clause_mut(&mut self) -> &mut WhereClause {
        &mut self.where_clause
    }
}

impl Renderable for UpdateQuery {
    fn to_sql(&self) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        self.values.check("UPDATE")?;
        if self.where_clause.is_empty() && !self.all_rows {
            return Err(QueryError::MissingWhere { query: "UPDATE" });
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            self.settings.escape_table(&self.table),
            self.values.render_assignments()
        );
        self.where_clause.render_clause(&mut sql);
        Ok(sql)
    }
}
