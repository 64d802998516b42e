//! Aggregate SELECT builder (`SELECT COUNT(...) FROM ...`).

use std::sync::Arc;

use crate::dialect::DialectSettings;
use crate::error::{QueryError, QueryResult};
use crate::qb::filter::{Order, ResultFilter, WhereClause};
use crate::qb::select::Columns;
use crate::qb::traits::{HasColumnList, HasWhereClause, Renderable};

/// Aggregate function applied to the selected columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        }
    }
}

/// Aggregate SELECT query builder.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectFunctionQuery {
    settings: Arc<DialectSettings>,
    aggregate: Aggregate,
    distinct: bool,
    arguments: Columns,
    result_alias: Option<String>,
    table: String,
    filter: ResultFilter,
    error: Option<QueryError>,
}

impl SelectFunctionQuery {
    pub(crate) fn new(settings: Arc<DialectSettings>, aggregate: Aggregate, table: &str) -> Self {
        let error = settings.validate_table_name(table).err();
        Self {
            settings,
            aggregate,
            distinct: false,
            arguments: Columns::default(),
            result_alias: None,
            table: table.to_string(),
            filter: ResultFilter::new(),
            error,
        }
    }

    /// `FUNC(*)`.
    pub fn all_columns(mut self) -> Self {
        self.arguments = Columns::All;
        self
    }

    /// `FUNC(DISTINCT ...)`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Name the aggregate result column.
    pub fn alias(mut self, alias: &str) -> Self {
        if let Err(e) = self.settings.validate_column_alias(alias) {
            self.error.get_or_insert(e);
        }
        self.result_alias = Some(alias.to_string());
        self
    }

    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.filter.order_by(&self.settings, column, order);
        self
    }

    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, Order::Asc)
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, Order::Desc)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.filter.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.filter.offset(offset);
        self
    }

    pub fn filter(&self) -> &ResultFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut ResultFilter {
        &mut self.filter
    }
}

impl HasColumnList for SelectFunctionQuery {
    fn add_one(mut self, column: &str) -> Self {
        if let Err(e) = super::check_column(&self.settings, column) {
            self.error.get_or_insert(e);
        }
        self.arguments.push(column.to_string());
        self
    }
}

impl HasWhereClause for SelectFunctionQuery {
    fn where_clause_mut(&mut self) -> &mut WhereClause {
        self.filter.where_clause_mut()
    }
}

impl Renderable for SelectFunctionQuery {
    fn to_sql(&self) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        let arguments = self.arguments.render(&self.settings, "SELECT")?;
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        let call = format!("{}({}{})", self.aggregate.name(), distinct, arguments);

        let mut sql = String::from("SELECT ");
        match &self.result_alias {
            Some(alias) => sql.push_str(&self.settings.apply_column_alias(&call, alias)?),
            None => sql.push_str(&call),
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.settings.escape_table(&self.table));
        sql.push_str(&self.filter.render(&self.settings)?);
        Ok(sql)
    }
}
