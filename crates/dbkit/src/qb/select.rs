//! SELECT query builder.

use std::sync::Arc;

use crate::dialect::DialectSettings;
use crate::error::{QueryError, QueryResult};
use crate::qb::filter::{Order, ResultFilter, WhereClause};
use crate::qb::traits::{HasColumnList, HasWhereClause, Renderable};

/// Selected columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    /// `*`
    All,
    /// Explicit, ordered list. Must not be empty when rendered.
    List(Vec<String>),
}

impl Default for Columns {
    fn default() -> Self {
        Columns::List(Vec::new())
    }
}

impl Columns {
    pub(crate) fn push(&mut self, column: String) {
        match self {
            Columns::All => *self = Columns::List(vec![column]),
            Columns::List(list) => list.push(column),
        }
    }

    pub(crate) fn render(
        &self,
        settings: &DialectSettings,
        query: &'static str,
    ) -> QueryResult<String> {
        match self {
            Columns::All => Ok("*".to_string()),
            Columns::List(list) if list.is_empty() => Err(QueryError::EmptyColumnList { query }),
            Columns::List(list) => Ok(list
                .iter()
                .map(|c| settings.escape_column(c))
                .collect::<Vec<_>>()
                .join(",")),
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// SELECT query builder.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    settings: Arc<DialectSettings>,
    distinct: bool,
    columns: Columns,
    table: String,
    alias: Option<String>,
    joins: Vec<String>,
    filter: ResultFilter,
    error: Option<QueryError>,
}

impl SelectQuery {
    pub(crate) fn new(settings: Arc<DialectSettings>, table: &str, alias: Option<&str>) -> Self {
        let mut query = Self {
            settings,
            distinct: false,
            columns: Columns::default(),
            table: table.to_string(),
            alias: alias.map(str::to_string),
            joins: Vec::new(),
            filter: ResultFilter::new(),
            error: None,
        };
        let checked = query.settings.validate_table_name(table).and_then(|()| match alias {
            Some(alias) => query.settings.validate_table_alias(alias),
            None => Ok(()),
        });
        query.record(checked);
        query
    }

    fn record(&mut self, result: QueryResult<()>) {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
    }

    /// Emit `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Select `*`.
    pub fn all_columns(mut self) -> Self {
        self.columns = Columns::All;
        self
    }

    /// Append `column AS alias`.
    pub fn add_aliased(mut self, column: &str, alias: &str) -> Self {
        let checked = super::check_column(&self.settings, column);
        self.record(checked);
        match self
            .settings
            .apply_column_alias(&self.settings.escape_column(column), alias)
        {
            Ok(rendered) => self.columns.push(rendered),
            Err(e) => self.record(Err(e)),
        }
        self
    }

    /// Append a join. `on` is inserted verbatim.
    pub fn join(mut self, kind: JoinKind, table: &str, alias: Option<&str>, on: &str) -> Self {
        let settings = Arc::clone(&self.settings);
        let table_sql = settings.escape_table(table);
        let fragment = settings.validate_table_name(table).and_then(|()| {
            let target = match alias {
                Some(alias) => settings.apply_table_alias(&table_sql, alias)?,
                None => table_sql.into_owned(),
            };
            Ok(format!("{} {} ON {}", kind.keyword(), target, on))
        });
        match fragment {
            Ok(fragment) => self.joins.push(fragment),
            Err(e) => self.record(Err(e)),
        }
        self
    }

    /// Append a pre-rendered join fragment.
    pub fn join_raw(mut self, fragment: impl Into<String>) -> Self {
        self.joins.push(fragment.into());
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

    /// Mutable access to the filter, for callers that build it in steps.
    pub fn filter_mut(&mut self) -> &mut ResultFilter {
        &mut self.filter
    }

    pub fn settings(&self) -> &DialectSettings {
        &self.settings
    }
}

impl HasColumnList for SelectQuery {
    fn add_one(mut self, column: &str) -> Self {
        let checked = super::check_column(&self.settings, column);
        self.record(checked);
        self.columns.push(column.to_string());
        self
    }
}

impl HasWhereClause for SelectQuery {
    fn where_clause_mut(&mut self) -> &mut WhereClause {
        self.filter.where_clause_mut()
    }
}

impl Renderable for SelectQuery {
    fn to_sql(&self) -> QueryResult<String> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.columns.render(&self.settings, "SELECT")?);

        sql.push_str(" FROM ");
        let table = self.settings.escape_table(&self.table);
        match &self.alias {
            Some(alias) => sql.push_str(&self.settings.apply_table_alias(&table, alias)?),
            None => sql.push_str(&table),
        }

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        sql.push_str(&self.filter.render(&self.settings)?);
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(table: &str) -> SelectQuery {
        SelectQuery::new(Arc::new(DialectSettings::mysql()), table, None)
    }

    #[test]
    fn simple_select() {
        let q = select("item").add(["item_id", "amount"]);
        assert_eq!(q.to_sql().unwrap(), "SELECT `item_id`,`amount` FROM `item`");
    }

    #[test]
    fn all_columns_and_distinct() {
        let q = select("item").distinct().all_columns();
        assert_eq!(q.to_sql().unwrap(), "SELECT DISTINCT * FROM `item`");
    }

    #[test]
    fn composite_columns_pass_through() {
        let q = select("item").add_one("i.item_id").add_aliased("amount", "qty");
        assert_eq!(q.to_sql().unwrap(), "SELECT i.item_id,`amount` AS qty FROM `item`");
    }

    #[test]
    fn aliased_table_with_join() {
        let q = SelectQuery::new(Arc::new(DialectSettings::mysql()), "item", Some("i"))
            .add_one("i.item_id")
            .join(JoinKind::Left, "character", Some("c"), "c.id = i.character_id")
            .join_raw("INNER JOIN guild g ON g.id = c.guild_id");
        assert_eq!(
            q.to_sql().unwrap(),
            "SELECT i.item_id FROM `item` AS i LEFT JOIN `character` AS c ON c.id = i.character_id INNER JOIN guild g ON g.id = c.guild_id"
        );
    }

    #[test]
    fn empty_column_list_fails() {
        let err = select("item").to_sql().unwrap_err();
        assert_eq!(err, QueryError::EmptyColumnList { query: "SELECT" });
    }

    #[test]
    fn invalid_alias_fails() {
        let q = SelectQuery::new(Arc::new(DialectSettings::mysql()), "item", Some("bad alias"))
            .all_columns();
        assert!(matches!(q.to_sql(), Err(QueryError::InvalidIdentifier { .. })));
    }

    #[test]
    fn add_after_all_columns_switches_to_list() {
        let q = select("item").all_columns().add_one("item_id");
        assert_eq!(q.to_sql().unwrap(), "SELECT `item_id` FROM `item`");
    }
}
