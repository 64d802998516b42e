//! Trait definitions for query builders.

use crate::error::QueryResult;
use crate::qb::filter::WhereClause;
use crate::qb::values::ValueList;

/// Anything that renders to final SQL text.
///
/// Rendering is read-only: calling `to_sql` twice on the same builder yields
/// identical strings.
pub trait Renderable {
    /// Render the SQL, or the first invalid input the builder recorded.
    fn to_sql(&self) -> QueryResult<String>;
}

/// Builders with an explicit column list (select, aggregate select).
pub trait HasColumnList: Sized {
    /// Append one column.
    fn add_one(self, column: &str) -> Self;

    /// Append columns in order.
    fn add<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        columns
            .into_iter()
            .fold(self, |query, column| query.add_one(column.as_ref()))
    }
}

/// Builders that assign values to columns (insert, replace, update, upsert).
pub trait HasValueList: Sized {
    #[doc(hidden)]
    fn value_list_mut(&mut self) -> &mut ValueList;

    /// Assign a raw SQL value expression to `column`.
    fn add(mut self, column: &str, value: &str) -> Self {
        self.value_list_mut().push(column, value);
        self
    }

    /// Assign `@column` to each column.
    fn add_auto_param<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = self.value_list_mut();
        for column in columns {
            list.push_auto_param(column.as_ref());
        }
        self
    }
}

/// Builders with a WHERE clause.
pub trait HasWhereClause: Sized {
    #[doc(hidden)]
    fn where_clause_mut(&mut self) -> &mut WhereClause;

    /// AND a predicate onto the WHERE clause.
    fn and_where(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause_mut().and(predicate);
        self
    }

    /// OR a predicate with everything gathered so far.
    fn or_where(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause_mut().or(predicate);
        self
    }
}
