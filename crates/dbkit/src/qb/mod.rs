//! Dialect-aware query builders.
//!
//! Builders render SQL text with named `@param` markers; values are bound
//! separately when the query runs. Every builder made by one
//! [`QueryBuilder`] shares its [`DialectSettings`].
//!
//! # Usage
//!
//! ```ignore
//! use dbkit::prelude::*;
//!
//! let qb = QueryBuilder::new(DialectSettings::mysql());
//! let s = qb.settings();
//! let f = qb.functions();
//!
//! // SELECT `item_id` FROM `active_trade_item` WHERE `character_id` = @characterID
//! let sql = qb
//!     .select("active_trade_item")
//!     .add_one("item_id")
//!     .and_where(f.equals(&s.escape_column("character_id"), &s.parameterize("characterID")))
//!     .to_sql()?;
//!
//! // INSERT IGNORE INTO `active_trade_item` (`item_id`,`character_id`) VALUES (@item_id,@character_id)
//! let sql = qb
//!     .insert("active_trade_item")
//!     .ignore_exists()
//!     .add_auto_param(["item_id", "character_id"])
//!     .to_sql()?;
//!
//! // ... ON DUPLICATE KEY UPDATE `cash`=@cash
//! let sql = qb
//!     .insert("active_trade_cash")
//!     .add_auto_param(["character_id", "cash"])
//!     .odku()
//!     .add_from_insert(["character_id"])
//!     .to_sql()?;
//! ```

mod delete;
mod filter;
mod function;
mod insert;
mod select;
mod traits;
mod update;
mod values;

use std::sync::Arc;

pub use delete::DeleteQuery;
pub use filter::{Order, ResultFilter, WhereClause};
pub use function::{Aggregate, SelectFunctionQuery};
pub use insert::{InsertQuery, OdkuQuery, ReplaceQuery};
pub use select::{Columns, JoinKind, SelectQuery};
pub use traits::{HasColumnList, HasValueList, HasWhereClause, Renderable};
pub use update::UpdateQuery;
pub use values::ValueList;

use crate::dialect::DialectSettings;
use crate::error::QueryResult;
use crate::functions::Functions;

/// Entry point for building queries against one dialect.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    settings: Arc<DialectSettings>,
}

impl QueryBuilder {
    pub fn new(settings: DialectSettings) -> Self {
        Self::from_shared(Arc::new(settings))
    }

    /// Build on settings already shared elsewhere (e.g. by a pool's connector).
    pub fn from_shared(settings: Arc<DialectSettings>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DialectSettings {
        &self.settings
    }

    pub fn shared_settings(&self) -> Arc<DialectSettings> {
        Arc::clone(&self.settings)
    }

    pub fn functions(&self) -> Functions {
        Functions::new(Arc::clone(&self.settings))
    }

    pub fn select(&self, table: &str) -> SelectQuery {
        SelectQuery::new(Arc::clone(&self.settings), table, None)
    }

    /// SELECT from `table AS alias`.
    pub fn select_as(&self, table: &str, alias: &str) -> SelectQuery {
        SelectQuery::new(Arc::clone(&self.settings), table, Some(alias))
    }

    pub fn select_function(&self, aggregate: Aggregate, table: &str) -> SelectFunctionQuery {
        SelectFunctionQuery::new(Arc::clone(&self.settings), aggregate, table)
    }

    pub fn insert(&self, table: &str) -> InsertQuery {
        InsertQuery::new(Arc::clone(&self.settings), table)
    }

    pub fn replace(&self, table: &str) -> ReplaceQuery {
        ReplaceQuery::new(Arc::clone(&self.settings), table)
    }

    pub fn update(&self, table: &str) -> UpdateQuery {
        UpdateQuery::new(Arc::clone(&self.settings), table)
    }

    pub fn delete(&self, table: &str) -> DeleteQuery {
        DeleteQuery::new(Arc::clone(&self.settings), table)
    }
}

/// Column names in select lists may be composite expressions; only plain
/// names go through the identifier validator.
pub(crate) fn check_column(settings: &DialectSettings, column: &str) -> QueryResult<()> {
    let composite = column.contains(['.', '(', ')', ' ']) || column == "*";
    if composite {
        Ok(())
    } else {
        settings.validate_column_name(column)
    }
}
