//! Convenient imports for typical `dbkit` usage.
//!
//! ```ignore
//! use dbkit::prelude::*;
//! ```

pub use crate::{DbError, DbResult, QueryError, QueryResult};

pub use crate::{DialectSettings, Functions, QueryBuilder};
pub use crate::{HasColumnList, HasValueList, HasWhereClause, Renderable};
pub use crate::{JoinKind, Order};

pub use crate::{Params, Value};

pub use crate::{ConnectionPool, PoolConfig, PooledConnection};
pub use crate::{PgConnector, QueryRunner};
