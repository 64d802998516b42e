//! # dbkit
//!
//! Dialect-aware SQL query builders plus the plumbing to run them: a
//! grow-on-demand connection pool and a query runner.
//!
//! ## Features
//!
//! - **Byte-exact SQL**: builders render the same text for the same calls,
//!   with identifiers escaped by the dialect (MySQL, PostgreSQL, SQLite)
//! - **Validation before execution**: empty column lists, malformed
//!   identifiers and unsupported clauses fail at render time
//! - **Named parameters**: SQL carries `@name` markers; values travel in
//!   [`Params`] and are bound by the backend
//! - **Never-blocking pool**: `acquire` opens a new connection instead of
//!   waiting; leases can be revoked in bulk with `free_all` / `clear`
//! - **Query runner**: readers, affected-row counts, generated ids, an
//!   ordered dedicated connection and optional statistics collectors
//!
//! ## Query builder
//!
//! ```ignore
//! use dbkit::prelude::*;
//!
//! let qb = QueryBuilder::new(DialectSettings::mysql());
//!
//! // SELECT `a`,`b` FROM `tbl` WHERE `a` = @a
//! let sql = qb
//!     .select("tbl")
//!     .add(["a", "b"])
//!     .and_where(qb.functions().equals("`a`", "@a"))
//!     .to_sql()?;
//! ```
//!
//! ## Running queries
//!
//! ```ignore
//! use dbkit::prelude::*;
//!
//! let pool = ConnectionPool::new(PgConnector::new(&std::env::var("DATABASE_URL")?)?);
//! let runner = QueryRunner::new(pool.clone()).await?;
//!
//! let mut conn = pool.acquire().await?;
//! let params = Params::new().with("characterID", 7);
//! let affected = runner
//!     .execute(&mut conn, "DELETE FROM \"trade\" WHERE \"character_id\" = @characterID", &params)
//!     .await?;
//! pool.free(conn)?;
//!
//! pool.clear();
//! runner.shutdown().await?;
//! ```

pub mod dialect;
pub mod error;
pub mod functions;
pub mod monitor;
pub mod param;
pub mod pool;
pub mod postgres;
pub mod prelude;
pub mod qb;
pub mod runner;

#[cfg(test)]
mod testing;

pub use dialect::{CaseRule, DialectSettings, IgnoreStyle, UpsertStyle};
pub use error::{DbError, DbResult, IdentifierKind, QueryError, QueryResult};
pub use functions::Functions;
pub use monitor::{
    CompositeCollector, MonitorConfig, NoopCollector, QueryContext, QueryOutcome, QueryStats,
    QueryStatsCollector, QueryType, StatsCollector, TracingCollector,
};
pub use param::{Parameter, Params, Value};
pub use pool::{
    Connection, ConnectionPool, Connector, LeaseInfo, PoolConfig, PoolStatus, PooledConnection,
    RowStream,
};
pub use postgres::{PgConnection, PgConnector};
pub use qb::{
    Aggregate, Columns, DeleteQuery, HasColumnList, HasValueList, HasWhereClause, InsertQuery,
    JoinKind, OdkuQuery, Order, QueryBuilder, Renderable, ReplaceQuery, ResultFilter,
    SelectFunctionQuery, SelectQuery, UpdateQuery, WhereClause,
};
pub use runner::{PendingExecution, QueryRunner, RowOf, RowReader};
