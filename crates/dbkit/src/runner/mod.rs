//! Query runner: binds parameters, executes statements and hands back rows,
//! affected-row counts or generated ids.
//!
//! Statements run either on a connection leased from the pool or, through
//! [`QueryRunner::enqueue`], on the runner's own dedicated connection. That
//! connection is opened outside the pool, so queued bookkeeping never
//! competes with pooled leases.
//!
//! ```ignore
//! let runner = QueryRunner::new(pool.clone()).await?;
//! let mut conn = pool.acquire().await?;
//!
//! let sql = qb.select("character").add(["characterID", "name"]).to_sql()?;
//! let mut reader = runner.select(&mut conn, &sql, &Params::new()).await?;
//! while let Some(row) = reader.next().await {
//!     let row = row?;
//!     // ...
//! }
//! drop(reader);
//! pool.free(conn)?;
//! ```

mod probe;
mod reader;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::DbResult;
use crate::monitor::{MonitorConfig, QueryOutcome, StatsCollector};
use crate::param::Params;
use crate::pool::{Connection, ConnectionPool, Connector, PooledConnection};

pub use reader::RowReader;
pub use worker::PendingExecution;

use probe::{Monitor, report};
use worker::{DedicatedWorker, Job};

const POOL_TAG: &str = "pool";

/// Row type produced by connections of `C`.
pub type RowOf<C> = <<C as Connector>::Connection as Connection>::Row;

/// Executes SQL against pooled connections and a dedicated runner connection.
pub struct QueryRunner<C: Connector> {
    pool: ConnectionPool<C>,
    worker: DedicatedWorker,
    monitor: Monitor,
}

impl<C: Connector> QueryRunner<C> {
    /// Open the dedicated connection and start its worker task.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(pool: ConnectionPool<C>) -> DbResult<Self> {
        let conn = pool.connector().connect().await?;
        let worker = DedicatedWorker::spawn(pool.clone(), conn);
        Ok(Self {
            pool,
            worker,
            monitor: Monitor::default(),
        })
    }

    /// Install a statistics collector. Events are only sent while
    /// [`MonitorConfig::monitoring_enabled`] is set.
    pub fn with_collector(mut self, collector: Arc<dyn StatsCollector>) -> Self {
        self.monitor.set_collector(collector);
        self
    }

    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.monitor.set_config(config);
        self
    }

    pub fn monitor_config(&self) -> &MonitorConfig {
        self.monitor.config()
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    /// Run a `SELECT` on `conn` and return a reader over its rows.
    ///
    /// The reader borrows `conn` until it is dropped.
    pub async fn select<'c>(
        &self,
        conn: &'c mut PooledConnection<C>,
        sql: &str,
        params: &Params,
    ) -> DbResult<RowReader<'c, RowOf<C>>> {
        let connection = conn.connection_mut()?;
        let probe = self.monitor.start(sql, params, POOL_TAG);
        let stream = match connection.query(sql, params).await {
            Ok(stream) => stream,
            Err(e) => {
                if let Some(probe) = probe {
                    probe.finish(&QueryOutcome::error(e.to_string()));
                }
                return Err(e);
            }
        };
        Ok(RowReader::new(stream, probe))
    }

    /// Run a non-reader statement on `conn` and return the affected-row count.
    pub async fn execute(
        &self,
        conn: &mut PooledConnection<C>,
        sql: &str,
        params: &Params,
    ) -> DbResult<u64> {
        let connection = conn.connection_mut()?;
        let probe = self.monitor.start(sql, params, POOL_TAG);
        let result = connection.execute(sql, params).await;
        report(probe, &result, |n| QueryOutcome::Affected(*n));
        result
    }

    /// Run an insert on `conn` and return the id it generated.
    pub async fn insert_returning_id(
        &self,
        conn: &mut PooledConnection<C>,
        sql: &str,
        params: &Params,
    ) -> DbResult<i64> {
        let connection = conn.connection_mut()?;
        let probe = self.monitor.start(sql, params, POOL_TAG);
        let result = match connection.execute(sql, params).await {
            Ok(_) => connection.last_insert_id().await,
            Err(e) => Err(e),
        };
        report(probe, &result, |id| QueryOutcome::InsertedId(*id));
        result
    }

    /// Queue a non-reader statement on the dedicated connection.
    ///
    /// Queued statements run one at a time in the order they were queued.
    pub fn enqueue(&self, sql: impl Into<String>, params: Params) -> PendingExecution {
        let (respond_to, receiver) = oneshot::channel();
        self.worker.submit(Job {
            sql: sql.into(),
            params,
            monitor: self.monitor.clone(),
            respond_to,
        });
        PendingExecution { receiver }
    }

    /// Run a non-reader statement on the dedicated connection and wait for it.
    pub async fn execute_dedicated(&self, sql: impl Into<String>, params: Params) -> DbResult<u64> {
        self.enqueue(sql, params).wait().await
    }

    /// Finish queued statements and close the dedicated connection.
    ///
    /// Dropping the runner has the same effect without waiting.
    pub async fn shutdown(self) -> DbResult<()> {
        self.worker.shutdown().await
    }
}

impl<C: Connector> std::fmt::Debug for QueryRunner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRunner")
            .field("pool", &self.pool)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}
