use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::probe::{Monitor, report};
use crate::error::{DbError, DbResult};
use crate::monitor::QueryOutcome;
use crate::param::Params;
use crate::pool::{Connection, ConnectionPool, Connector};

pub(super) const RUNNER_TAG: &str = "runner";

pub(super) struct Job {
    pub(super) sql: String,
    pub(super) params: Params,
    pub(super) monitor: Monitor,
    pub(super) respond_to: oneshot::Sender<DbResult<u64>>,
}

/// Task that owns the runner's dedicated connection and executes queued
/// statements one at a time, in submission order.
pub(super) struct DedicatedWorker {
    sender: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<()>,
}

impl DedicatedWorker {
    pub(super) fn spawn<C: Connector>(pool: ConnectionPool<C>, conn: C::Connection) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(pool, conn, receiver));
        Self { sender, handle }
    }

    /// Queue a job. If the worker is gone the job is dropped and its
    /// receiver observes the closed channel.
    pub(super) fn submit(&self, job: Job) {
        if self.sender.send(job).is_err() {
            tracing::warn!(target: "dbkit.runner", "dedicated worker stopped; statement dropped");
        }
    }

    /// Stop accepting jobs, let the queue drain and wait for the connection
    /// to be closed.
    pub(super) async fn shutdown(self) -> DbResult<()> {
        drop(self.sender);
        self.handle
            .await
            .map_err(|e| DbError::Closed(format!("runner worker failed: {e}")))
    }
}

async fn run_worker<C: Connector>(
    pool: ConnectionPool<C>,
    conn: C::Connection,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    tracing::debug!(target: "dbkit.runner", "dedicated worker started");
    let mut conn = Some(conn);
    while let Some(job) = jobs.recv().await {
        let Job {
            sql,
            params,
            monitor,
            respond_to,
        } = job;

        let probe = monitor.start(&sql, &params, RUNNER_TAG);
        let result = match open_connection(&pool, &mut conn).await {
            Ok(conn) => conn.execute(&sql, &params).await,
            Err(e) => Err(e),
        };
        report(probe, &result, |n| QueryOutcome::Affected(*n));
        if let Err(e) = &result {
            tracing::warn!(target: "dbkit.runner", error = %e, "dedicated statement failed");
        }
        // The caller may have dropped its PendingExecution.
        let _ = respond_to.send(result);
    }
    if let Some(conn) = conn {
        pool.connector().close(conn);
    }
    tracing::debug!(target: "dbkit.runner", "dedicated connection closed");
}

/// The dedicated connection, reopened first if the server dropped it.
async fn open_connection<'a, C: Connector>(
    pool: &ConnectionPool<C>,
    slot: &'a mut Option<C::Connection>,
) -> DbResult<&'a mut C::Connection> {
    if let Some(dead) = slot.take_if(|conn| conn.is_closed()) {
        pool.connector().close(dead);
        tracing::warn!(target: "dbkit.runner", "dedicated connection lost; reconnecting");
    }
    if slot.is_none() {
        *slot = Some(pool.connector().connect().await?);
        tracing::debug!(target: "dbkit.runner", "dedicated connection reopened");
    }
    slot.as_mut()
        .ok_or_else(|| DbError::Closed("dedicated connection unavailable".into()))
}

/// Result of a statement queued with [`QueryRunner::enqueue`](super::QueryRunner::enqueue).
#[derive(Debug)]
#[must_use = "a queued statement runs regardless, but its result is only seen through wait()"]
pub struct PendingExecution {
    pub(super) receiver: oneshot::Receiver<DbResult<u64>>,
}

impl PendingExecution {
    /// Wait for the statement and return its affected-row count.
    pub async fn wait(self) -> DbResult<u64> {
        self.receiver
            .await
            .map_err(|_| DbError::Closed("runner worker stopped".into()))?
    }
}
