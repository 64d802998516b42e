//! Backend seam: how physical connections are opened, used and closed.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::dialect::DialectSettings;
use crate::error::DbResult;
use crate::param::{Parameter, Value};

/// Opens and closes physical connections for a [`ConnectionPool`](super::ConnectionPool).
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection;

    /// Syntax rules of the backend.
    fn dialect(&self) -> Arc<DialectSettings>;

    /// Open a new physical connection.
    fn connect(&self) -> impl std::future::Future<Output = DbResult<Self::Connection>> + Send;

    /// Close a physical connection. Called from `Drop`, so it must not block.
    ///
    /// The default implementation drops the connection.
    fn close(&self, conn: Self::Connection) {
        drop(conn);
    }

    /// Parameter factory: validate `name` and pair it with `value`.
    fn create_parameter(&self, name: &str, value: Value) -> DbResult<Parameter> {
        self.dialect().validate_parameter_name(name)?;
        Ok(Parameter::new(name, value))
    }

    /// Value that makes the backend generate an auto-increment id, if any.
    fn auto_increment_value(&self) -> Option<Value> {
        self.dialect().auto_increment_value()
    }
}

/// An open physical connection.
///
/// SQL arrives with named `@param` markers; each backend binds them from
/// `params` its own way.
pub trait Connection: Send + 'static {
    type Row: Send + 'static;

    /// Run a statement and stream its rows.
    fn query(
        &mut self,
        sql: &str,
        params: &crate::param::Params,
    ) -> impl std::future::Future<Output = DbResult<RowStream<Self::Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &mut self,
        sql: &str,
        params: &crate::param::Params,
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;

    /// Id generated by the last insert on this connection.
    fn last_insert_id(&mut self) -> impl std::future::Future<Output = DbResult<i64>> + Send;

    /// Whether the server side of the connection is gone.
    fn is_closed(&self) -> bool;
}

/// Forward-only stream of rows returned by [`Connection::query`].
pub struct RowStream<R> {
    inner: Pin<Box<dyn Stream<Item = DbResult<R>> + Send>>,
}

impl<R> RowStream<R> {
    /// Create a new `RowStream` from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = DbResult<R>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl<R: Send + 'static> RowStream<R> {
    /// Stream rows that are already in memory.
    pub fn from_rows(rows: Vec<DbResult<R>>) -> Self {
        Self::new(IterStream(rows.into_iter()))
    }
}

impl<R> Stream for RowStream<R> {
    type Item = DbResult<R>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<R> std::fmt::Debug for RowStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

struct IterStream<I>(I);

// The iterator is never pinned in place.
impl<I> Unpin for IterStream<I> {}

impl<I: Iterator> Stream for IterStream<I> {
    type Item = I::Item;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.0.next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
