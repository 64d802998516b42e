use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use super::probe::Probe;
use crate::error::DbResult;
use crate::monitor::QueryOutcome;
use crate::pool::RowStream;

/// Forward-only reader over the rows of a `SELECT`.
///
/// The reader mutably borrows the leased connection it reads from, so the
/// lease cannot be freed (or used for another statement) until the reader is
/// dropped. Statistics are reported when the stream ends, fails or the
/// reader is dropped early.
pub struct RowReader<'c, R> {
    stream: RowStream<R>,
    rows: u64,
    probe: Option<Probe>,
    _lease: PhantomData<&'c mut ()>,
}

impl<R> RowReader<'_, R> {
    pub(crate) fn new(stream: RowStream<R>, probe: Option<Probe>) -> Self {
        Self {
            stream,
            rows: 0,
            probe,
            _lease: PhantomData,
        }
    }

    /// Fetch the next row. `None` once the result set is exhausted.
    pub async fn next(&mut self) -> Option<DbResult<R>> {
        std::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Read every remaining row.
    pub async fn collect_all(mut self) -> DbResult<Vec<R>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Rows yielded so far.
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    fn finish(&mut self, outcome: QueryOutcome) {
        if let Some(probe) = self.probe.take() {
            probe.finish(&outcome);
        }
    }
}

impl<R> Stream for RowReader<'_, R> {
    type Item = DbResult<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.stream).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(_))) => this.rows += 1,
            Poll::Ready(Some(Err(e))) => this.finish(QueryOutcome::error(e.to_string())),
            Poll::Ready(None) => this.finish(QueryOutcome::Rows(this.rows)),
            Poll::Pending => {}
        }
        polled
    }
}

impl<R> Drop for RowReader<'_, R> {
    fn drop(&mut self) {
        let rows = self.rows;
        self.finish(QueryOutcome::Rows(rows));
    }
}

impl<R> std::fmt::Debug for RowReader<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
