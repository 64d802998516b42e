use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::Level;

use super::truncate_sql_bytes;
use super::types::{QueryContext, QueryOutcome, QueryType, StatsCollector};

/// A collector that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCollector;

impl StatsCollector for NoopCollector {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _outcome: &QueryOutcome) {}
}

/// Counts statements, failures and time spent.
#[derive(Debug, Default)]
pub struct QueryStatsCollector {
    total_queries: AtomicU64,
    failed_queries: AtomicU64,
    slow_queries: AtomicU64,
    total_duration_nanos: AtomicU64,
    rows_read: AtomicU64,
    rows_affected: AtomicU64,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    replace_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    max_duration_nanos: AtomicU64,
    slowest_query: Mutex<Option<String>>,
}

/// Snapshot of [`QueryStatsCollector`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub total_duration: Duration,
    /// Rows yielded by readers.
    pub rows_read: u64,
    /// Rows reported affected by non-reader statements.
    pub rows_affected: u64,
    pub select_count: u64,
    pub insert_count: u64,
    pub replace_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    pub max_duration: Duration,
    /// SQL of the slowest statement seen.
    pub slowest_query: Option<String>,
}

impl QueryStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            slow_queries: self.slow_queries.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            rows_read: self.rows_read.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            replace_count: self.replace_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slowest_query: self
                .slowest_query
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        for counter in [
            &self.total_queries,
            &self.failed_queries,
            &self.slow_queries,
            &self.total_duration_nanos,
            &self.rows_read,
            &self.rows_affected,
            &self.select_count,
            &self.insert_count,
            &self.replace_count,
            &self.update_count,
            &self.delete_count,
            &self.max_duration_nanos,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self
            .slowest_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Add without wrapping.
fn saturating_add(counter: &AtomicU64, value: u64) {
    let prev = counter.fetch_add(value, Ordering::Relaxed);
    if prev.checked_add(value).is_none() {
        counter.store(u64::MAX, Ordering::Relaxed);
    }
}

impl StatsCollector for QueryStatsCollector {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        let duration_nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);

        self.total_queries.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_duration_nanos, duration_nanos);

        let by_type = match ctx.query_type {
            QueryType::Select => Some(&self.select_count),
            QueryType::Insert => Some(&self.insert_count),
            QueryType::Replace => Some(&self.replace_count),
            QueryType::Update => Some(&self.update_count),
            QueryType::Delete => Some(&self.delete_count),
            QueryType::Other => None,
        };
        if let Some(counter) = by_type {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        match outcome {
            QueryOutcome::Rows(n) => saturating_add(&self.rows_read, *n),
            QueryOutcome::Affected(n) => saturating_add(&self.rows_affected, *n),
            QueryOutcome::InsertedId(_) => {}
            QueryOutcome::Error(_) => {
                self.failed_queries.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while duration_nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                duration_nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self
                        .slowest_query
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(ctx.sql.clone());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }

    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {
        self.slow_queries.fetch_add(1, Ordering::Relaxed);
    }
}

/// Emits one `tracing` event per completed statement (`target: "dbkit.sql"`)
/// and a warning per slow statement.
#[derive(Debug, Clone)]
pub struct TracingCollector {
    /// Level of the per-statement event.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingCollector {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl StatsCollector for TracingCollector {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    _ => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&ctx.sql);
        let tag = ctx.tag.as_deref().unwrap_or("-");
        emit_at_level!(
            self.level,
            target: "dbkit.sql",
            query_type = ?ctx.query_type,
            tag,
            param_count = ctx.param_count,
            elapsed = ?duration,
            outcome = %outcome,
            sql = %sql,
        );
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        tracing::warn!(
            target: "dbkit.sql",
            query_type = ?ctx.query_type,
            elapsed = ?duration,
            sql = %self.truncate_sql(&ctx.sql),
            "slow query"
        );
    }
}

/// Fans events out to several collectors.
#[derive(Default)]
pub struct CompositeCollector {
    collectors: Vec<Arc<dyn StatsCollector>>,
}

impl CompositeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<S: StatsCollector + 'static>(mut self, collector: S) -> Self {
        self.collectors.push(Arc::new(collector));
        self
    }

    pub fn add_arc(mut self, collector: Arc<dyn StatsCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

impl StatsCollector for CompositeCollector {
    fn on_query_start(&self, ctx: &QueryContext) {
        for collector in &self.collectors {
            collector.on_query_start(ctx);
        }
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        for collector in &self.collectors {
            collector.on_query_complete(ctx, duration, outcome);
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        for collector in &self.collectors {
            collector.on_slow_query(ctx, duration);
        }
    }
}
