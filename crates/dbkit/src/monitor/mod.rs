//! Query statistics for the runner.
//!
//! A [`StatsCollector`] receives start / complete / slow events for every
//! statement the [`QueryRunner`](crate::runner::QueryRunner) executes, once
//! monitoring is enabled through [`MonitorConfig`].
//!
//! # Example
//!
//! ```rust,ignore
//! use dbkit::monitor::{CompositeCollector, MonitorConfig, QueryStatsCollector, TracingCollector};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(QueryStatsCollector::new());
//! let collector = CompositeCollector::new()
//!     .add(TracingCollector::new())
//!     .add_arc(stats.clone());
//!
//! let runner = QueryRunner::new(pool)
//!     .await?
//!     .with_config(
//!         MonitorConfig::new()
//!             .with_slow_query_threshold(Duration::from_millis(200))
//!             .enable_monitoring(),
//!     )
//!     .with_collector(Arc::new(collector));
//!
//! // ... later
//! println!("{} queries", stats.stats().total_queries);
//! ```

mod collectors;
mod config;
mod types;

#[cfg(test)]
mod tests;

pub use collectors::{
    CompositeCollector, NoopCollector, QueryStats, QueryStatsCollector, TracingCollector,
};
pub use config::MonitorConfig;
pub use types::{QueryContext, QueryOutcome, QueryType, StatsCollector};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
