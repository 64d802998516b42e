use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_query_type_detection() {
    assert_eq!(QueryType::from_sql("SELECT * FROM `item`"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  select 1"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("-- lookup\n(SELECT 1)"),
        QueryType::Select
    );
    assert_eq!(
        QueryType::from_sql("WITH c AS (SELECT 1) SELECT * FROM c"),
        QueryType::Select
    );
    assert_eq!(
        QueryType::from_sql("INSERT IGNORE INTO `item` (`id`) VALUES (@id)"),
        QueryType::Insert
    );
    assert_eq!(
        QueryType::from_sql("REPLACE INTO `inventory` (`slot`) VALUES (@slot)"),
        QueryType::Replace
    );
    assert_eq!(
        QueryType::from_sql("/* gm */ UPDATE `character` SET `gold`=@gold"),
        QueryType::Update
    );
    assert_eq!(QueryType::from_sql("DELETE FROM `mail`"), QueryType::Delete);
    assert_eq!(QueryType::from_sql("CREATE TABLE t (id INT)"), QueryType::Other);
    assert_eq!(QueryType::from_sql(""), QueryType::Other);
}

#[test]
fn test_stats_collector() {
    let collector = QueryStatsCollector::new();
    let select = QueryContext::new("SELECT * FROM `item`", 0);
    let update = QueryContext::new("UPDATE `item` SET `amount`=@amount WHERE `id` = @id", 2);

    collector.on_query_complete(&select, Duration::from_millis(10), &QueryOutcome::Rows(5));
    collector.on_query_complete(&select, Duration::from_millis(20), &QueryOutcome::Rows(3));
    collector.on_query_complete(&update, Duration::from_millis(5), &QueryOutcome::Affected(1));
    collector.on_query_complete(&update, Duration::from_millis(1), &QueryOutcome::error("deadlock"));
    collector.on_slow_query(&select, Duration::from_millis(20));

    let stats = collector.stats();
    assert_eq!(stats.total_queries, 4);
    assert_eq!(stats.failed_queries, 1);
    assert_eq!(stats.slow_queries, 1);
    assert_eq!(stats.select_count, 2);
    assert_eq!(stats.update_count, 2);
    assert_eq!(stats.rows_read, 8);
    assert_eq!(stats.rows_affected, 1);
    assert_eq!(stats.total_duration, Duration::from_millis(36));
    assert_eq!(stats.max_duration, Duration::from_millis(20));
    assert_eq!(stats.slowest_query.as_deref(), Some("SELECT * FROM `item`"));

    collector.reset();
    assert_eq!(collector.stats(), QueryStats::default());
}

#[test]
fn test_error_outcome_truncated() {
    let long = "x".repeat(2000);
    match QueryOutcome::error(long) {
        QueryOutcome::Error(msg) => {
            assert_eq!(msg.len(), 512 + 3);
            assert!(msg.ends_with("..."));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(QueryOutcome::error("short").is_error());
}

#[test]
fn test_tracing_collector_truncation() {
    let collector = TracingCollector::new().max_sql_length(10);
    assert_eq!(collector.truncate_sql("SELECT * FROM users"), "SELECT * F...");
    assert_eq!(collector.truncate_sql("SELECT 1"), "SELECT 1");
    assert_eq!(
        TracingCollector::new().no_truncate().truncate_sql(&"a".repeat(300)).len(),
        300
    );
}

#[test]
fn test_truncate_respects_char_boundary() {
    assert_eq!(truncate_sql_bytes("héllo", 2), "h");
    assert_eq!(truncate_sql_bytes("abc", 10), "abc");
}

struct CountingCollector {
    starts: AtomicUsize,
    completes: AtomicUsize,
}

impl StatsCollector for CountingCollector {
    fn on_query_start(&self, _ctx: &QueryContext) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _outcome: &QueryOutcome) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_composite_fans_out() {
    let counting = Arc::new(CountingCollector {
        starts: AtomicUsize::new(0),
        completes: AtomicUsize::new(0),
    });
    let composite = CompositeCollector::new()
        .add(NoopCollector)
        .add_arc(counting.clone())
        .add_arc(counting.clone());
    assert_eq!(composite.len(), 3);

    let ctx = QueryContext::new("SELECT 1", 0).with_tag("pool");
    composite.on_query_start(&ctx);
    composite.on_query_complete(&ctx, Duration::ZERO, &QueryOutcome::Rows(1));

    assert_eq!(counting.starts.load(Ordering::SeqCst), 2);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_monitor_config() {
    let config = MonitorConfig::new();
    assert!(!config.monitoring_enabled);
    assert!(!config.is_slow(Duration::from_secs(60)));

    let config = config
        .with_slow_query_threshold(Duration::from_millis(100))
        .enable_monitoring();
    assert!(config.monitoring_enabled);
    assert!(config.is_slow(Duration::from_millis(100)));
    assert!(!config.is_slow(Duration::from_millis(99)));
}
