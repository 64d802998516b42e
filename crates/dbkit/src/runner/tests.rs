use super::*;
use crate::error::DbError;
use crate::monitor::{QueryContext, QueryStatsCollector};
use crate::param::Value;
use crate::testing::FakeConnector;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingCollector {
    events: Mutex<Vec<(Option<String>, String, QueryOutcome)>>,
    started: Mutex<usize>,
}

impl RecordingCollector {
    fn outcomes(&self) -> Vec<QueryOutcome> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, outcome)| outcome.clone())
            .collect()
    }

    fn tags(&self) -> Vec<Option<String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(tag, _, _)| tag.clone())
            .collect()
    }
}

impl StatsCollector for RecordingCollector {
    fn on_query_start(&self, _ctx: &QueryContext) {
        *self.started.lock().unwrap() += 1;
    }

    fn on_query_complete(&self, ctx: &QueryContext, _duration: Duration, outcome: &QueryOutcome) {
        self.events
            .lock()
            .unwrap()
            .push((ctx.tag.clone(), ctx.sql.clone(), outcome.clone()));
    }
}

async fn runner() -> (QueryRunner<FakeConnector>, FakeConnector) {
    let connector = FakeConnector::new();
    let pool = ConnectionPool::new(connector.clone());
    (QueryRunner::new(pool).await.unwrap(), connector)
}

#[tokio::test]
async fn test_dedicated_connection_is_outside_pool() {
    let (runner, connector) = runner().await;
    assert_eq!(connector.server.opened(), 1);
    assert_eq!(runner.pool().live_objects(), 0);

    runner.shutdown().await.unwrap();
    assert_eq!(connector.server.closed(), 1);
}

#[tokio::test]
async fn test_select_reads_rows() {
    let (runner, _) = runner().await;
    let pool = runner.pool().clone();
    let mut conn = pool.acquire().await.unwrap();

    let params = Params::new().with("a", 1).with("b", "two");
    let mut reader = runner
        .select(&mut conn, "SELECT `a`,`b` FROM `t`", &params)
        .await
        .unwrap();
    let first = reader.next().await.unwrap().unwrap();
    assert_eq!(first, vec![Value::Text("a".into()), Value::Int(1)]);
    assert_eq!(reader.rows_read(), 1);

    let rest = reader.collect_all().await.unwrap();
    assert_eq!(rest, vec![vec![Value::Text("b".into()), Value::Text("two".into())]]);

    pool.free(conn).unwrap();
    assert_eq!(pool.live_objects(), 0);
}

#[tokio::test]
async fn test_execute_and_insert_id() {
    let (runner, _) = runner().await;
    let pool = runner.pool().clone();
    let mut conn = pool.acquire().await.unwrap();

    let params = Params::new().with("a", 1).with("b", 2);
    let affected = runner
        .execute(&mut conn, "UPDATE `t` SET `a`=@a WHERE `b`=@b", &params)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let id = runner
        .insert_returning_id(&mut conn, "INSERT INTO `t` (`a`) VALUES (@a)", &params)
        .await
        .unwrap();
    assert_eq!(id, 1);
    let id = runner
        .insert_returning_id(&mut conn, "INSERT INTO `t` (`a`) VALUES (@a)", &params)
        .await
        .unwrap();
    assert_eq!(id, 2);
}

#[tokio::test]
async fn test_errors_propagate() {
    let (runner, _) = runner().await;
    let pool = runner.pool().clone();
    let mut conn = pool.acquire().await.unwrap();

    let err = runner
        .execute(&mut conn, "UPDATE FAIL", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Other(_)));

    let err = runner
        .select(&mut conn, "SELECT FAIL", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Other(_)));

    // The connection is still usable after a failed statement.
    assert!(runner.execute(&mut conn, "DELETE FROM `t`", &Params::new()).await.is_ok());
}

#[tokio::test]
async fn test_revoked_lease_is_rejected() {
    let (runner, connector) = runner().await;
    let pool = runner.pool().clone();
    let mut conn = pool.acquire().await.unwrap();
    pool.clear();

    let err = runner
        .execute(&mut conn, "DELETE FROM `t`", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::LeaseRevoked { .. }));
    // Nothing reached the server.
    assert!(connector.server.statements().is_empty());
}

#[tokio::test]
async fn test_enqueue_runs_in_order() {
    let (runner, connector) = runner().await;

    let pending: Vec<_> = (0..20)
        .map(|i| {
            runner.enqueue(
                format!("UPDATE `counter` SET `n`={i}"),
                Params::new().with("i", i),
            )
        })
        .collect();
    for p in pending {
        assert_eq!(p.wait().await.unwrap(), 1);
    }

    let expected: Vec<String> = (0..20)
        .map(|i| format!("UPDATE `counter` SET `n`={i}"))
        .collect();
    assert_eq!(connector.server.statements(), expected);
    assert_eq!(connector.server.opened(), 1);
}

#[tokio::test]
async fn test_enqueue_error_does_not_stop_worker() {
    let (runner, _) = runner().await;
    let failed = runner.enqueue("UPDATE FAIL", Params::new());
    let ok = runner.enqueue("UPDATE `t` SET `a`=@a", Params::new().with("a", 1));

    assert!(matches!(failed.wait().await, Err(DbError::Other(_))));
    assert_eq!(ok.wait().await.unwrap(), 1);
    assert_eq!(
        runner
            .execute_dedicated("DELETE FROM `t`", Params::new())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_lost_dedicated_connection_is_reopened() {
    use std::sync::atomic::Ordering;

    let (runner, connector) = runner().await;
    let server = &connector.server;
    runner
        .execute_dedicated("DELETE FROM `a`", Params::new())
        .await
        .unwrap();

    server.drop_connection(0);
    runner
        .execute_dedicated("DELETE FROM `b`", Params::new())
        .await
        .unwrap();
    assert_eq!(server.statement_connections(), vec![0, 1]);
    assert_eq!(server.opened(), 2);
    assert_eq!(server.closed(), 1);

    // A failed reconnect answers the job and the next one tries again.
    server.drop_connection(1);
    server.refuse.store(true, Ordering::SeqCst);
    let err = runner
        .enqueue("DELETE FROM `c`", Params::new())
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Connection(_)));

    server.refuse.store(false, Ordering::SeqCst);
    runner
        .execute_dedicated("DELETE FROM `d`", Params::new())
        .await
        .unwrap();
    assert_eq!(server.statement_connections(), vec![0, 1, 2]);
    assert_eq!(runner.pool().live_objects(), 0);

    runner.shutdown().await.unwrap();
    assert_eq!(connector.server.closed(), 3);
}

#[tokio::test]
async fn test_shutdown_drains_queue() {
    let (runner, connector) = runner().await;
    let pending: Vec<_> = (0..5)
        .map(|_| runner.enqueue("DELETE FROM `t`", Params::new()))
        .collect();
    runner.shutdown().await.unwrap();

    for p in pending {
        assert_eq!(p.wait().await.unwrap(), 0);
    }
    assert_eq!(connector.server.statements().len(), 5);
    assert_eq!(connector.server.closed(), 1);
}

#[tokio::test]
async fn test_statistics_collected() {
    let stats = Arc::new(QueryStatsCollector::new());
    let (runner, _) = runner().await;
    let runner = runner
        .with_config(
            MonitorConfig::new()
                .with_slow_query_threshold(Duration::ZERO)
                .enable_monitoring(),
        )
        .with_collector(stats.clone());
    let pool = runner.pool().clone();
    let mut conn = pool.acquire().await.unwrap();

    let params = Params::new().with("a", 1).with("b", 2).with("c", 3);
    let rows = runner
        .select(&mut conn, "SELECT * FROM `t`", &params)
        .await
        .unwrap()
        .collect_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    runner
        .execute(&mut conn, "UPDATE `t` SET `a`=@a", &params)
        .await
        .unwrap();
    runner
        .insert_returning_id(&mut conn, "INSERT INTO `t` (`a`) VALUES (@a)", &params)
        .await
        .unwrap();
    let _ = runner.execute(&mut conn, "DELETE FAIL", &params).await;
    runner.execute_dedicated("REPLACE INTO `t` (`a`) VALUES (@a)", params.clone()).await.unwrap();

    let s = stats.stats();
    assert_eq!(s.total_queries, 5);
    assert_eq!(s.failed_queries, 1);
    assert_eq!(s.slow_queries, 5);
    assert_eq!(s.rows_read, 3);
    assert_eq!(s.rows_affected, 6);
    assert_eq!(s.select_count, 1);
    assert_eq!(s.insert_count, 1);
    assert_eq!(s.update_count, 1);
    assert_eq!(s.delete_count, 1);
    assert_eq!(s.replace_count, 1);
}

#[tokio::test]
async fn test_monitoring_disabled_by_default() {
    let recorder = Arc::new(RecordingCollector::default());
    let (runner, _) = runner().await;
    let runner = runner.with_collector(recorder.clone());
    let mut conn = runner.pool().acquire().await.unwrap();

    runner
        .execute(&mut conn, "DELETE FROM `t`", &Params::new())
        .await
        .unwrap();
    assert!(recorder.outcomes().is_empty());
    assert_eq!(*recorder.started.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_reader_reports_when_dropped_early() {
    let recorder = Arc::new(RecordingCollector::default());
    let (runner, _) = runner().await;
    let runner = runner
        .with_config(MonitorConfig::new().enable_monitoring())
        .with_collector(recorder.clone());
    let mut conn = runner.pool().acquire().await.unwrap();

    let params = Params::new().with("a", 1).with("b", 2).with("c", 3);
    let mut reader = runner
        .select(&mut conn, "SELECT * FROM `t`", &params)
        .await
        .unwrap();
    reader.next().await.unwrap().unwrap();
    assert!(recorder.outcomes().is_empty());
    drop(reader);

    runner.execute_dedicated("DELETE FROM `t`", Params::new()).await.unwrap();

    assert_eq!(
        recorder.outcomes(),
        vec![QueryOutcome::Rows(1), QueryOutcome::Affected(0)]
    );
    assert_eq!(
        recorder.tags(),
        vec![Some("pool".to_string()), Some("runner".to_string())]
    );
    assert_eq!(*recorder.started.lock().unwrap(), 2);
}

#[test]
fn test_runner_types_are_send() {
    fn assert_send<T: Send>() {}
    assert_send::<QueryRunner<FakeConnector>>();
    assert_send::<RowReader<'static, RowOf<FakeConnector>>>();
    assert_send::<PendingExecution>();
}
