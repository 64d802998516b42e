//! In-memory connector used by the pool and runner tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::dialect::DialectSettings;
use crate::error::{DbError, DbResult};
use crate::param::{Params, Value};
use crate::pool::{Connection, Connector, RowStream};

/// Shared counters of a [`FakeConnector`].
#[derive(Debug, Default)]
pub(crate) struct FakeServer {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub next_id: AtomicUsize,
    pub refuse: AtomicBool,
    pub last_insert_id: AtomicI64,
    /// `(connection id, sql)` in execution order.
    pub log: Mutex<Vec<(usize, String)>>,
    /// Connections the server has hung up on.
    dropped: Mutex<HashSet<usize>>,
}

impl FakeServer {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(_, sql)| sql.clone()).collect()
    }

    /// Connection id that ran each statement, in execution order.
    pub fn statement_connections(&self) -> Vec<usize> {
        self.log.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    /// Hang up on connection `id`, as a server restart would.
    pub fn drop_connection(&self, id: usize) {
        self.dropped.lock().unwrap().insert(id);
    }

    fn is_dropped(&self, id: usize) -> bool {
        self.dropped.lock().unwrap().contains(&id)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeConnector {
    pub server: Arc<FakeServer>,
    dialect: Arc<DialectSettings>,
    connect_delay: Option<Duration>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            server: Arc::new(FakeServer::default()),
            dialect: Arc::new(DialectSettings::mysql()),
            connect_delay: None,
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }
}

/// A fake physical connection.
///
/// * `query` yields one `[name, value]` row per bound parameter, in name
///   order. SQL containing `FAIL` fails.
/// * `execute` reports the number of bound parameters as affected rows and
///   bumps the server's insert id for statements starting with `INSERT`.
#[derive(Debug)]
pub(crate) struct FakeConnection {
    pub id: usize,
    pub closed: bool,
    server: Arc<FakeServer>,
}

impl FakeConnection {
    fn record(&self, sql: &str) -> DbResult<()> {
        if self.is_closed() {
            return Err(DbError::Closed(format!("connection {} is closed", self.id)));
        }
        self.server
            .log
            .lock()
            .unwrap()
            .push((self.id, sql.to_string()));
        if sql.contains("FAIL") {
            return Err(DbError::Other(format!("forced failure: {sql}")));
        }
        Ok(())
    }
}

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    fn dialect(&self) -> Arc<DialectSettings> {
        Arc::clone(&self.dialect)
    }

    async fn connect(&self) -> DbResult<FakeConnection> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.server.refuse.load(Ordering::SeqCst) {
            return Err(DbError::Connection("connection refused".into()));
        }
        self.server.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConnection {
            id: self.server.next_id.fetch_add(1, Ordering::SeqCst),
            closed: false,
            server: Arc::clone(&self.server),
        })
    }

    fn close(&self, _conn: FakeConnection) {
        self.server.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Connection for FakeConnection {
    type Row = Vec<Value>;

    async fn query(&mut self, sql: &str, params: &Params) -> DbResult<RowStream<Vec<Value>>> {
        self.record(sql)?;
        let rows = params
            .iter()
            .map(|(name, value)| Ok(vec![Value::Text(name.to_string()), value.clone()]))
            .collect();
        Ok(RowStream::from_rows(rows))
    }

    async fn execute(&mut self, sql: &str, params: &Params) -> DbResult<u64> {
        self.record(sql)?;
        if sql.trim_start().starts_with("INSERT") {
            self.server.last_insert_id.fetch_add(1, Ordering::SeqCst);
        }
        Ok(params.len() as u64)
    }

    async fn last_insert_id(&mut self) -> DbResult<i64> {
        Ok(self.server.last_insert_id.load(Ordering::SeqCst))
    }

    fn is_closed(&self) -> bool {
        self.closed || self.server.is_dropped(self.id)
    }
}
