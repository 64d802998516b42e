//! PostgreSQL backend built on `tokio-postgres`.
//!
//! ```ignore
//! use dbkit::{ConnectionPool, PgConnector};
//!
//! let pool = ConnectionPool::new(PgConnector::new("postgres://postgres@localhost/game")?);
//! ```

mod bind;
mod value;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls, Row};

use crate::dialect::DialectSettings;
use crate::error::{DbError, DbResult};
use crate::param::Params;
use crate::pool::{Connection, Connector, RowStream};

use bind::bind_named;

/// Opens `tokio-postgres` connections without TLS.
#[derive(Clone)]
pub struct PgConnector {
    config: Config,
    dialect: Arc<DialectSettings>,
}

impl PgConnector {
    /// Create a connector from a `postgres://` URL or key-value string.
    pub fn new(database_url: &str) -> DbResult<Self> {
        let config: Config = database_url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Connection(e.to_string()))?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            dialect: Arc::new(DialectSettings::postgres()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl std::fmt::Debug for PgConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnector")
            .field("hosts", &self.config.get_hosts())
            .field("dbname", &self.config.get_dbname())
            .finish_non_exhaustive()
    }
}

impl Connector for PgConnector {
    type Connection = PgConnection;

    fn dialect(&self) -> Arc<DialectSettings> {
        Arc::clone(&self.dialect)
    }

    async fn connect(&self) -> DbResult<PgConnection> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "dbkit.pool", error = %e, "postgres connection error");
            }
        });

        Ok(PgConnection {
            client,
            dialect: Arc::clone(&self.dialect),
        })
    }
}

/// An open `tokio-postgres` client.
///
/// Named `@param` markers are rewritten to `$n` before each statement.
pub struct PgConnection {
    client: Client,
    dialect: Arc<DialectSettings>,
}

impl PgConnection {
    /// The underlying client, for statements outside the runner.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

impl Connection for PgConnection {
    type Row = Row;

    async fn query(&mut self, sql: &str, params: &Params) -> DbResult<RowStream<Row>> {
        let bound = bind_named(sql, params)?;
        let stream = self
            .client
            .query_raw(&*bound.sql, bound.values.iter().map(|v| *v as &(dyn ToSql + Sync)))
            .await
            .map_err(DbError::from_db_error)?;
        Ok(RowStream::new(PgRows {
            inner: Box::pin(stream),
        }))
    }

    async fn execute(&mut self, sql: &str, params: &Params) -> DbResult<u64> {
        let bound = bind_named(sql, params)?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound
            .values
            .iter()
            .map(|v| *v as &(dyn ToSql + Sync))
            .collect();
        self.client
            .execute(&*bound.sql, &refs)
            .await
            .map_err(DbError::from_db_error)
    }

    async fn last_insert_id(&mut self) -> DbResult<i64> {
        let row = self
            .client
            .query_one(self.dialect.last_insert_id_sql(), &[])
            .await
            .map_err(DbError::from_db_error)?;
        row.try_get::<_, i64>(0)
            .map_err(|e| DbError::decode("lastval", e.to_string()))
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

struct PgRows {
    inner: Pin<Box<tokio_postgres::RowStream>>,
}

impl Stream for PgRows {
    type Item = DbResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner
            .as_mut()
            .poll_next(cx)
            .map(|row| row.map(|r| r.map_err(DbError::from_db_error)))
    }
}
