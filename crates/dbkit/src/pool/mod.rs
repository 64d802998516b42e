//! Grow-on-demand connection pool.
//!
//! The pool never makes a caller wait for another caller's connection: when
//! no free slot holds a usable connection, a new physical connection is
//! opened. Growth is unbounded unless [`PoolConfig::max_size`] is set, in
//! which case `acquire` fails fast with [`DbError::PoolExhausted`].
//!
//! All bookkeeping happens under one mutex that is never held across an
//! `.await`; connections are opened and closed outside it.
//!
//! # Example
//!
//! ```ignore
//! use dbkit::{ConnectionPool, PgConnector, PoolConfig};
//!
//! let pool = ConnectionPool::new(PgConnector::new("postgres://localhost/game")?);
//! let mut conn = pool.acquire().await?;
//! // ... run queries on conn
//! pool.free(conn)?;
//! ```

mod connection;
mod connector;


use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub use connection::{LeaseInfo, PooledConnection};
pub use connector::{Connection, Connector, RowStream};

use crate::dialect::DialectSettings;
use crate::error::{DbError, DbResult};
use crate::param::{Parameter, Value};

/// Pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of simultaneously leased connections. `None` (default)
    /// grows without bound.
    pub max_size: Option<usize>,
    /// Close the physical connection when it is freed (default). When
    /// `false` it is kept open for the next `acquire`.
    pub close_on_free: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: None,
            close_on_free: true,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.max_size = None;
        self
    }

    pub fn close_on_free(mut self, close: bool) -> Self {
        self.close_on_free = close;
        self
    }

    /// Keep freed connections open for reuse.
    pub fn keep_warm(self) -> Self {
        self.close_on_free(false)
    }
}

/// Point-in-time counts of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Leases currently held (including ones still connecting).
    pub leased: usize,
    /// Slots available for reuse.
    pub free_slots: usize,
    /// Free slots that still hold an open connection.
    pub warm: usize,
    /// Slots allocated since creation or the last `clear`.
    pub total_slots: usize,
    pub max_size: Option<usize>,
}

struct FreeSlot<T> {
    slot: usize,
    conn: Option<T>,
}

struct LeaseEntry {
    info: LeaseInfo,
    revoked: Arc<AtomicBool>,
}

struct PoolState<T> {
    free: Vec<FreeSlot<T>>,
    leased: HashMap<usize, LeaseEntry>,
    next_slot: usize,
}

impl<T> PoolState<T> {
    fn new() -> Self {
        Self {
            free: Vec::new(),
            leased: HashMap::new(),
            next_slot: 0,
        }
    }
}

/// A slot reserved for a caller that is about to get a connection.
struct Reservation<T> {
    info: LeaseInfo,
    revoked: Arc<AtomicBool>,
    warm: Option<T>,
}

/// Releases a reserved slot unless it was handed out as a lease.
///
/// `acquire` may be dropped while the connection is being opened; the guard
/// puts the slot back in that case.
struct ReservationGuard<'a, C: Connector> {
    inner: &'a PoolInner<C>,
    slot: usize,
    revoked: Arc<AtomicBool>,
    armed: bool,
}

impl<'a, C: Connector> ReservationGuard<'a, C> {
    fn new(inner: &'a PoolInner<C>, slot: usize, revoked: &Arc<AtomicBool>) -> Self {
        Self {
            inner,
            slot,
            revoked: Arc::clone(revoked),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<C: Connector> Drop for ReservationGuard<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.cancel(self.slot, &self.revoked);
        }
    }
}

pub(crate) struct PoolInner<C: Connector> {
    connector: C,
    config: PoolConfig,
    state: Mutex<PoolState<C::Connection>>,
}

impl<C: Connector> PoolInner<C> {
    fn lock(&self) -> MutexGuard<'_, PoolState<C::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(&self) -> DbResult<Reservation<C::Connection>> {
        let mut state = self.lock();
        if let Some(max_size) = self.config.max_size {
            if state.leased.len() >= max_size {
                return Err(DbError::PoolExhausted { max_size });
            }
        }

        let free = match state.free.iter().rposition(|s| s.conn.is_some()) {
            Some(pos) => Some(state.free.swap_remove(pos)),
            None => state.free.pop(),
        };
        let (slot, warm) = match free {
            Some(FreeSlot { slot, conn }) => (slot, conn),
            None => {
                let slot = state.next_slot;
                state.next_slot += 1;
                (slot, None)
            }
        };

        let info = LeaseInfo {
            slot,
            leased_at: Instant::now(),
        };
        let revoked = Arc::new(AtomicBool::new(false));
        state.leased.insert(
            slot,
            LeaseEntry {
                info,
                revoked: Arc::clone(&revoked),
            },
        );
        Ok(Reservation {
            info,
            revoked,
            warm,
        })
    }

    /// Undo a reservation that never became a [`PooledConnection`].
    fn cancel(&self, slot: usize, revoked: &AtomicBool) {
        let mut state = self.lock();
        if revoked.load(Ordering::Acquire) {
            return;
        }
        state.leased.remove(&slot);
        state.free.push(FreeSlot { slot, conn: None });
    }

    /// Return a connection from a dropped or freed handle.
    pub(crate) fn give_back(&self, slot: usize, revoked: &AtomicBool, conn: C::Connection) {
        let to_close = {
            let mut state = self.lock();
            if revoked.load(Ordering::Acquire) {
                // free_all/clear already released the slot.
                Some(conn)
            } else {
                state.leased.remove(&slot);
                if self.config.close_on_free || conn.is_closed() {
                    state.free.push(FreeSlot { slot, conn: None });
                    Some(conn)
                } else {
                    state.free.push(FreeSlot {
                        slot,
                        conn: Some(conn),
                    });
                    None
                }
            }
        };
        if let Some(conn) = to_close {
            self.connector.close(conn);
            tracing::debug!(target: "dbkit.pool", slot, "closed connection");
        }
    }
}

/// Connection pool. Cloning is cheap and shares the same pool.
pub struct ConnectionPool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish()
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// Create a pool with the default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, PoolConfig::default())
    }

    pub fn with_config(connector: C, config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                connector,
                config,
                state: Mutex::new(PoolState::new()),
            }),
        }
    }

    /// Lease a connection, opening a new one when no warm connection is free.
    pub async fn acquire(&self) -> DbResult<PooledConnection<C>> {
        loop {
            let Reservation {
                info,
                revoked,
                warm,
            } = self.inner.reserve()?;
            let guard = ReservationGuard::new(&self.inner, info.slot, &revoked);

            let conn = match warm {
                Some(conn) if !conn.is_closed() => conn,
                stale => {
                    if let Some(conn) = stale {
                        self.inner.connector.close(conn);
                    }
                    let conn = self.inner.connector.connect().await?;
                    tracing::debug!(target: "dbkit.pool", slot = info.slot, "opened connection");
                    conn
                }
            };

            // Revoked while connecting: the slot is no longer ours.
            if revoked.load(Ordering::Acquire) {
                self.inner.connector.close(conn);
                continue;
            }

            guard.disarm();
            return Ok(PooledConnection {
                conn: Some(conn),
                info,
                revoked,
                pool: Arc::downgrade(&self.inner),
            });
        }
    }

    /// Give a connection back.
    ///
    /// Fails with [`DbError::ForeignConnection`] when `conn` was leased by
    /// another pool; that connection then returns to its own pool on drop.
    pub fn free(&self, conn: PooledConnection<C>) -> DbResult<()> {
        if !conn.belongs_to(&self.inner) {
            return Err(DbError::ForeignConnection);
        }
        drop(conn);
        Ok(())
    }

    /// Give a connection back, handing a foreign one back to the caller untouched.
    pub fn try_free(&self, conn: PooledConnection<C>) -> Result<(), PooledConnection<C>> {
        if !conn.belongs_to(&self.inner) {
            return Err(conn);
        }
        drop(conn);
        Ok(())
    }

    /// Free the connection held in `slot`, leaving it empty.
    pub fn free_taken(&self, slot: &mut Option<PooledConnection<C>>) -> DbResult<()> {
        let conn = slot
            .take()
            .ok_or_else(|| DbError::invalid_argument("no connection to free"))?;
        self.free(conn)
    }

    /// Revoke every lease matching `predicate` and return its slot to the
    /// free set. Returns the number of leases revoked.
    pub fn free_all<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&LeaseInfo) -> bool,
    {
        let mut state = self.inner.lock();
        let matched: Vec<usize> = state
            .leased
            .values()
            .filter(|entry| predicate(&entry.info))
            .map(|entry| entry.info.slot)
            .collect();

        for slot in &matched {
            if let Some(entry) = state.leased.remove(slot) {
                entry.revoked.store(true, Ordering::Release);
                state.free.push(FreeSlot {
                    slot: *slot,
                    conn: None,
                });
            }
        }
        drop(state);

        if !matched.is_empty() {
            tracing::debug!(target: "dbkit.pool", count = matched.len(), "revoked leases");
        }
        matched.len()
    }

    /// Revoke all leases, close warm connections and reset slot numbering.
    pub fn clear(&self) {
        let (revoked, warm) = {
            let mut state = self.inner.lock();
            let revoked = state.leased.len();
            for (_, entry) in state.leased.drain() {
                entry.revoked.store(true, Ordering::Release);
            }
            let warm: Vec<_> = state.free.drain(..).filter_map(|s| s.conn).collect();
            state.next_slot = 0;
            (revoked, warm)
        };
        let closed = warm.len();
        for conn in warm {
            self.inner.connector.close(conn);
        }
        tracing::debug!(target: "dbkit.pool", revoked, closed, "cleared pool");
    }

    /// Number of connections currently leased.
    pub fn live_objects(&self) -> usize {
        self.inner.lock().leased.len()
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.inner.lock();
        PoolStatus {
            leased: state.leased.len(),
            free_slots: state.free.len(),
            warm: state.free.iter().filter(|s| s.conn.is_some()).count(),
            total_slots: state.next_slot,
            max_size: self.inner.config.max_size,
        }
    }

    /// Parameter factory of the backend.
    pub fn create_parameter(&self, name: &str, value: impl Into<Value>) -> DbResult<Parameter> {
        self.inner.connector.create_parameter(name, value.into())
    }

    /// Id generated by the last insert on `conn`.
    pub async fn get_last_inserted_id(&self, conn: &mut PooledConnection<C>) -> DbResult<i64> {
        conn.connection_mut()?.last_insert_id().await
    }

    /// Sentinel that makes the backend generate an auto-increment id on insert.
    pub fn auto_increment_value(&self) -> Option<Value> {
        self.inner.connector.auto_increment_value()
    }

    pub fn dialect(&self) -> Arc<DialectSettings> {
        self.inner.connector.dialect()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }
}
