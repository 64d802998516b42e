use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use super::PoolInner;
use super::connector::Connector;
use crate::error::{DbError, DbResult};

/// Public view of a lease, handed to the [`free_all`](super::ConnectionPool::free_all) predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseInfo {
    pub(crate) slot: usize,
    pub(crate) leased_at: Instant,
}

impl LeaseInfo {
    /// Pool slot index of the lease.
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn leased_at(&self) -> Instant {
        self.leased_at
    }

    /// Time since the connection was acquired.
    pub fn held_for(&self) -> Duration {
        self.leased_at.elapsed()
    }
}

/// A leased connection.
///
/// Dropping the handle gives the connection back to the pool that leased it.
/// Once the lease is revoked (by `free_all` or `clear`) every access fails
/// with [`DbError::LeaseRevoked`] and the physical connection is closed when
/// the handle is dropped.
pub struct PooledConnection<C: Connector> {
    pub(crate) conn: Option<C::Connection>,
    pub(crate) info: LeaseInfo,
    pub(crate) revoked: Arc<AtomicBool>,
    pub(crate) pool: Weak<PoolInner<C>>,
}

impl<C: Connector> PooledConnection<C> {
    /// The underlying connection, unless the lease was revoked.
    pub fn connection_mut(&mut self) -> DbResult<&mut C::Connection> {
        if self.is_revoked() {
            return Err(DbError::LeaseRevoked {
                slot: self.info.slot,
            });
        }
        self.conn.as_mut().ok_or(DbError::LeaseRevoked {
            slot: self.info.slot,
        })
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    pub fn slot(&self) -> usize {
        self.info.slot
    }

    pub fn lease_info(&self) -> LeaseInfo {
        self.info
    }

    pub(crate) fn belongs_to(&self, pool: &Arc<PoolInner<C>>) -> bool {
        std::ptr::eq(self.pool.as_ptr(), Arc::as_ptr(pool))
    }
}

impl<C: Connector> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("slot", &self.info.slot)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match self.pool.upgrade() {
            Some(pool) => pool.give_back(self.info.slot, &self.revoked, conn),
            None => drop(conn),
        }
    }
}
