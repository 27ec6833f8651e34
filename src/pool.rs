//! Connection pool partitioned by database role.
//!
//! Connections are handed out as `PooledConnection` guards; dropping the guard
//! returns the connection exactly once, whichever way the borrowing call
//! exits. The pool never blocks: when a role's partition is at its limit the
//! borrow fails with `ProxyError::Pool`.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ProxyError, ProxyResult};
use crate::identity::DbRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: u64,
    pub role: DbRole,
    pub opened_at: DateTime<Utc>,
}

impl Connection {
    /// Fail unless this connection was opened with at least `min` privileges.
    pub fn require(&self, min: DbRole) -> Result<()> {
        if self.role < min {
            bail!("permission denied for database role {} (requires {})", self.role, min);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Partition {
    idle: Vec<Connection>,
    in_use: usize,
}

#[derive(Default)]
struct PoolState {
    partitions: HashMap<DbRole, Partition>,
    next_id: u64,
}

pub struct ConnectionPool {
    limit_per_role: usize,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    pub fn new(limit_per_role: usize) -> Arc<Self> {
        Arc::new(Self { limit_per_role, state: Mutex::new(PoolState::default()) })
    }

    pub fn limit_per_role(&self) -> usize { self.limit_per_role }

    pub fn borrow(self: &Arc<Self>, role: DbRole) -> ProxyResult<PooledConnection> {
        let mut st = self.state.lock();
        let next_id = st.next_id;
        let part = st.partitions.entry(role).or_default();
        if part.in_use >= self.limit_per_role {
            warn!(target: "memberhub::pool", "pool.exhausted role={} limit={}", role, self.limit_per_role);
            return Err(ProxyError::Pool { role, limit: self.limit_per_role });
        }
        let (conn, opened) = match part.idle.pop() {
            Some(c) => (c, false),
            None => (Connection { id: next_id, role, opened_at: Utc::now() }, true),
        };
        part.in_use += 1;
        if opened { st.next_id += 1; }
        debug!(target: "memberhub::pool", "pool.borrow role={} conn={} opened={}", role, conn.id, opened);
        Ok(PooledConnection { conn, pool: Arc::clone(self) })
    }

    fn release(&self, conn: Connection) {
        let mut st = self.state.lock();
        let part = st.partitions.entry(conn.role).or_default();
        part.in_use = part.in_use.saturating_sub(1);
        debug!(target: "memberhub::pool", "pool.release role={} conn={}", conn.role, conn.id);
        part.idle.push(conn);
    }

    pub fn in_use(&self, role: DbRole) -> usize {
        self.state.lock().partitions.get(&role).map_or(0, |p| p.in_use)
    }

    pub fn idle(&self, role: DbRole) -> usize {
        self.state.lock().partitions.get(&role).map_or(0, |p| p.idle.len())
    }

    pub fn total_in_use(&self) -> usize {
        self.state.lock().partitions.values().map(|p| p.in_use).sum()
    }
}

/// A borrowed connection, returned to its pool on drop.
pub struct PooledConnection {
    conn: Connection,
    pool: Arc<ConnectionPool>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection { &self.conn }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection").field("conn", &self.conn).finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.release(self.conn.clone());
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
