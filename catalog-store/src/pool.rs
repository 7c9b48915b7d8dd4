//! Fixed-size SQLite connection pool.
//!
//! Callers block in [`ConnectionPool::get`] until a connection is idle or the
//! acquire timeout elapses. A [`PooledConnection`] returns its connection on
//! drop, so early returns and errors never leak one.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::StoreError;

#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub size: usize,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        PoolOptions { size: 4, acquire_timeout: Duration::from_secs(5) }
    }
}

pub struct ConnectionPool {
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
    size: usize,
    acquire_timeout: Duration,
}

impl ConnectionPool {
    /// Open `opts.size` connections up front with `open`.
    pub fn build<F>(opts: PoolOptions, mut open: F) -> Result<Self, StoreError>
    where
        F: FnMut() -> Result<Connection, StoreError>,
    {
        let size = opts.size.max(1);
        let mut conns = Vec::with_capacity(size);
        for _ in 0..size {
            conns.push(open()?);
        }
        Ok(Self {
            idle: Mutex::new(conns),
            available: Condvar::new(),
            size,
            acquire_timeout: opts.acquire_timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of connections currently checked in.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn get(&self) -> Result<PooledConnection<'_>, StoreError> {
        let deadline = Instant::now() + self.acquire_timeout;
        let mut idle = self
            .idle
            .lock()
            .map_err(|_| StoreError::Unavailable("connection pool lock poisoned".into()))?;
        loop {
            if let Some(conn) = idle.pop() {
                return Ok(PooledConnection { pool: self, conn: Some(conn) });
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::Unavailable(format!(
                    "timed out after {:?} waiting for one of {} connections",
                    self.acquire_timeout, self.size
                )));
            }
            let (guard, _) = self
                .available
                .wait_timeout(idle, deadline - now)
                .map_err(|_| StoreError::Unavailable("connection pool lock poisoned".into()))?;
            idle = guard;
        }
    }

    fn put_back(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(conn);
            self.available.notify_one();
        }
    }
}

pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in drop.
        self.conn.as_ref().expect("pooled connection present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("pooled connection present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}
