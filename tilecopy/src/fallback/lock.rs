//! Per-tile fetch locks.
//!
//! At most one fetch per [`LockKey`] is outstanding at any time. The first
//! request for a key becomes the leader and performs the fetch; requests that
//! arrive while it runs queue up as waiters and receive a clone of whatever
//! the leader settles with.
//!
//! ```text
//! Request A ─┐ leader ─────────────► fetch ─┐
//! Request B ─┤ waiter (queued)              │
//! Request C ─┘ waiter (queued)              │
//!              ◄─── settle: A, B, C all get the same result
//! ```
//!
//! A lock exists only while its fetch is outstanding. Settling removes it, so
//! the next request for the key starts over (and will normally find the tile
//! in cache).

use crate::backend::{BackendError, TileData};
use crate::coord::TileKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Result handed from a leader to its waiters.
pub type FetchOutcome = Result<TileData, BackendError>;

/// Lock identity: `<origin identity>:<z>/<x>/<y>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    pub fn new(origin: &str, key: &TileKey) -> Self {
        Self(format!("{}:{}", origin, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of lock table counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    /// Locks created (one per leader)
    pub leaders: u64,
    /// Requests queued behind a leader
    pub waiters: u64,
    /// Leaders dropped before settling
    pub abandoned: u64,
    /// Locks currently held
    pub active: usize,
}

/// Table of outstanding fetch locks, shared by every fallback source in a
/// run.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<LockKey, Vec<oneshot::Sender<FetchOutcome>>>,
    leaders: AtomicU64,
    waiters: AtomicU64,
    abandoned: AtomicU64,
}

/// What a request got from [`LockTable::acquire`].
pub enum Acquired<'a> {
    /// No fetch was outstanding; the caller must fetch and then settle.
    Leader(LockGuard<'a>),
    /// A fetch is outstanding; await the receiver for its outcome.
    Waiter(oneshot::Receiver<FetchOutcome>),
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `key`, or queues behind its current holder.
    pub fn acquire(&self, key: &LockKey) -> Acquired<'_> {
        match self.locks.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let (tx, rx) = oneshot::channel();
                entry.get_mut().push(tx);
                self.waiters.fetch_add(1, Ordering::Relaxed);
                trace!(lock = %key, queued = entry.get().len(), "Queued behind in-flight fetch");
                Acquired::Waiter(rx)
            }
            Entry::Vacant(entry) => {
                entry.insert(Vec::new());
                self.leaders.fetch_add(1, Ordering::Relaxed);
                Acquired::Leader(LockGuard {
                    table: self,
                    key: Some(key.clone()),
                })
            }
        }
    }

    /// Returns true if a fetch for `key` is outstanding.
    pub fn is_locked(&self, key: &LockKey) -> bool {
        self.locks.contains_key(key)
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            leaders: self.leaders.load(Ordering::Relaxed),
            waiters: self.waiters.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            active: self.locks.len(),
        }
    }

    /// Removes the lock and delivers `outcome` to its waiters in queue order.
    fn release(&self, key: &LockKey, outcome: &FetchOutcome) -> usize {
        let Some((_, waiters)) = self.locks.remove(key) else {
            return 0;
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter that gave up has dropped its receiver
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Ownership of a fetch lock.
///
/// Settle it with the fetch outcome. If it is dropped unsettled (the leader
/// was cancelled), the lock is released and waiters receive
/// [`BackendError::Abandoned`].
pub struct LockGuard<'a> {
    table: &'a LockTable,
    key: Option<LockKey>,
}

impl LockGuard<'_> {
    /// Releases the lock, waking every waiter with a clone of `outcome`.
    ///
    /// Returns the number of waiters woken.
    pub fn settle(mut self, outcome: &FetchOutcome) -> usize {
        match self.key.take() {
            Some(key) => self.table.release(&key, outcome),
            None => 0,
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.table.abandoned.fetch_add(1, Ordering::Relaxed);
            let woken = self
                .table
                .release(&key, &Err(BackendError::Abandoned(key.to_string())));
            debug!(lock = %key, waiters = woken, "Fetch leader dropped before settling");
        }
    }
}
