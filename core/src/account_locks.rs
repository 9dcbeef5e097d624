//! Sharded per-account locking.
//!
//! Screening for a single account must run against a serializable view
//! of that account's rolling totals (two concurrent transactions must
//! not both miss a cumulative breach). A sharded mutex map keyed by
//! account number gives per-account mutual exclusion while keeping
//! cross-account screening parallel.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

const SHARD_COUNT: usize = 64;

pub struct AccountLocks {
    shards: Vec<Mutex<()>>,
}

impl Default for AccountLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountLocks {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Lock the shard owning `account`. Held for the whole
    /// read-screen-write-record span of one screening call. Accounts
    /// hashing to different shards never contend.
    pub fn lock(&self, account: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        account.hash(&mut hasher);
        let index = (hasher.finish() as usize) % SHARD_COUNT;
        // A poisoned shard only means another screening call panicked;
        // the guard itself carries no data.
        self.shards[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
