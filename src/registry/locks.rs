//! Striped name locks
//!
//! Serializes read-modify-write sequences on the same resource name. The
//! guard is held across engine calls, so the stripes are async mutexes.

use super::namespace_registry::shard_for;
use tokio::sync::{Mutex, MutexGuard};

/// Default number of stripes
pub const LOCK_STRIPE_COUNT: usize = 64;

/// Fixed set of async mutexes selected by key hash
pub struct StripedLocks {
    stripes: Box<[Mutex<()>]>,
}

impl StripedLocks {
    pub fn new(stripe_count: usize) -> Self {
        let stripe_count = stripe_count.max(1);
        Self {
            stripes: (0..stripe_count).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Acquire the stripe that owns `key`
    pub async fn lock(&self, key: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_index(key)].lock().await
    }

    pub fn stripe_index(&self, key: &str) -> usize {
        shard_for(key, self.stripes.len())
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(LOCK_STRIPE_COUNT)
    }
}
