use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A lockable row. Webhook events get their own key so duplicate deliveries
/// of the same event serialize even before an order row exists for them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    User(u64),
    Order(u64),
    Withdrawal(u64),
    Event(String),
}

/// Registry of per-row async mutexes.
///
/// Every mutating engine operation acquires the locks for the rows it will
/// read-check-write, so the critical section spans exactly the check and the
/// commit. Keys are acquired in sorted order, which rules out lock-order
/// deadlocks between concurrent operations touching overlapping rows.
#[derive(Default)]
pub struct RowLocks {
    inner: Mutex<HashMap<RowKey, Arc<AsyncMutex<()>>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the given row locks, sorted and deduplicated. The guards
    /// release on drop.
    pub async fn acquire(&self, mut keys: Vec<RowKey>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let lock = {
                let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                Arc::clone(map.entry(key).or_default())
            };
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}
