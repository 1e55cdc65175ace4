use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db_types::OrderId;

//--------------------------------------      OrderLocks     ---------------------------------------------------------
/// Per-order mutual exclusion for the lifecycle engine.
///
/// Every mutation of an order and its transactions runs under that order's lock, so a
/// user-initiated call and a webhook delivery for the same order can never interleave partially.
/// Different orders use different locks and proceed in parallel; there is no global lock.
///
/// Lock entries are tiny and reused across the life of the process; they are not reaped.
#[derive(Clone, Default)]
pub struct OrderLocks {
    entries: Arc<Mutex<HashMap<OrderId, Arc<Mutex<()>>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for the given order, waiting if another task holds it. The registry
    /// lock is only held long enough to look up or insert the entry.
    pub async fn acquire(&self, id: OrderId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(id).or_default())
        };
        entry.lock_owned().await
    }
}
