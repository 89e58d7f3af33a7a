//! Handle allocation and bookkeeping shared by all providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::SubscriptionHandle;

/// Live subscriptions keyed by handle id
#[derive(Debug)]
pub(crate) struct Subscriptions<T> {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, T>>,
}

impl<T> Default for Subscriptions<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Subscriptions<T> {
    pub(crate) fn insert(&self, entry: T) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, entry);
        SubscriptionHandle::new(id)
    }

    pub(crate) fn remove(&self, handle: SubscriptionHandle) -> Option<T> {
        self.lock().remove(&handle.id())
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn drain(&self) -> Vec<T> {
        self.lock().drain().map(|(_, entry)| entry).collect()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<u64, T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Subscriptions<T> {
    /// Copy of all entries; callbacks are invoked outside the lock
    pub(crate) fn snapshot(&self) -> Vec<T> {
        let entries = self.lock();
        let mut ids: Vec<_> = entries.keys().copied().collect();
        ids.sort_unstable();
        ids.iter().filter_map(|id| entries.get(id).cloned()).collect()
    }
}
