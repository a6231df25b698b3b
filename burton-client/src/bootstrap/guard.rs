//! Per-member in-flight guard
//!
//! Serialises bootstrap runs for the same member number inside one process.
//! Entries are removed when the last holder or waiter lets go.

use dashmap::DashMap;
use shared::models::MemberNumber;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = Arc<DashMap<MemberNumber, Arc<Mutex<()>>>>;

#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    locks: LockMap,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `number`
    pub async fn acquire(&self, number: &MemberNumber) -> InFlightGuard {
        let lock = self.locks.entry(number.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        InFlightGuard {
            key: number.clone(),
            locks: self.locks.clone(),
            _guard: guard,
        }
    }

    pub fn is_in_flight(&self, number: &MemberNumber) -> bool {
        self.locks
            .get(number)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct InFlightGuard {
    key: MemberNumber,
    locks: LockMap,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // map + this guard; anything more is a waiter
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}
