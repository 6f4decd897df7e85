//! Per-team mutual exclusion.
//!
//! Check-then-act sequences (read loads, decide, write) hold the lock of
//! every team they touch. Multiple locks are always taken in id order so
//! two operations spanning the same pair of teams cannot deadlock.

use std::sync::Arc;

use crewboard_core::TeamId;
use dashmap::DashMap;
use parking_lot::{Mutex, RawMutex};
use parking_lot::lock_api::ArcMutexGuard;

/// Lazily created mutex per team.
#[derive(Debug, Default)]
pub struct TeamLocks {
    locks: DashMap<TeamId, Arc<Mutex<()>>>,
}

/// Held team locks; released on drop.
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct TeamGuard {
    _guards: Vec<ArcMutexGuard<RawMutex, ()>>,
}

impl TeamLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &TeamId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(id.clone()).or_default().value())
    }

    /// Lock every listed team (duplicates ignored), blocking until all are held.
    pub fn lock_all(&self, ids: &[TeamId]) -> TeamGuard {
        let mut ordered: Vec<&TeamId> = ids.iter().collect();
        ordered.sort();
        ordered.dedup();
        let guards = ordered
            .into_iter()
            .map(|id| self.handle(id).lock_arc())
            .collect();
        TeamGuard { _guards: guards }
    }

    /// Lock a single team.
    pub fn lock(&self, id: &TeamId) -> TeamGuard {
        self.lock_all(std::slice::from_ref(id))
    }

    /// Drop the entry of a deleted team.
    pub fn forget(&self, id: &TeamId) {
        let _ = self.locks.remove(id);
    }
}
