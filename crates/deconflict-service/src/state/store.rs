//! Copy-on-write schedule store.

use deconflict_core::Trajectory;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registered trajectories in registration order, identifiers unique.
///
/// Readers take an `Arc` snapshot and release the lock before doing any
/// work; writers build a new vector and swap it in. A query running against
/// a snapshot never observes a later add or remove.
#[derive(Debug, Default)]
pub struct ScheduleStore {
    schedules: RwLock<Arc<Vec<Trajectory>>>,
}

impl ScheduleStore {
    /// Build from an initial set. A repeated identifier replaces the earlier
    /// entry in place.
    pub fn new(schedules: Vec<Trajectory>) -> Self {
        let mut deduped: Vec<Trajectory> = Vec::with_capacity(schedules.len());
        for trajectory in schedules {
            upsert(&mut deduped, trajectory);
        }
        Self {
            schedules: RwLock::new(Arc::new(deduped)),
        }
    }

    // The lock only ever guards a whole Arc, so a poisoned lock still holds
    // a consistent value.
    fn read(&self) -> RwLockReadGuard<'_, Arc<Vec<Trajectory>>> {
        self.schedules.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Vec<Trajectory>>> {
        self.schedules.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Point-in-time view of the schedule.
    pub fn snapshot(&self) -> Arc<Vec<Trajectory>> {
        Arc::clone(&self.read())
    }

    /// Register a trajectory, returning the entry it replaced, if any.
    pub fn insert(&self, trajectory: Trajectory) -> Option<Trajectory> {
        let mut guard = self.write();
        let mut next = Vec::clone(&guard);
        let replaced = upsert(&mut next, trajectory);
        *guard = Arc::new(next);
        replaced
    }

    /// Unregister by identifier. The schedule is untouched when nothing matches.
    pub fn remove(&self, trajectory_id: &str) -> Option<Trajectory> {
        let mut guard = self.write();
        let index = guard.iter().position(|t| t.id() == trajectory_id)?;
        let mut next = Vec::clone(&guard);
        let removed = next.remove(index);
        *guard = Arc::new(next);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.read().iter().map(|t| t.id().to_string()).collect()
    }
}

fn upsert(schedules: &mut Vec<Trajectory>, trajectory: Trajectory) -> Option<Trajectory> {
    match schedules.iter_mut().find(|t| t.id() == trajectory.id()) {
        Some(existing) => Some(std::mem::replace(existing, trajectory)),
        None => {
            schedules.push(trajectory);
            None
        }
    }
}
