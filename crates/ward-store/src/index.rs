use std::collections::HashMap;

use ward_types::{AreaBounds, BlockPos, Lock, LockId};

use crate::error::{StoreError, StoreResult};

/// The record table and location index, kept in lockstep.
///
/// Both backends hold one of these behind a `RwLock`: the memory store as
/// its only state, the file store as the authoritative in-memory view over
/// its data directory. All invariant checks live here so the two backends
/// cannot drift.
#[derive(Debug, Default)]
pub(crate) struct LockIndex {
    by_id: HashMap<LockId, Lock>,
    by_pos: HashMap<BlockPos, LockId>,
}

impl LockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: &BlockPos) -> Option<&Lock> {
        self.by_pos.get(pos).and_then(|id| self.by_id.get(id))
    }

    pub fn get_by_id(&self, id: LockId) -> Option<&Lock> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check every precondition of a put without mutating anything.
    pub fn validate_put(&self, lock: &Lock, expected_version: u64) -> StoreResult<()> {
        if lock.locations.is_empty() {
            return Err(StoreError::EmptyLocations(lock.id));
        }
        match self.by_id.get(&lock.id) {
            None if expected_version != 0 => {
                return Err(StoreError::VersionConflict {
                    id: lock.id,
                    expected: expected_version,
                    actual: 0,
                });
            }
            Some(stored) if stored.version != expected_version => {
                return Err(StoreError::VersionConflict {
                    id: lock.id,
                    expected: expected_version,
                    actual: stored.version,
                });
            }
            _ => {}
        }
        for pos in &lock.locations {
            if let Some(by) = self.by_pos.get(pos) {
                if *by != lock.id {
                    return Err(StoreError::LocationOccupied {
                        pos: pos.clone(),
                        by: *by,
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply a validated put. The caller has already bumped the version.
    pub fn commit_put(&mut self, stored: Lock) {
        // Drop index entries for locations the lock no longer covers.
        if let Some(old) = self.by_id.get(&stored.id) {
            let gone: Vec<BlockPos> = old
                .locations
                .difference(&stored.locations)
                .cloned()
                .collect();
            for pos in gone {
                self.by_pos.remove(&pos);
            }
        }
        for pos in &stored.locations {
            self.by_pos.insert(pos.clone(), stored.id);
        }
        self.by_id.insert(stored.id, stored);
    }

    /// Check the preconditions of a delete; returns the current record.
    pub fn validate_delete(&self, id: LockId, expected_version: u64) -> StoreResult<&Lock> {
        let stored = self.by_id.get(&id).ok_or(StoreError::NotFound(id))?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        Ok(stored)
    }

    /// Apply a validated delete.
    pub fn commit_delete(&mut self, id: LockId) {
        if let Some(old) = self.by_id.remove(&id) {
            for pos in &old.locations {
                self.by_pos.remove(pos);
            }
        }
    }

    /// Clone every lock with at least one location inside the bounds.
    pub fn snapshot(&self, bounds: &AreaBounds) -> Vec<Lock> {
        self.by_id
            .values()
            .filter(|lock| lock.locations.iter().any(|pos| bounds.contains(pos)))
            .cloned()
            .collect()
    }

    /// Insert a record loaded from disk, refusing index collisions.
    /// Returns `false` (and leaves the index untouched) if any location is
    /// already taken — the caller logs and skips the record.
    pub fn load(&mut self, lock: Lock) -> bool {
        if lock.locations.is_empty() || self.by_id.contains_key(&lock.id) {
            return false;
        }
        if lock
            .locations
            .iter()
            .any(|pos| self.by_pos.contains_key(pos))
        {
            return false;
        }
        self.commit_put(lock);
        true
    }
}
