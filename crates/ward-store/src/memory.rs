use std::sync::RwLock;

use ward_types::{AreaBounds, BlockPos, Lock, LockId};

use crate::error::StoreResult;
use crate::index::LockIndex;
use crate::traits::{ProtectionStore, Scan};

/// In-memory, HashMap-based protection store.
///
/// Intended for tests and embedding. All records are held behind a `RwLock`
/// and cloned on read. Compare-and-swap semantics are identical to the
/// durable backends.
pub struct MemoryProtectionStore {
    index: RwLock<LockIndex>,
}

impl MemoryProtectionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            index: RwLock::new(LockIndex::new()),
        }
    }

    /// Number of locks currently stored.
    pub fn len(&self) -> usize {
        self.index.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no locks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryProtectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectionStore for MemoryProtectionStore {
    fn get(&self, pos: &BlockPos) -> StoreResult<Option<Lock>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.get(pos).cloned())
    }

    fn get_by_id(&self, id: LockId) -> StoreResult<Option<Lock>> {
        let index = self.index.read().expect("lock poisoned");
        Ok(index.get_by_id(id).cloned())
    }

    fn put(&self, lock: &Lock, expected_version: u64) -> StoreResult<Lock> {
        let mut index = self.index.write().expect("lock poisoned");
        index.validate_put(lock, expected_version)?;
        let mut stored = lock.clone();
        stored.version = expected_version + 1;
        index.commit_put(stored.clone());
        Ok(stored)
    }

    fn delete(&self, id: LockId, expected_version: u64) -> StoreResult<()> {
        let mut index = self.index.write().expect("lock poisoned");
        index.validate_delete(id, expected_version)?;
        index.commit_delete(id);
        Ok(())
    }

    fn scan(&self, bounds: &AreaBounds) -> StoreResult<Scan> {
        let index = self.index.read().expect("lock poisoned");
        Ok(Scan::from_snapshot(index.snapshot(bounds)))
    }
}

impl std::fmt::Debug for MemoryProtectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProtectionStore")
            .field("lock_count", &self.len())
            .finish()
    }
}
