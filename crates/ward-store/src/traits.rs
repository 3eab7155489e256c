use ward_types::{AreaBounds, BlockPos, Lock, LockId};

use crate::error::StoreResult;

/// A finite, restartable scan over the locks in an area.
///
/// The iterator walks a snapshot taken when `scan` was called; concurrent
/// writes do not affect an in-progress scan. Restart by calling `scan`
/// again.
pub struct Scan {
    locks: std::vec::IntoIter<Lock>,
}

impl Scan {
    pub(crate) fn from_snapshot(mut locks: Vec<Lock>) -> Self {
        // Deterministic order keeps scans reproducible across backends.
        locks.sort_by_key(|lock| lock.id);
        Self {
            locks: locks.into_iter(),
        }
    }
}

impl Iterator for Scan {
    type Item = Lock;

    fn next(&mut self) -> Option<Lock> {
        self.locks.next()
    }
}

/// Durable keyed storage for lock records.
///
/// All implementations must satisfy these invariants:
/// - A position maps to at most one lock at any time.
/// - A lock record and its location index entries update atomically.
/// - Writes are compare-and-swap on the lock version; the caller passes the
///   version it last read (`0` to create) and a mismatch fails with
///   `VersionConflict` instead of overwriting.
/// - All I/O errors are propagated, never silently ignored.
pub trait ProtectionStore: Send + Sync {
    /// The lock covering the given position, if any.
    fn get(&self, pos: &BlockPos) -> StoreResult<Option<Lock>>;

    /// A lock by its id, if it exists.
    fn get_by_id(&self, id: LockId) -> StoreResult<Option<Lock>>;

    /// Create or update a lock.
    ///
    /// `expected_version == 0` creates: the id must be unused and every
    /// location unoccupied. Otherwise the stored version must equal
    /// `expected_version`; locations may only be occupied by this same lock.
    /// On success the stored record carries `expected_version + 1` and is
    /// returned.
    fn put(&self, lock: &Lock, expected_version: u64) -> StoreResult<Lock>;

    /// Delete a lock, checking its version like [`Self::put`].
    fn delete(&self, id: LockId, expected_version: u64) -> StoreResult<()>;

    /// Scan all locks intersecting the given bounds.
    fn scan(&self, bounds: &AreaBounds) -> StoreResult<Scan>;
}
