use ward_acl::ParseError;
use ward_store::StoreError;
use ward_types::{BlockPos, LockId, PlayerId};

/// Errors from access evaluation and lifecycle transitions.
#[derive(Debug, thiserror::Error)]
pub enum WardError {
    /// The block kind does not accept locks.
    #[error("{kind:?} at {pos} cannot hold a lock")]
    NotLockable { pos: BlockPos, kind: String },

    /// The position already belongs to a lock. Also the outcome for the
    /// loser of a concurrent attach race.
    #[error("{pos} is already protected by {by}")]
    AlreadyLocked { pos: BlockPos, by: LockId },

    /// The operation needs a lock at the position and there is none.
    #[error("no lock at {pos}")]
    NoLock { pos: BlockPos },

    /// The actor may not perform this lifecycle operation.
    #[error("{actor} may not {operation} this lock")]
    NotAuthorized {
        actor: PlayerId,
        operation: &'static str,
    },

    /// A claim system vetoed placing a lock here.
    #[error("lock placement denied: {reason}")]
    PlacementDenied { reason: String },

    /// The expansion target is not a valid extension of the lock.
    #[error("cannot expand lock to {pos}: {reason}")]
    IncompatibleExpansion { pos: BlockPos, reason: String },

    /// The sign text is not a protection sign at all.
    #[error(transparent)]
    Sign(#[from] ParseError),

    /// A storage failure surfaced by a lifecycle operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for engine operations.
pub type WardResult<T> = Result<T, WardError>;
