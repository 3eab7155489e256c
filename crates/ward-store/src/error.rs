use ward_types::{BlockPos, LockId};

/// Errors from protection store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The caller's expected version does not match the stored version.
    /// Transient: re-read the lock and retry against fresh state.
    #[error("version conflict on {id}: expected {expected}, stored {actual}")]
    VersionConflict {
        id: LockId,
        expected: u64,
        actual: u64,
    },

    /// A position in the written lock already belongs to another lock.
    #[error("location {pos} already belongs to {by}")]
    LocationOccupied { pos: BlockPos, by: LockId },

    /// The lock to update or delete does not exist.
    #[error("lock not found: {0}")]
    NotFound(LockId),

    /// A lock must cover at least one position.
    #[error("lock {0} has no locations")]
    EmptyLocations(LockId),

    /// The backend cannot be reached. Access checks degrade to
    /// deny-by-default; lifecycle mutations surface this to the actor.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
