use thiserror::Error;

/// Errors from parsing or constructing foundation types.
#[derive(Debug, Error)]
pub enum TypeError {
    /// The string is not a recognized permission level.
    #[error("unknown permission level: {0:?}")]
    InvalidPermissionLevel(String),

    /// The string is not a recognized lock type header.
    #[error("unknown lock type: {0:?}")]
    InvalidLockType(String),

    /// The string is not a recognized action.
    #[error("unknown action: {0:?}")]
    InvalidAction(String),
}
