use std::time::Duration;

use thiserror::Error;

/// Failures while querying a claim adapter.
///
/// These never propagate to access decisions: the directory logs them and
/// treats the adapter as abstaining for that call.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The adapter did not answer within its configured budget.
    #[error("adapter {adapter} timed out after {timeout:?}")]
    Timeout { adapter: String, timeout: Duration },

    /// The adapter crashed or is otherwise unreachable.
    #[error("adapter {adapter} unavailable: {reason}")]
    Unavailable { adapter: String, reason: String },
}
