use std::fmt;

use thiserror::Error;

/// Hard parse failures. These mean "not a protection sign", never a partial
/// record: recoverable problems are reported as [`ParseWarning`]s instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The sign has no text at all.
    #[error("sign has no header line")]
    MissingHeader,

    /// The first line is not a recognized header.
    #[error("unrecognized sign header: {0:?}")]
    UnrecognizedHeader(String),
}

/// A dropped entry: which line, what it said, and why it was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseWarning {
    /// Zero-based line index on the sign.
    pub line: usize,
    /// The raw text of the dropped entry.
    pub text: String,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {:?} dropped: {}", self.line, self.text, self.reason)
    }
}
