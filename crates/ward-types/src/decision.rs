use std::fmt;

use serde::{Deserialize, Serialize};

/// The final outcome of an access check: the evaluator never abstains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The deny reason, if this is a deny.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Deny { reason } => write!(f, "deny: {reason}"),
        }
    }
}

/// The outcome of asking a single claim adapter. Unlike [`Decision`],
/// adapters may abstain, letting the next authority decide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Allow,
    Deny { reason: String },
    /// No opinion about this location or actor.
    Abstain,
}

impl Verdict {
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_abstain(&self) -> bool {
        matches!(self, Verdict::Abstain)
    }

    /// Convert to a final decision; `None` if the adapter abstained.
    pub fn into_decision(self) -> Option<Decision> {
        match self {
            Verdict::Allow => Some(Decision::Allow),
            Verdict::Deny { reason } => Some(Decision::Deny { reason }),
            Verdict::Abstain => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "allow"),
            Verdict::Deny { reason } => write!(f, "deny: {reason}"),
            Verdict::Abstain => write!(f, "abstain"),
        }
    }
}
