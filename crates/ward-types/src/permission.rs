use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How much access an ACL entry grants. Levels are totally ordered:
/// `None < View < Use < Manage`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Explicitly no access. Useful to shadow a broader group grant.
    #[default]
    None,
    /// May inspect the block (see contents, read attached signs).
    View,
    /// May use the block (open the door, move items in and out).
    Use,
    /// May manage the protection itself (edit the ACL, expand, detach).
    Manage,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            PermissionLevel::None => "none",
            PermissionLevel::View => "view",
            PermissionLevel::Use => "use",
            PermissionLevel::Manage => "manage",
        };
        write!(f, "{word}")
    }
}

impl FromStr for PermissionLevel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(PermissionLevel::None),
            "view" => Ok(PermissionLevel::View),
            "use" => Ok(PermissionLevel::Use),
            "manage" => Ok(PermissionLevel::Manage),
            other => Err(TypeError::InvalidPermissionLevel(other.to_string())),
        }
    }
}

/// An interaction a player attempts on a block. Each action requires a
/// minimum [`PermissionLevel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Look at the block or its protection info.
    View,
    /// Interact with the block: open, deposit, withdraw.
    Use,
    /// Modify the protection: edit signs, transfer, destroy.
    Manage,
}

impl Action {
    /// The minimum permission level that allows this action.
    pub fn required_level(&self) -> PermissionLevel {
        match self {
            Action::View => PermissionLevel::View,
            Action::Use => PermissionLevel::Use,
            Action::Manage => PermissionLevel::Manage,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Action::View => "view",
            Action::Use => "use",
            Action::Manage => "manage",
        };
        write!(f, "{word}")
    }
}

impl FromStr for Action {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Action::View),
            "use" => Ok(Action::Use),
            "manage" => Ok(Action::Manage),
            other => Err(TypeError::InvalidAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(PermissionLevel::None < PermissionLevel::View);
        assert!(PermissionLevel::View < PermissionLevel::Use);
        assert!(PermissionLevel::Use < PermissionLevel::Manage);
    }

    #[test]
    fn actions_map_to_levels() {
        assert_eq!(Action::View.required_level(), PermissionLevel::View);
        assert_eq!(Action::Use.required_level(), PermissionLevel::Use);
        assert_eq!(Action::Manage.required_level(), PermissionLevel::Manage);
    }

    #[test]
    fn level_parse_is_case_insensitive() {
        assert_eq!(
            "Manage".parse::<PermissionLevel>().unwrap(),
            PermissionLevel::Manage
        );
        assert_eq!(
            " use ".parse::<PermissionLevel>().unwrap(),
            PermissionLevel::Use
        );
        assert!("admin".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn unknown_action_names_the_action() {
        let err = "fly".parse::<Action>().unwrap_err();
        assert_eq!(err.to_string(), r#"unknown action: "fly""#);
    }

    #[test]
    fn level_display_roundtrip() {
        for level in [
            PermissionLevel::None,
            PermissionLevel::View,
            PermissionLevel::Use,
            PermissionLevel::Manage,
        ] {
            assert_eq!(level.to_string().parse::<PermissionLevel>().unwrap(), level);
        }
    }
}
