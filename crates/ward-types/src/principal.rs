use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a player.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Generate a fresh id. Real player ids come from the host runtime;
    /// this is for tests and tooling.
    pub fn random() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player handle: identity plus the display name at the time of the
/// interaction. Names can change; the id is authoritative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// A player with a fresh random id, for tests and tooling.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(PlayerId::random(), name)
    }

    /// The principal form of this player.
    pub fn principal(&self) -> Principal {
        Principal::Player {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Name of a group in some external claim system (town, faction, guild, ...).
///
/// Group names are matched case-insensitively, following how players write
/// them on signs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, other: &GroupId) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Any identity usable in an ACL entry or as a lock owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    /// A specific player, identified by id. The name is display-only.
    Player { id: PlayerId, name: String },
    /// Every member of a group, resolved through the claim adapters.
    Group(GroupId),
    /// Only the leaders of a group.
    GroupLeader(GroupId),
    /// Literally anyone.
    Everyone,
}

impl Principal {
    pub fn player(id: PlayerId, name: impl Into<String>) -> Self {
        Self::Player {
            id,
            name: name.into(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::Group(GroupId::new(name))
    }

    pub fn group_leader(name: impl Into<String>) -> Self {
        Self::GroupLeader(GroupId::new(name))
    }

    /// Returns `true` if this principal is the given player.
    pub fn is_player(&self, player: PlayerId) -> bool {
        matches!(self, Principal::Player { id, .. } if *id == player)
    }

    /// Stable deduplication key: two ACL entries for the same identity
    /// collapse to one (last write wins). Players key on id, groups on
    /// their lowercased name.
    pub fn key(&self) -> String {
        match self {
            Principal::Player { id, .. } => format!("player:{id}"),
            Principal::Group(g) => format!("group:{}", g.name().to_ascii_lowercase()),
            Principal::GroupLeader(g) => {
                format!("leader:{}", g.name().to_ascii_lowercase())
            }
            Principal::Everyone => "everyone".to_string(),
        }
    }

    /// The sign-text form of this principal.
    pub fn display_text(&self) -> String {
        match self {
            Principal::Player { name, .. } => name.clone(),
            Principal::Group(g) => format!("[{}]", g.name()),
            Principal::GroupLeader(g) => format!("+{}+", g.name()),
            Principal::Everyone => "[Everyone]".to_string(),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_text())
    }
}
