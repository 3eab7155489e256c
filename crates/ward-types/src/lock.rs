use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;
use crate::permission::{Action, PermissionLevel};
use crate::position::BlockPos;
use crate::principal::{PlayerId, Principal};

/// Stable identifier of a lock, unique for the lock's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockId(pub Uuid);

impl LockId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        let hex = self.0.simple().to_string();
        format!("lock:{}", &hex[..8])
    }
}

impl Default for LockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockId({})", self.short_id())
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

/// Default permission semantics of a lock, independent of its ACL entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// Only the owner and listed principals have access.
    Private,
    /// Anyone may use the block; only listed principals may manage it.
    Public,
    /// Anyone may deposit; single-item withdraw semantics are enforced by
    /// the caller, the evaluator treats this as Use for everyone.
    Donation,
    /// Anyone may look, nobody else may use.
    Display,
}

impl LockType {
    /// The canonical sign header word for this type.
    pub fn header_word(&self) -> &'static str {
        match self {
            LockType::Private => "Private",
            LockType::Public => "Public",
            LockType::Donation => "Donation",
            LockType::Display => "Display",
        }
    }

    /// Parse a header word, case-insensitively.
    pub fn from_header_word(word: &str) -> Result<Self, TypeError> {
        match word.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(LockType::Private),
            "public" => Ok(LockType::Public),
            "donation" => Ok(LockType::Donation),
            "display" => Ok(LockType::Display),
            other => Err(TypeError::InvalidLockType(other.to_string())),
        }
    }

    /// Whether this type grants the given action to actors with no
    /// matching ACL entry. Private grants nothing; Display grants View;
    /// Public and Donation grant up to Use.
    pub fn default_allows(&self, action: Action) -> bool {
        match self {
            LockType::Private => false,
            LockType::Display => action == Action::View,
            LockType::Public | LockType::Donation => {
                action.required_level() <= PermissionLevel::Use
            }
        }
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header_word())
    }
}

/// One ACL entry: a principal and the level it is granted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub principal: Principal,
    pub level: PermissionLevel,
}

impl AclEntry {
    pub fn new(principal: Principal, level: PermissionLevel) -> Self {
        Self { principal, level }
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// The unit of protection: one record covering one or more block positions.
///
/// Locks are only mutated through the lifecycle manager; the `version` field
/// is the optimistic-concurrency token checked by the store on every write.
/// The serialized layout is forward compatible: unknown fields are ignored
/// on load and optional fields default when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    /// Every position covered by this lock. Never empty while the lock
    /// exists; a shrink to empty destroys the lock.
    pub locations: BTreeSet<BlockPos>,
    pub lock_type: LockType,
    /// The creator. Owners implicitly hold full access.
    pub owner: Principal,
    /// Granted principals. Order is irrelevant for evaluation; duplicates
    /// per principal collapse last-write-wins.
    #[serde(default)]
    pub acl: Vec<AclEntry>,
    /// When set, the lock becomes eligible for automatic detachment after
    /// this instant (owner inactivity retention).
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    /// Monotonic mutation counter, bumped by the store on every write.
    #[serde(default)]
    pub version: u64,
}

impl Lock {
    /// A fresh, unwritten lock (version 0) covering a single position.
    pub fn new(owner: Principal, lock_type: LockType, pos: BlockPos) -> Self {
        let mut locations = BTreeSet::new();
        locations.insert(pos);
        Self {
            id: LockId::new(),
            locations,
            lock_type,
            owner,
            acl: Vec::new(),
            expires_at: None,
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn contains(&self, pos: &BlockPos) -> bool {
        self.locations.contains(pos)
    }

    /// Whether the given player is the owner.
    pub fn is_owner(&self, player: PlayerId) -> bool {
        self.owner.is_player(player)
    }

    /// Grant a level to a principal, replacing any existing entry for the
    /// same identity (last write wins).
    pub fn grant(&mut self, principal: Principal, level: PermissionLevel) {
        let key = principal.key();
        self.acl.retain(|entry| entry.principal.key() != key);
        self.acl.push(AclEntry::new(principal, level));
    }

    /// Remove any entry for the given principal. Returns `true` if an
    /// entry was removed.
    pub fn revoke(&mut self, principal: &Principal) -> bool {
        let key = principal.key();
        let before = self.acl.len();
        self.acl.retain(|entry| entry.principal.key() != key);
        self.acl.len() != before
    }

    /// The highest level granted to any principal matching the predicate.
    ///
    /// The predicate is how the caller injects actor identity and group
    /// membership (membership lives in the claim adapters, not here).
    pub fn level_for<F>(&self, mut matches: F) -> PermissionLevel
    where
        F: FnMut(&Principal) -> bool,
    {
        self.acl
            .iter()
            .filter(|entry| matches(&entry.principal))
            .map(|entry| entry.level)
            .max()
            .unwrap_or(PermissionLevel::None)
    }

    /// Add a position to this lock's group. Returns `false` if it was
    /// already covered.
    pub fn add_location(&mut self, pos: BlockPos) -> bool {
        self.locations.insert(pos)
    }

    /// Remove a position. Returns `true` if the lock is now empty and must
    /// be destroyed.
    pub fn remove_location(&mut self, pos: &BlockPos) -> bool {
        self.locations.remove(pos);
        self.locations.is_empty()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}
