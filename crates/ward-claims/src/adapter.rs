use std::collections::BTreeSet;
use std::time::Duration;

use ward_types::{Action, BlockPos, GroupId, PlayerId, Principal, Verdict};

/// One external land-claim system behind a uniform capability interface.
///
/// Implementations translate these queries into the underlying system's own
/// calls and abstain whenever that system has no opinion about the location
/// or actor. Claim state is never persisted by Blockward — ownership can
/// change out-of-band, so answers are re-queried (the directory keeps only a
/// short-TTL owner cache).
///
/// The trait is object-safe and `Send + Sync` so adapters can run behind
/// the directory's per-call timeout.
pub trait ClaimAdapter: Send + Sync {
    /// Short machine name of this adapter ("towns", "factions", ...).
    fn name(&self) -> &str;

    /// The entity that claims this location, if any.
    fn owner_of(&self, pos: &BlockPos) -> Option<Principal>;

    /// Whether the actor may perform the action here. Abstain when the
    /// location is outside this system's claims.
    fn permits(&self, actor: PlayerId, pos: &BlockPos, action: Action) -> Verdict;

    /// Every group of this system the actor belongs to.
    fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId>;

    /// Whether the actor leads (mayor, faction leader, ...) the group.
    /// Membership-only systems keep the default.
    fn is_leader_of(&self, _actor: PlayerId, _group: &GroupId) -> bool {
        false
    }

    /// Whether the actor may build at this location. Placing a lock is a
    /// build action; by default it requires the same permission as Manage.
    fn permits_build(&self, actor: PlayerId, pos: &BlockPos) -> Verdict {
        self.permits(actor, pos, Action::Manage)
    }
}

/// Per-registration settings for one adapter in the directory.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Consultation order: lower values are asked first.
    pub priority: i32,
    /// Per-call budget. A call exceeding it counts as an abstain.
    pub timeout: Duration,
    /// Whether actors who merely hold build permission inside a claim
    /// (tenants, residents) may place locks there. When `false`, only the
    /// claim's owning player or the leaders of its owning group may.
    pub allow_tenant_locks: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            priority: 0,
            timeout: Duration::from_millis(50),
            allow_tenant_locks: true,
        }
    }
}

impl AdapterConfig {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }
}
