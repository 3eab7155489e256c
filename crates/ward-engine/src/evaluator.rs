use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;
use ward_claims::ClaimDirectory;
use ward_registry::{LockRegistry, Lookup};
use ward_store::ProtectionStore;
use ward_types::{Action, BlockPos, Decision, Lock, PlayerId, Principal};

use crate::config::WardenConfig;

/// Answers "may this actor do this action at this position".
///
/// The evaluator is read-only: it consults the registry (and through it the
/// store), the claim directory, and the operator override list, and always
/// returns a definitive [`Decision`]. A storage failure during evaluation
/// denies; protection must fail closed.
pub struct AccessEvaluator {
    store: Arc<dyn ProtectionStore>,
    registry: Arc<LockRegistry>,
    claims: Arc<ClaimDirectory>,
    config: Arc<WardenConfig>,
}

impl AccessEvaluator {
    pub fn new(
        store: Arc<dyn ProtectionStore>,
        registry: Arc<LockRegistry>,
        claims: Arc<ClaimDirectory>,
        config: Arc<WardenConfig>,
    ) -> Self {
        Self {
            store,
            registry,
            claims,
            config,
        }
    }

    /// Full access check. May perform one store lookup on a registry miss.
    pub fn decide(&self, actor: PlayerId, pos: &BlockPos, action: Action) -> Decision {
        if self.config.is_override(actor) {
            return Decision::Allow;
        }
        let lock = match self.registry.get_or_load(pos, self.store.as_ref()) {
            Ok(lock) => lock,
            Err(err) => {
                warn!(%pos, %err, "store lookup failed during access check; denying");
                return Decision::deny("protection data unavailable");
            }
        };
        self.decide_with(actor, pos, action, lock.as_ref())
    }

    /// Cache-only access check for latency-critical paths. A registry miss
    /// denies with a retry hint instead of blocking on store I/O.
    pub fn decide_fast(&self, actor: PlayerId, pos: &BlockPos, action: Action) -> Decision {
        if self.config.is_override(actor) {
            return Decision::Allow;
        }
        match self.registry.peek(pos) {
            Lookup::Hit(lock) => self.decide_with(actor, pos, action, lock.as_ref()),
            Lookup::Miss => Decision::deny("protection data not cached; retry"),
        }
    }

    fn decide_with(
        &self,
        actor: PlayerId,
        pos: &BlockPos,
        action: Action,
        lock: Option<&Lock>,
    ) -> Decision {
        let Some(lock) = lock else {
            // Unprotected block: the claim systems get the only say, and
            // with none of them claiming it the block is unrestricted.
            return self
                .claims
                .permits(actor, pos, action)
                .into_decision()
                .unwrap_or(Decision::Allow);
        };

        if lock.is_owner(actor) {
            return Decision::Allow;
        }

        // Group membership is only worth a directory round-trip when the
        // ACL actually names a group.
        let groups: BTreeSet<_> = if lock
            .acl
            .iter()
            .any(|entry| matches!(entry.principal, Principal::Group(_)))
        {
            self.claims.groups_of(actor)
        } else {
            BTreeSet::new()
        };

        let granted = lock.level_for(|principal| match principal {
            Principal::Player { id, .. } => *id == actor,
            Principal::Everyone => true,
            Principal::Group(group) => groups.iter().any(|mine| mine.matches(group)),
            Principal::GroupLeader(group) => self.claims.is_leader_of(actor, group),
        });
        if granted >= action.required_level() {
            return Decision::Allow;
        }

        if lock.lock_type.default_allows(action) {
            return Decision::Allow;
        }

        // Local ACL said nothing definitive; the claim systems get a last
        // word before the default deny.
        self.claims
            .permits(actor, pos, action)
            .into_decision()
            .unwrap_or_else(|| Decision::deny("no applicable permission"))
    }

    /// Whether the actor may place a new lock at this position. Wilderness
    /// is free for all; inside a claim the owning adapter's tenant-lock
    /// policy decides.
    pub fn may_place_lock(&self, actor: PlayerId, pos: &BlockPos) -> Decision {
        if self.config.is_override(actor) {
            return Decision::Allow;
        }
        self.claims
            .permits_lock_placement(actor, pos)
            .into_decision()
            .unwrap_or(Decision::Allow)
    }
}

impl std::fmt::Debug for AccessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEvaluator")
            .field("claims", &self.claims)
            .finish()
    }
}
