use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use ward_acl::{NameResolver, NoResolver};
use ward_claims::ClaimDirectory;
use ward_registry::LockRegistry;
use ward_store::{MemoryProtectionStore, ProtectionStore};
use ward_types::{
    Action, AreaBounds, BlockPos, Decision, Lock, LockType, Player, PlayerId, Principal,
};

use crate::config::WardenConfig;
use crate::error::{WardError, WardResult};
use crate::evaluator::AccessEvaluator;
use crate::events::WorldEvent;
use crate::lifecycle::{LifecycleManager, SignOutcome, SweepReport};

/// The assembled protection engine: store, registry, claim directory,
/// evaluator, and lifecycle manager wired together behind one API.
pub struct Warden {
    store: Arc<dyn ProtectionStore>,
    registry: Arc<LockRegistry>,
    evaluator: Arc<AccessEvaluator>,
    lifecycle: LifecycleManager,
    config: Arc<WardenConfig>,
}

impl Warden {
    pub fn new(
        store: Arc<dyn ProtectionStore>,
        claims: ClaimDirectory,
        resolver: Arc<dyn NameResolver + Send + Sync>,
        config: WardenConfig,
    ) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(LockRegistry::new(config.registry.clone()));
        let claims = Arc::new(claims);
        let evaluator = Arc::new(AccessEvaluator::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&claims),
            Arc::clone(&config),
        ));
        let lifecycle = LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&evaluator),
            claims,
            resolver,
            Arc::clone(&config),
        );
        Self {
            store,
            registry,
            evaluator,
            lifecycle,
            config,
        }
    }

    /// A warden over an in-memory store with no claim systems and no name
    /// resolution. For tests and tooling.
    pub fn in_memory(config: WardenConfig) -> Self {
        Self::new(
            Arc::new(MemoryProtectionStore::new()),
            ClaimDirectory::new(),
            Arc::new(NoResolver),
            config,
        )
    }

    // ---- Access checks ----

    pub fn decide(&self, actor: PlayerId, pos: &BlockPos, action: Action) -> Decision {
        self.evaluator.decide(actor, pos, action)
    }

    pub fn decide_fast(&self, actor: PlayerId, pos: &BlockPos, action: Action) -> Decision {
        self.evaluator.decide_fast(actor, pos, action)
    }

    pub fn may_place_lock(&self, actor: PlayerId, pos: &BlockPos) -> Decision {
        self.evaluator.may_place_lock(actor, pos)
    }

    // ---- Lifecycle ----

    pub fn attach(
        &self,
        actor: &Player,
        pos: BlockPos,
        kind: &str,
        lock_type: LockType,
        extra_lines: &[String],
    ) -> WardResult<SignOutcome> {
        self.lifecycle.attach(actor, pos, kind, lock_type, extra_lines)
    }

    pub fn reparse(
        &self,
        actor: PlayerId,
        pos: &BlockPos,
        lines: &[String],
    ) -> WardResult<SignOutcome> {
        self.lifecycle.reparse(actor, pos, lines)
    }

    pub fn expand(&self, pos: &BlockPos, adjacent: BlockPos, kind: &str) -> WardResult<Lock> {
        self.lifecycle.expand(pos, adjacent, kind)
    }

    pub fn shrink(&self, pos: &BlockPos) -> WardResult<Option<Lock>> {
        self.lifecycle.shrink(pos)
    }

    pub fn relocate(&self, from: &BlockPos, to: BlockPos) -> WardResult<Lock> {
        self.lifecycle.relocate(from, to)
    }

    pub fn transfer(
        &self,
        actor: PlayerId,
        pos: &BlockPos,
        new_owner: Principal,
    ) -> WardResult<Lock> {
        self.lifecycle.transfer(actor, pos, new_owner)
    }

    pub fn detach(&self, actor: PlayerId, pos: &BlockPos) -> WardResult<()> {
        self.lifecycle.detach(actor, pos)
    }

    pub fn sweep_expired(&self, now: DateTime<Utc>, bounds: &AreaBounds) -> WardResult<SweepReport> {
        self.lifecycle.sweep_expired(now, bounds)
    }

    /// All locks intersecting the bounds, straight from the store.
    pub fn scan(&self, bounds: &AreaBounds) -> WardResult<ward_store::Scan> {
        self.store.scan(bounds).map_err(WardError::from)
    }

    /// The lock at a position, through the registry.
    pub fn lock_at(&self, pos: &BlockPos) -> WardResult<Option<Lock>> {
        self.registry
            .get_or_load(pos, self.store.as_ref())
            .map_err(WardError::from)
    }

    /// Release cached state. The registry is write-through, so there is
    /// nothing to persist here.
    pub fn shutdown(&self) {
        self.registry.flush();
    }

    // ---- Event boundary ----

    /// Route a world event to the matching lifecycle operation.
    pub fn handle_event(&self, event: WorldEvent) -> WardResult<()> {
        debug!(?event, "world event");
        match event {
            WorldEvent::BlockPlaced { pos, kind, .. } => {
                if !self.config.is_lockable(&kind) {
                    return Ok(());
                }
                // The host only reports placements that physically connect
                // to the neighbor (chest halves, door halves), so a locked
                // face neighbor means this block joins its protection.
                for neighbor in face_neighbors(&pos) {
                    if self.lock_at(&neighbor)?.is_some() {
                        self.lifecycle.expand(&neighbor, pos, &kind)?;
                        return Ok(());
                    }
                }
                Ok(())
            }
            WorldEvent::BlockBroken { pos } => self.lifecycle.shrink(&pos).map(|_| ()),
            WorldEvent::BlockMoved { from, to } => {
                match self.lifecycle.relocate(&from, to) {
                    Ok(_) => Ok(()),
                    // Unprotected blocks move freely.
                    Err(WardError::NoLock { .. }) => Ok(()),
                    Err(other) => Err(other),
                }
            }
            WorldEvent::SignChanged {
                actor,
                pos,
                kind,
                lines,
            } => {
                if self.lock_at(&pos)?.is_some() {
                    let outcome = self.lifecycle.reparse(actor.id, &pos, &lines)?;
                    log_dropped_entries(&pos, &outcome);
                    return Ok(());
                }
                // A fresh main sign on an unprotected block creates a lock.
                let parsed = ward_acl::parse_sign(&lines, &NoResolver)?;
                match parsed.header.lock_type() {
                    Some(lock_type) => {
                        let body = lines.get(1..).unwrap_or_default().to_vec();
                        let outcome =
                            self.lifecycle
                                .attach(&actor, pos.clone(), &kind, lock_type, &body)?;
                        log_dropped_entries(&pos, &outcome);
                        Ok(())
                    }
                    None => Err(WardError::NoLock { pos }),
                }
            }
            WorldEvent::ChunkUnloaded { chunk } => {
                self.registry.evict_chunk(&chunk);
                Ok(())
            }
        }
    }
}

/// The event boundary returns no sign outcome to the host, so entries the
/// parser dropped are surfaced in the log instead of lost.
fn log_dropped_entries(pos: &BlockPos, outcome: &SignOutcome) {
    for warning in &outcome.warnings {
        warn!(
            %pos,
            line = warning.line,
            entry = %warning.text,
            reason = %warning.reason,
            "dropped unparseable sign entry"
        );
    }
}

fn face_neighbors(pos: &BlockPos) -> [BlockPos; 6] {
    [
        pos.offset(1, 0, 0),
        pos.offset(-1, 0, 0),
        pos.offset(0, 0, 1),
        pos.offset(0, 0, -1),
        pos.offset(0, 1, 0),
        pos.offset(0, -1, 0),
    ]
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use ward_registry::Lookup;

    use super::*;

    fn pos(x: i32) -> BlockPos {
        BlockPos::new("world", x, 64, 0)
    }

    fn sign(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Event routing
    // -----------------------------------------------------------------------

    #[test]
    fn main_sign_on_a_bare_chest_creates_a_lock() {
        let warden = Warden::in_memory(WardenConfig::default());
        let alice = Player::named("alice");

        warden
            .handle_event(WorldEvent::SignChanged {
                actor: alice.clone(),
                pos: pos(0),
                kind: "chest".into(),
                lines: sign(&["[Private]", "[Miners]"]),
            })
            .unwrap();

        let lock = warden.lock_at(&pos(0)).unwrap().unwrap();
        assert!(lock.is_owner(alice.id));
        assert_eq!(lock.acl.len(), 1);
    }

    #[test]
    fn bad_entries_are_dropped_without_failing_the_sign_event() {
        let warden = Warden::in_memory(WardenConfig::default());
        let alice = Player::named("alice");
        let bob = Player::named("bob");

        warden
            .handle_event(WorldEvent::SignChanged {
                actor: alice.clone(),
                pos: pos(0),
                kind: "chest".into(),
                lines: vec![
                    "[Private]".to_string(),
                    format!("{}#{}", bob.name, bob.id),
                    "carol:pilot".to_string(),
                ],
            })
            .unwrap();

        // The unresolvable line drops with a warning; the rest of the sign
        // holds.
        let lock = warden.lock_at(&pos(0)).unwrap().unwrap();
        assert!(lock.is_owner(alice.id));
        assert_eq!(lock.acl.len(), 1);
        assert!(warden.decide(bob.id, &pos(0), Action::Use).is_allow());
    }

    #[test]
    fn sign_edit_on_a_locked_block_reparses() {
        let warden = Warden::in_memory(WardenConfig::default());
        let alice = Player::named("alice");
        warden
            .attach(&alice, pos(0), "chest", LockType::Private, &[])
            .unwrap();

        warden
            .handle_event(WorldEvent::SignChanged {
                actor: alice.clone(),
                pos: pos(0),
                kind: "chest".into(),
                lines: sign(&["[Public]"]),
            })
            .unwrap();
        let lock = warden.lock_at(&pos(0)).unwrap().unwrap();
        assert_eq!(lock.lock_type, LockType::Public);
    }

    #[test]
    fn more_users_sign_without_a_lock_is_an_error() {
        let warden = Warden::in_memory(WardenConfig::default());
        let err = warden
            .handle_event(WorldEvent::SignChanged {
                actor: Player::named("alice"),
                pos: pos(0),
                kind: "chest".into(),
                lines: sign(&["[More Users]", "bob"]),
            })
            .unwrap_err();
        assert!(matches!(err, WardError::NoLock { .. }));
    }

    #[test]
    fn placing_a_connecting_chest_extends_the_lock() {
        let warden = Warden::in_memory(WardenConfig::default());
        let alice = Player::named("alice");
        warden
            .attach(&alice, pos(0), "chest", LockType::Private, &[])
            .unwrap();

        warden
            .handle_event(WorldEvent::BlockPlaced {
                actor: Player::named("bob"),
                pos: pos(1),
                kind: "chest".into(),
            })
            .unwrap();
        let lock = warden.lock_at(&pos(1)).unwrap().unwrap();
        assert!(lock.is_owner(alice.id));
        assert_eq!(lock.locations.len(), 2);
    }

    #[test]
    fn placing_an_unlockable_block_changes_nothing() {
        let warden = Warden::in_memory(WardenConfig::default());
        warden
            .attach(&Player::named("alice"), pos(0), "chest", LockType::Private, &[])
            .unwrap();

        warden
            .handle_event(WorldEvent::BlockPlaced {
                actor: Player::named("bob"),
                pos: pos(1),
                kind: "dirt".into(),
            })
            .unwrap();
        assert!(warden.lock_at(&pos(1)).unwrap().is_none());
    }

    #[test]
    fn breaking_and_moving_route_to_shrink_and_relocate() {
        let warden = Warden::in_memory(WardenConfig::default());
        let alice = Player::named("alice");
        warden
            .attach(&alice, pos(0), "chest", LockType::Private, &[])
            .unwrap();

        warden
            .handle_event(WorldEvent::BlockMoved {
                from: pos(0),
                to: pos(3),
            })
            .unwrap();
        assert!(warden.lock_at(&pos(3)).unwrap().is_some());

        warden
            .handle_event(WorldEvent::BlockBroken { pos: pos(3) })
            .unwrap();
        assert!(warden.lock_at(&pos(3)).unwrap().is_none());

        // Both are no-ops on unprotected positions.
        warden
            .handle_event(WorldEvent::BlockBroken { pos: pos(9) })
            .unwrap();
        warden
            .handle_event(WorldEvent::BlockMoved {
                from: pos(9),
                to: pos(10),
            })
            .unwrap();
    }

    #[test]
    fn chunk_unload_drops_cached_entries() {
        let warden = Warden::in_memory(WardenConfig::default());
        warden
            .attach(&Player::named("alice"), pos(0), "chest", LockType::Private, &[])
            .unwrap();
        warden.lock_at(&pos(0)).unwrap(); // warm the cache

        warden
            .handle_event(WorldEvent::ChunkUnloaded {
                chunk: pos(0).chunk(),
            })
            .unwrap();
        assert_eq!(warden.registry.peek(&pos(0)), Lookup::Miss);
    }

    // -----------------------------------------------------------------------
    // End to end
    // -----------------------------------------------------------------------

    #[test]
    fn full_protection_story() {
        let warden = Warden::in_memory(WardenConfig::default());
        let alice = Player::named("alice");
        let bob = Player::named("bob");
        let carol = Player::named("carol");

        // Alice locks a chest and grants bob use.
        let lines = vec![format!("{}#{}", bob.name, bob.id)];
        warden
            .attach(&alice, pos(0), "chest", LockType::Private, &lines)
            .unwrap();

        assert!(warden.decide(alice.id, &pos(0), Action::Manage).is_allow());
        assert!(warden.decide(bob.id, &pos(0), Action::Use).is_allow());
        assert!(!warden.decide(carol.id, &pos(0), Action::View).is_allow());

        // After detach the block is unrestricted again.
        warden.detach(alice.id, &pos(0)).unwrap();
        assert!(warden.decide(carol.id, &pos(0), Action::Manage).is_allow());
    }
}
