use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use ward_acl::{parse_entry, parse_sign, NameResolver, ParseWarning, SignHeader};
use ward_claims::ClaimDirectory;
use ward_registry::LockRegistry;
use ward_store::{ProtectionStore, StoreError};
use ward_types::{AreaBounds, BlockPos, Lock, LockType, Player, PlayerId, Principal};

use crate::config::WardenConfig;
use crate::error::{WardError, WardResult};
use crate::evaluator::AccessEvaluator;

/// Stripe count for per-location mutexes. Power of two so the hash can be
/// masked instead of divided.
const STRIPES: usize = 64;

/// Outcome of attaching or reparsing: the resulting lock plus warnings for
/// every sign line that was dropped.
#[derive(Clone, Debug)]
pub struct SignOutcome {
    pub lock: Lock,
    pub warnings: Vec<ParseWarning>,
}

/// Outcome of an expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Locks examined inside the bounds.
    pub examined: usize,
    /// Locks destroyed because their expiry had passed.
    pub expired: usize,
}

/// Runs every state transition a lock can go through.
///
/// All transitions follow the same shape: take the stripe mutexes for every
/// involved position (in ascending stripe order, so concurrent multi-block
/// operations cannot deadlock), re-read fresh state from the store, apply
/// the change with a versioned compare-and-swap write, and invalidate the
/// registry before returning. The store CAS is the real arbiter; the
/// stripes only keep transitions from doing wasted work against stale
/// reads.
pub struct LifecycleManager {
    store: Arc<dyn ProtectionStore>,
    registry: Arc<LockRegistry>,
    evaluator: Arc<AccessEvaluator>,
    claims: Arc<ClaimDirectory>,
    resolver: Arc<dyn NameResolver + Send + Sync>,
    config: Arc<WardenConfig>,
    stripes: Vec<Mutex<()>>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn ProtectionStore>,
        registry: Arc<LockRegistry>,
        evaluator: Arc<AccessEvaluator>,
        claims: Arc<ClaimDirectory>,
        resolver: Arc<dyn NameResolver + Send + Sync>,
        config: Arc<WardenConfig>,
    ) -> Self {
        Self {
            store,
            registry,
            evaluator,
            claims,
            resolver,
            config,
            stripes: (0..STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn stripe_of(&self, pos: &BlockPos) -> usize {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        pos.hash(&mut hasher);
        (hasher.finish() as usize) & (STRIPES - 1)
    }

    /// Lock the stripes covering the given positions, ascending order.
    fn guard(&self, positions: &[&BlockPos]) -> Vec<MutexGuard<'_, ()>> {
        let mut indices: Vec<usize> = positions.iter().map(|p| self.stripe_of(p)).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
            .into_iter()
            .map(|i| self.stripes[i].lock().expect("lock poisoned"))
            .collect()
    }

    fn may_administer(&self, actor: PlayerId, lock: &Lock) -> bool {
        if self.config.is_override(actor) || lock.is_owner(actor) {
            return true;
        }
        // A lock owned by a group is administered by that group's leaders.
        match &lock.owner {
            Principal::Group(group) | Principal::GroupLeader(group) => {
                self.claims.is_leader_of(actor, group)
            }
            _ => false,
        }
    }

    fn expiry_from_retention(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.config
            .retention_days
            .map(|days| now + Duration::days(i64::from(days)))
    }

    /// Create a lock at an unprotected position.
    ///
    /// `extra_lines` are the sign body lines below the header; unparseable
    /// ones are dropped into the outcome's warnings. A concurrent attach at
    /// the same position has exactly one winner; the loser gets
    /// [`WardError::AlreadyLocked`].
    pub fn attach(
        &self,
        actor: &Player,
        pos: BlockPos,
        kind: &str,
        lock_type: LockType,
        extra_lines: &[String],
    ) -> WardResult<SignOutcome> {
        if !self.config.is_lockable(kind) {
            return Err(WardError::NotLockable {
                pos,
                kind: kind.to_string(),
            });
        }
        if let Some(reason) = self.evaluator.may_place_lock(actor.id, &pos).reason() {
            return Err(WardError::PlacementDenied {
                reason: reason.to_string(),
            });
        }

        let _guard = self.guard(&[&pos]);
        if let Some(existing) = self.store.get(&pos)? {
            return Err(WardError::AlreadyLocked {
                pos,
                by: existing.id,
            });
        }

        let mut lock = Lock::new(actor.principal(), lock_type, pos.clone());
        lock.expires_at = self.expiry_from_retention(lock.created_at);
        let mut warnings = Vec::new();
        for (line_no, line) in extra_lines.iter().enumerate() {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            match parse_entry(text, self.resolver.as_ref()) {
                Ok(entry) => lock.grant(entry.principal, entry.level),
                Err(reason) => warnings.push(ParseWarning {
                    line: line_no + 1,
                    text: text.to_string(),
                    reason,
                }),
            }
        }

        let stored = match self.store.put(&lock, 0) {
            Ok(stored) => stored,
            // Raced with another attach that won between our read and the
            // CAS; report who holds the position now.
            Err(StoreError::LocationOccupied { pos, by }) => {
                return Err(WardError::AlreadyLocked { pos, by });
            }
            Err(other) => return Err(other.into()),
        };
        self.registry.invalidate(&pos);
        info!(lock = %stored.id, %pos, owner = %stored.owner, "attached lock");
        Ok(SignOutcome {
            lock: stored,
            warnings,
        })
    }

    /// Recompute a lock's type and ACL from edited sign text.
    ///
    /// A main header replaces the type and the whole ACL; a `[More Users]`
    /// header merges its entries into the existing ACL. Only the owner, a
    /// leader of an owning group, or an override may edit.
    pub fn reparse(
        &self,
        actor: PlayerId,
        pos: &BlockPos,
        lines: &[String],
    ) -> WardResult<SignOutcome> {
        let parsed = parse_sign(lines, self.resolver.as_ref())?;

        let _guard = self.guard(&[pos]);
        let mut lock = self.require_lock(pos)?;
        if !self.may_administer(actor, &lock) {
            return Err(WardError::NotAuthorized {
                actor,
                operation: "edit",
            });
        }

        match parsed.header {
            SignHeader::Main(lock_type) => {
                lock.lock_type = lock_type;
                lock.acl.clear();
            }
            SignHeader::MoreUsers => {}
        }
        for entry in parsed.entries {
            lock.grant(entry.principal, entry.level);
        }

        let expected = lock.version;
        let stored = self.store.put(&lock, expected)?;
        self.registry.invalidate_lock(&stored);
        debug!(lock = %stored.id, entries = stored.acl.len(), "reparsed lock from sign");
        Ok(SignOutcome {
            lock: stored,
            warnings: parsed.warnings,
        })
    }

    /// Grow a lock onto an adjacent position (the second half of a double
    /// chest, the upper half of a door). The target must be unlocked, a
    /// lockable kind, and a face neighbor of the existing position.
    pub fn expand(&self, pos: &BlockPos, adjacent: BlockPos, kind: &str) -> WardResult<Lock> {
        if !self.config.is_lockable(kind) {
            return Err(WardError::NotLockable {
                pos: adjacent,
                kind: kind.to_string(),
            });
        }
        if !pos.is_adjacent(&adjacent) {
            return Err(WardError::IncompatibleExpansion {
                pos: adjacent,
                reason: "not adjacent to the locked block".to_string(),
            });
        }

        let _guard = self.guard(&[pos, &adjacent]);
        let mut lock = self.require_lock(pos)?;
        if let Some(existing) = self.store.get(&adjacent)? {
            return Err(WardError::AlreadyLocked {
                pos: adjacent,
                by: existing.id,
            });
        }

        lock.add_location(adjacent.clone());
        let expected = lock.version;
        let stored = match self.store.put(&lock, expected) {
            Ok(stored) => stored,
            Err(StoreError::LocationOccupied { pos, by }) => {
                return Err(WardError::AlreadyLocked { pos, by });
            }
            Err(other) => return Err(other.into()),
        };
        self.registry.invalidate_lock(&stored);
        debug!(lock = %stored.id, to = %adjacent, "expanded lock");
        Ok(stored)
    }

    /// A covered block was removed from the world. The remainder of the
    /// lock keeps protecting its other positions; removing the last
    /// position destroys the lock. Returns the surviving lock, if any.
    pub fn shrink(&self, pos: &BlockPos) -> WardResult<Option<Lock>> {
        let _guard = self.guard(&[pos]);
        let Some(mut lock) = self.store.get(pos)? else {
            return Ok(None); // unprotected block broke; nothing to do
        };

        let expected = lock.version;
        if lock.remove_location(pos) {
            self.store.delete(lock.id, expected)?;
            self.registry.invalidate(pos);
            info!(lock = %lock.id, %pos, "last covered block removed; lock destroyed");
            return Ok(None);
        }
        let stored = self.store.put(&lock, expected)?;
        self.registry.invalidate(pos);
        self.registry.invalidate_lock(&stored);
        Ok(Some(stored))
    }

    /// A covered block was physically moved. The lock follows it.
    pub fn relocate(&self, from: &BlockPos, to: BlockPos) -> WardResult<Lock> {
        let _guard = self.guard(&[from, &to]);
        let mut lock = self.require_lock(from)?;
        if let Some(existing) = self.store.get(&to)? {
            return Err(WardError::AlreadyLocked {
                pos: to,
                by: existing.id,
            });
        }

        lock.remove_location(from);
        lock.add_location(to);
        let expected = lock.version;
        let stored = self.store.put(&lock, expected)?;
        self.registry.invalidate(from);
        self.registry.invalidate_lock(&stored);
        Ok(stored)
    }

    /// Hand the lock to a new owner. Owner, owning-group leader, or
    /// override only.
    pub fn transfer(
        &self,
        actor: PlayerId,
        pos: &BlockPos,
        new_owner: Principal,
    ) -> WardResult<Lock> {
        let _guard = self.guard(&[pos]);
        let mut lock = self.require_lock(pos)?;
        if !self.may_administer(actor, &lock) {
            return Err(WardError::NotAuthorized {
                actor,
                operation: "transfer",
            });
        }

        info!(lock = %lock.id, from = %lock.owner, to = %new_owner, "transferring lock");
        lock.owner = new_owner;
        let expected = lock.version;
        let stored = self.store.put(&lock, expected)?;
        self.registry.invalidate_lock(&stored);
        Ok(stored)
    }

    /// Destroy a lock. Terminal: the positions become attachable again
    /// immediately. Owner, owning-group leader, or override only.
    pub fn detach(&self, actor: PlayerId, pos: &BlockPos) -> WardResult<()> {
        let _guard = self.guard(&[pos]);
        let lock = self.require_lock(pos)?;
        if !self.may_administer(actor, &lock) {
            return Err(WardError::NotAuthorized {
                actor,
                operation: "detach",
            });
        }

        self.store.delete(lock.id, lock.version)?;
        self.registry.invalidate_lock(&lock);
        info!(lock = %lock.id, %pos, "detached lock");
        Ok(())
    }

    /// Destroy every lock inside the bounds whose expiry has passed.
    ///
    /// Locks that change under the sweep (a version conflict on delete) are
    /// skipped; the next sweep sees their fresh state.
    pub fn sweep_expired(&self, now: DateTime<Utc>, bounds: &AreaBounds) -> WardResult<SweepReport> {
        let mut report = SweepReport::default();
        for candidate in self.store.scan(bounds)? {
            report.examined += 1;
            if !candidate.is_expired(now) {
                continue;
            }

            let positions: Vec<&BlockPos> = candidate.locations.iter().collect();
            let _guard = self.guard(&positions);
            // Fresh read: the owner may have renewed since the scan.
            let Some(current) = self.store.get_by_id(candidate.id)? else {
                continue;
            };
            if !current.is_expired(now) {
                continue;
            }
            match self.store.delete(current.id, current.version) {
                Ok(()) => {
                    self.registry.invalidate_lock(&current);
                    info!(lock = %current.id, owner = %current.owner, "expired lock swept");
                    report.expired += 1;
                }
                Err(StoreError::VersionConflict { id, .. }) => {
                    warn!(lock = %id, "lock changed during sweep; skipping");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Ok(report)
    }

    fn require_lock(&self, pos: &BlockPos) -> WardResult<Lock> {
        self.store
            .get(pos)?
            .ok_or_else(|| WardError::NoLock { pos: pos.clone() })
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("stripes", &STRIPES)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use ward_acl::NoResolver;
    use ward_claims::{AdapterConfig, Plot, TownAdapter, TownBuildPolicy};
    use ward_registry::RegistryConfig;
    use ward_store::MemoryProtectionStore;

    use super::*;

    fn pos(x: i32) -> BlockPos {
        BlockPos::new("world", x, 64, 0)
    }

    fn manager() -> Arc<LifecycleManager> {
        manager_with(ClaimDirectory::new(), WardenConfig::default())
    }

    fn manager_with(claims: ClaimDirectory, config: WardenConfig) -> Arc<LifecycleManager> {
        let store: Arc<dyn ProtectionStore> = Arc::new(MemoryProtectionStore::new());
        let registry = Arc::new(LockRegistry::new(RegistryConfig::default()));
        let claims = Arc::new(claims);
        let config = Arc::new(config);
        let evaluator = Arc::new(AccessEvaluator::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&claims),
            Arc::clone(&config),
        ));
        Arc::new(LifecycleManager::new(
            store,
            registry,
            evaluator,
            claims,
            Arc::new(NoResolver),
            config,
        ))
    }

    fn attach(manager: &LifecycleManager, owner: &Player, at: BlockPos) -> Lock {
        manager
            .attach(owner, at, "chest", LockType::Private, &[])
            .unwrap()
            .lock
    }

    // -----------------------------------------------------------------------
    // Attach
    // -----------------------------------------------------------------------

    #[test]
    fn attach_creates_a_private_lock_owned_by_the_actor() {
        let manager = manager();
        let alice = Player::named("alice");
        let lock = attach(&manager, &alice, pos(0));

        assert!(lock.is_owner(alice.id));
        assert_eq!(lock.version, 1);
        assert!(lock.contains(&pos(0)));
    }

    #[test]
    fn attach_refuses_unlockable_kinds() {
        let manager = manager();
        let err = manager
            .attach(&Player::named("alice"), pos(0), "dirt", LockType::Private, &[])
            .unwrap_err();
        assert!(matches!(err, WardError::NotLockable { .. }));
    }

    #[test]
    fn attach_parses_extra_lines_dropping_bad_ones() {
        let manager = manager();
        let lines = vec!["[Miners]:view".to_string(), "ghost".to_string()];
        let outcome = manager
            .attach(&Player::named("alice"), pos(0), "chest", LockType::Private, &lines)
            .unwrap();
        assert_eq!(outcome.lock.acl.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].reason.contains("ghost"));
    }

    #[test]
    fn attach_on_a_locked_position_reports_the_holder() {
        let manager = manager();
        let first = attach(&manager, &Player::named("alice"), pos(0));
        let err = manager
            .attach(&Player::named("bob"), pos(0), "chest", LockType::Private, &[])
            .unwrap_err();
        match err {
            WardError::AlreadyLocked { by, .. } => assert_eq!(by, first.id),
            other => panic!("expected AlreadyLocked, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_attach_has_exactly_one_winner() {
        let manager = manager();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    let actor = Player::named(format!("p{i}"));
                    manager.attach(&actor, pos(0), "chest", LockType::Private, &[])
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(outcomes
            .iter()
            .filter(|o| o.is_err())
            .all(|o| matches!(o.as_ref().unwrap_err(), WardError::AlreadyLocked { .. })));
    }

    #[test]
    fn retention_sets_an_expiry() {
        let mut config = WardenConfig::default();
        config.retention_days = Some(90);
        let manager = manager_with(ClaimDirectory::new(), config);

        let lock = attach(&manager, &Player::named("alice"), pos(0));
        let expires = lock.expires_at.unwrap();
        assert_eq!(expires, lock.created_at + Duration::days(90));
    }

    #[test]
    fn members_only_town_blocks_stranger_locks_and_creates_nothing() {
        let towns = TownAdapter::new();
        let mayor = PlayerId::random();
        towns.found_town("Hometown", mayor, TownBuildPolicy::ResidentsOnly);
        towns.claim_plot(
            "Hometown",
            Plot {
                world: "world".into(),
                min: [0, 0],
                max: [15, 15],
            },
        );
        let mut claims = ClaimDirectory::new();
        claims.register(Arc::new(towns), AdapterConfig::default());
        let manager = manager_with(claims, WardenConfig::default());

        let err = manager
            .attach(&Player::named("stranger"), pos(5), "chest", LockType::Private, &[])
            .unwrap_err();
        assert!(matches!(err, WardError::PlacementDenied { .. }));
        // No partial state: the position is still attachable by a resident.
        manager
            .attach(&Player::new(mayor, "mayor"), pos(5), "chest", LockType::Private, &[])
            .unwrap();
    }

    // -----------------------------------------------------------------------
    // Reparse
    // -----------------------------------------------------------------------

    #[test]
    fn reparse_replaces_type_and_acl_from_a_main_sign() {
        let manager = manager();
        let alice = Player::named("alice");
        attach(&manager, &alice, pos(0));

        let lines = vec!["[Public]".to_string(), "[Miners]:manage".to_string()];
        let outcome = manager.reparse(alice.id, &pos(0), &lines).unwrap();
        assert_eq!(outcome.lock.lock_type, LockType::Public);
        assert_eq!(outcome.lock.acl.len(), 1);
    }

    #[test]
    fn more_users_sign_merges_without_touching_the_type() {
        let manager = manager();
        let alice = Player::named("alice");
        let lines = vec!["[Miners]:view".to_string()];
        manager
            .attach(&alice, pos(0), "chest", LockType::Private, &lines)
            .unwrap();

        let more = vec!["[More Users]".to_string(), "[Smiths]".to_string()];
        let outcome = manager.reparse(alice.id, &pos(0), &more).unwrap();
        assert_eq!(outcome.lock.lock_type, LockType::Private);
        assert_eq!(outcome.lock.acl.len(), 2);
    }

    #[test]
    fn only_the_owner_or_override_may_reparse() {
        let manager = manager();
        attach(&manager, &Player::named("alice"), pos(0));

        let lines = vec!["[Public]".to_string()];
        let err = manager
            .reparse(PlayerId::random(), &pos(0), &lines)
            .unwrap_err();
        assert!(matches!(err, WardError::NotAuthorized { .. }));
    }

    // -----------------------------------------------------------------------
    // Expand / shrink (double chests, doors)
    // -----------------------------------------------------------------------

    #[test]
    fn double_chest_expand_then_shrink_then_destroy() {
        let manager = manager();
        let alice = Player::named("alice");
        let lock = attach(&manager, &alice, pos(0));

        let expanded = manager.expand(&pos(0), pos(1), "chest").unwrap();
        assert_eq!(expanded.id, lock.id);
        assert_eq!(expanded.locations.len(), 2);

        // Breaking one half keeps the other protected.
        let survivor = manager.shrink(&pos(1)).unwrap().unwrap();
        assert!(survivor.contains(&pos(0)));
        assert!(!survivor.contains(&pos(1)));

        // Breaking the last half destroys the lock; the spot is free again.
        assert!(manager.shrink(&pos(0)).unwrap().is_none());
        attach(&manager, &Player::named("bob"), pos(0));
    }

    #[test]
    fn expand_requires_adjacency_and_a_free_target() {
        let manager = manager();
        let alice = Player::named("alice");
        attach(&manager, &alice, pos(0));

        let err = manager.expand(&pos(0), pos(5), "chest").unwrap_err();
        assert!(matches!(err, WardError::IncompatibleExpansion { .. }));

        attach(&manager, &Player::named("bob"), pos(1));
        let err = manager.expand(&pos(0), pos(1), "chest").unwrap_err();
        assert!(matches!(err, WardError::AlreadyLocked { .. }));
    }

    #[test]
    fn shrink_of_an_unprotected_block_is_a_noop() {
        let manager = manager();
        assert!(manager.shrink(&pos(0)).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Relocate / transfer / detach
    // -----------------------------------------------------------------------

    #[test]
    fn relocate_moves_the_protection_with_the_block() {
        let manager = manager();
        let alice = Player::named("alice");
        let lock = attach(&manager, &alice, pos(0));

        let moved = manager.relocate(&pos(0), pos(7)).unwrap();
        assert_eq!(moved.id, lock.id);
        assert!(moved.contains(&pos(7)));
        assert!(!moved.contains(&pos(0)));
        // The vacated spot is attachable again.
        attach(&manager, &Player::named("bob"), pos(0));
    }

    #[test]
    fn transfer_changes_the_owner() {
        let manager = manager();
        let alice = Player::named("alice");
        let bob = Player::named("bob");
        attach(&manager, &alice, pos(0));

        let transferred = manager
            .transfer(alice.id, &pos(0), bob.principal())
            .unwrap();
        assert!(transferred.is_owner(bob.id));
        assert!(!transferred.is_owner(alice.id));

        // Alice lost her administration rights with the transfer.
        let err = manager.detach(alice.id, &pos(0)).unwrap_err();
        assert!(matches!(err, WardError::NotAuthorized { .. }));
    }

    #[test]
    fn detach_destroys_and_frees_the_position() {
        let manager = manager();
        let alice = Player::named("alice");
        attach(&manager, &alice, pos(0));

        manager.detach(alice.id, &pos(0)).unwrap();
        let err = manager.detach(alice.id, &pos(0)).unwrap_err();
        assert!(matches!(err, WardError::NoLock { .. }));
        attach(&manager, &Player::named("bob"), pos(0));
    }

    #[test]
    fn override_may_detach_anything() {
        let operator = PlayerId::random();
        let mut config = WardenConfig::default();
        config.overrides.insert(operator);
        let manager = manager_with(ClaimDirectory::new(), config);

        attach(&manager, &Player::named("alice"), pos(0));
        manager.detach(operator, &pos(0)).unwrap();
    }

    // -----------------------------------------------------------------------
    // Expiry sweep
    // -----------------------------------------------------------------------

    #[test]
    fn sweep_destroys_only_expired_locks() {
        let manager = manager();
        let alice = Player::named("alice");
        attach(&manager, &alice, pos(0));
        attach(&manager, &alice, pos(1));

        // Expire the lock at pos(1) by hand.
        let now = Utc::now();
        let mut expired = manager.store.get(&pos(1)).unwrap().unwrap();
        expired.expires_at = Some(now - Duration::days(1));
        let version = expired.version;
        manager.store.put(&expired, version).unwrap();

        let report = manager
            .sweep_expired(now, &AreaBounds::everywhere())
            .unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.expired, 1);
        assert!(manager.store.get(&pos(1)).unwrap().is_none());
        assert!(manager.store.get(&pos(0)).unwrap().is_some());
    }
}
