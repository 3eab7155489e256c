use std::collections::{BTreeSet, HashMap};
use std::sync::mpsc;
use std::sync::RwLock;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use ward_types::{Action, BlockPos, GroupId, PlayerId, Principal, Verdict};

use crate::adapter::{AdapterConfig, ClaimAdapter};
use crate::error::ClaimError;

use std::sync::Arc;

/// Run one adapter call on a worker thread with a deadline.
///
/// A call that overruns its budget or panics is reported as an error; the
/// directory converts both into an abstain. The worker is detached on
/// timeout — the result channel simply goes nowhere.
fn guarded<T, F>(adapter: &str, timeout: Duration, call: F) -> Result<T, ClaimError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(call());
    });
    match rx.recv_timeout(timeout) {
        Ok(value) => Ok(value),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ClaimError::Timeout {
            adapter: adapter.to_string(),
            timeout,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ClaimError::Unavailable {
            adapter: adapter.to_string(),
            reason: "adapter panicked".to_string(),
        }),
    }
}

struct Registered {
    adapter: Arc<dyn ClaimAdapter>,
    config: AdapterConfig,
}

#[derive(Clone)]
struct CachedOwner {
    owner: Option<Principal>,
    fetched_at: Instant,
}

/// All registered claim adapters, consulted in priority order.
///
/// The directory is the only thing the evaluator and lifecycle manager talk
/// to: it fans queries out to adapters, applies per-call timeouts, unions
/// group memberships, and keeps a short-TTL cache of claim owners (claim
/// state can change out-of-band, so the cache must stay short-lived).
pub struct ClaimDirectory {
    adapters: Vec<Registered>,
    owner_cache: RwLock<HashMap<BlockPos, CachedOwner>>,
    owner_ttl: Duration,
}

impl ClaimDirectory {
    /// An empty directory: every query abstains.
    pub fn new() -> Self {
        Self::with_owner_ttl(Duration::from_secs(3))
    }

    /// An empty directory with a custom owner-cache TTL.
    pub fn with_owner_ttl(owner_ttl: Duration) -> Self {
        Self {
            adapters: Vec::new(),
            owner_cache: RwLock::new(HashMap::new()),
            owner_ttl,
        }
    }

    /// Register an adapter. Adapters are kept sorted by priority; between
    /// equal priorities, registration order decides.
    pub fn register(&mut self, adapter: Arc<dyn ClaimAdapter>, config: AdapterConfig) {
        debug!(
            adapter = adapter.name(),
            priority = config.priority,
            "registering claim adapter"
        );
        self.adapters.push(Registered { adapter, config });
        self.adapters.sort_by_key(|reg| reg.config.priority);
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Ask one adapter, converting timeout or panic into an abstain.
    fn ask_verdict<F>(&self, reg: &Registered, call: F) -> Verdict
    where
        F: FnOnce(Arc<dyn ClaimAdapter>) -> Verdict + Send + 'static,
    {
        let adapter = Arc::clone(&reg.adapter);
        match guarded(reg.adapter.name(), reg.config.timeout, move || {
            call(adapter)
        }) {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(%err, "claim adapter query failed; treating as abstain");
                Verdict::Abstain
            }
        }
    }

    /// First definitive verdict on an interaction, in priority order.
    /// All-abstain comes back as `Abstain` — the caller owns the default.
    pub fn permits(&self, actor: PlayerId, pos: &BlockPos, action: Action) -> Verdict {
        for reg in &self.adapters {
            let pos = pos.clone();
            let verdict =
                self.ask_verdict(reg, move |adapter| adapter.permits(actor, &pos, action));
            if !verdict.is_abstain() {
                return verdict;
            }
        }
        Verdict::Abstain
    }

    /// First definitive verdict on placing a lock at `pos`.
    ///
    /// An adapter that claims the location gates placement by its
    /// `allow_tenant_locks` setting: when tenants may lock, build
    /// permission decides; when they may not, only the claim's owning
    /// player or a leader of its owning group passes.
    pub fn permits_lock_placement(&self, actor: PlayerId, pos: &BlockPos) -> Verdict {
        for reg in &self.adapters {
            let probe = pos.clone();
            let claim_owner = {
                let adapter = Arc::clone(&reg.adapter);
                match guarded(reg.adapter.name(), reg.config.timeout, move || {
                    adapter.owner_of(&probe)
                }) {
                    Ok(owner) => owner,
                    Err(err) => {
                        warn!(%err, "claim adapter query failed; treating as abstain");
                        continue;
                    }
                }
            };
            let Some(owner) = claim_owner else {
                continue; // unclaimed by this system
            };

            if reg.config.allow_tenant_locks {
                let pos = pos.clone();
                let verdict =
                    self.ask_verdict(reg, move |adapter| adapter.permits_build(actor, &pos));
                if !verdict.is_abstain() {
                    return verdict;
                }
                continue;
            }

            let is_claim_owner = match &owner {
                Principal::Player { id, .. } => *id == actor,
                Principal::Group(group) | Principal::GroupLeader(group) => {
                    let group = group.clone();
                    let adapter = Arc::clone(&reg.adapter);
                    guarded(reg.adapter.name(), reg.config.timeout, move || {
                        adapter.is_leader_of(actor, &group)
                    })
                    .unwrap_or(false)
                }
                Principal::Everyone => true,
            };
            if is_claim_owner {
                return Verdict::Allow;
            }
            return Verdict::deny(format!(
                "{} does not permit tenant locks in land claimed by {}",
                reg.adapter.name(),
                owner
            ));
        }
        Verdict::Abstain
    }

    /// Union of the actor's groups across every adapter.
    pub fn groups_of(&self, actor: PlayerId) -> BTreeSet<GroupId> {
        let mut all = BTreeSet::new();
        for reg in &self.adapters {
            let adapter = Arc::clone(&reg.adapter);
            match guarded(reg.adapter.name(), reg.config.timeout, move || {
                adapter.groups_of(actor)
            }) {
                Ok(groups) => all.extend(groups),
                Err(err) => warn!(%err, "claim adapter query failed; skipping its groups"),
            }
        }
        all
    }

    /// Whether any adapter reports the actor as a leader of the group.
    pub fn is_leader_of(&self, actor: PlayerId, group: &GroupId) -> bool {
        self.adapters.iter().any(|reg| {
            let group = group.clone();
            let adapter = Arc::clone(&reg.adapter);
            guarded(reg.adapter.name(), reg.config.timeout, move || {
                adapter.is_leader_of(actor, &group)
            })
            .unwrap_or(false)
        })
    }

    /// The claim owner at `pos` from the highest-priority adapter with an
    /// opinion, memoized for the directory's short TTL.
    pub fn owner_of(&self, pos: &BlockPos) -> Option<Principal> {
        {
            let cache = self.owner_cache.read().expect("lock poisoned");
            if let Some(cached) = cache.get(pos) {
                if cached.fetched_at.elapsed() < self.owner_ttl {
                    return cached.owner.clone();
                }
            }
        }

        let mut owner = None;
        for reg in &self.adapters {
            let probe = pos.clone();
            let adapter = Arc::clone(&reg.adapter);
            match guarded(reg.adapter.name(), reg.config.timeout, move || {
                adapter.owner_of(&probe)
            }) {
                Ok(Some(found)) => {
                    owner = Some(found);
                    break;
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "claim adapter query failed; skipping"),
            }
        }

        let mut cache = self.owner_cache.write().expect("lock poisoned");
        cache.insert(
            pos.clone(),
            CachedOwner {
                owner: owner.clone(),
                fetched_at: Instant::now(),
            },
        );
        owner
    }
}

impl Default for ClaimDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClaimDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.adapters.iter().map(|r| r.adapter.name()).collect();
        f.debug_struct("ClaimDirectory")
            .field("adapters", &names)
            .finish()
    }
}
