use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;
use ward_store::{ProtectionStore, StoreResult};
use ward_types::{BlockPos, ChunkPos, Lock};

/// Tuning knobs for the registry.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// How long a cached lock stays valid without invalidation.
    pub positive_ttl: Duration,
    /// How long a cached "no lock here" stays valid. Shorter than
    /// `positive_ttl`: absence can become presence out from under us.
    pub negative_ttl: Duration,
    /// Maximum number of distinct chunks held before the least-recently
    /// accessed chunk is evicted.
    pub max_chunks: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            positive_ttl: Duration::from_secs(300),
            negative_ttl: Duration::from_secs(10),
            max_chunks: 4096,
        }
    }
}

/// The result of a cache-only probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The answer is cached: `Some` lock or a fresh "no lock here".
    Hit(Option<Lock>),
    /// Not cached (or expired); answering needs a store read.
    Miss,
}

struct Slot {
    lock: Option<Lock>,
    cached_at: Instant,
}

struct ChunkEntries {
    slots: HashMap<BlockPos, Slot>,
    /// Last access tick. Atomic so read-path hits can bump recency while
    /// holding only the read lock.
    touched_at: AtomicU64,
}

/// Cache of lock records keyed by position, grouped by chunk.
pub struct LockRegistry {
    config: RegistryConfig,
    chunks: RwLock<HashMap<ChunkPos, ChunkEntries>>,
    clock: AtomicU64,
}

impl LockRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            chunks: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn is_fresh(&self, slot: &Slot) -> bool {
        let ttl = if slot.lock.is_some() {
            self.config.positive_ttl
        } else {
            self.config.negative_ttl
        };
        slot.cached_at.elapsed() < ttl
    }

    /// Cache-only probe. Never touches the store and takes only the read
    /// lock, so interaction-path reads stay cheap and uncontended. A fresh
    /// hit counts as a chunk access for eviction ordering.
    pub fn peek(&self, pos: &BlockPos) -> Lookup {
        let chunks = self.chunks.read().expect("lock poisoned");
        let Some(chunk) = chunks.get(&pos.chunk()) else {
            return Lookup::Miss;
        };
        match chunk.slots.get(pos) {
            Some(slot) if self.is_fresh(slot) => {
                chunk.touched_at.store(self.tick(), Ordering::Relaxed);
                Lookup::Hit(slot.lock.clone())
            }
            _ => Lookup::Miss,
        }
    }

    /// The lock at `pos`, from cache if fresh, otherwise via one
    /// synchronous store lookup whose result is memoized, including the
    /// negative answer.
    pub fn get_or_load(
        &self,
        pos: &BlockPos,
        store: &dyn ProtectionStore,
    ) -> StoreResult<Option<Lock>> {
        if let Lookup::Hit(cached) = self.peek(pos) {
            return Ok(cached);
        }
        let loaded = store.get(pos)?;
        self.insert(pos.clone(), loaded.clone());
        Ok(loaded)
    }

    /// Memoize an answer for a position, evicting the least-recently
    /// accessed chunk if the chunk count overflows.
    fn insert(&self, pos: BlockPos, lock: Option<Lock>) {
        let chunk_pos = pos.chunk();
        let now = Instant::now();
        let mut chunks = self.chunks.write().expect("lock poisoned");

        let chunk = chunks.entry(chunk_pos.clone()).or_insert_with(|| ChunkEntries {
            slots: HashMap::new(),
            touched_at: AtomicU64::new(0),
        });
        chunk.touched_at.store(self.tick(), Ordering::Relaxed);
        chunk.slots.insert(
            pos,
            Slot {
                lock,
                cached_at: now,
            },
        );

        while chunks.len() > self.config.max_chunks {
            let coldest = chunks
                .iter()
                .filter(|(pos, _)| **pos != chunk_pos)
                .min_by_key(|(_, chunk)| chunk.touched_at.load(Ordering::Relaxed))
                .map(|(pos, _)| pos.clone());
            match coldest {
                Some(pos) => {
                    debug!(chunk = %pos, "evicting least-recently-accessed chunk");
                    chunks.remove(&pos);
                }
                None => break,
            }
        }
    }

    /// Drop the cached answer for one position. Called synchronously by
    /// every lifecycle transition before it returns.
    pub fn invalidate(&self, pos: &BlockPos) {
        let mut chunks = self.chunks.write().expect("lock poisoned");
        if let Some(chunk) = chunks.get_mut(&pos.chunk()) {
            chunk.slots.remove(pos);
        }
    }

    /// Drop the cached answers for every position of a lock.
    pub fn invalidate_lock(&self, lock: &Lock) {
        for pos in &lock.locations {
            self.invalidate(pos);
        }
    }

    /// Drop a whole chunk, e.g. on a world chunk-unload notification.
    pub fn evict_chunk(&self, chunk: &ChunkPos) {
        let mut chunks = self.chunks.write().expect("lock poisoned");
        chunks.remove(chunk);
    }

    /// Number of cached positions (fresh or expired).
    pub fn len(&self) -> usize {
        let chunks = self.chunks.read().expect("lock poisoned");
        chunks.values().map(|chunk| chunk.slots.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shutdown hook. The registry is write-through and holds no dirty
    /// state, so this only empties the cache.
    pub fn flush(&self) {
        let mut chunks = self.chunks.write().expect("lock poisoned");
        chunks.clear();
    }
}

impl std::fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chunks = self.chunks.read().expect("lock poisoned");
        f.debug_struct("LockRegistry")
            .field("chunks", &chunks.len())
            .field("positions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use ward_store::MemoryProtectionStore;
    use ward_types::{LockType, PlayerId, Principal};

    use super::*;

    fn pos(x: i32) -> BlockPos {
        BlockPos::new("world", x, 64, 0)
    }

    fn store_with_lock(x: i32) -> (MemoryProtectionStore, Lock) {
        let store = MemoryProtectionStore::new();
        let lock = Lock::new(
            Principal::player(PlayerId::random(), "alice"),
            LockType::Private,
            pos(x),
        );
        let stored = store.put(&lock, 0).unwrap();
        (store, stored)
    }

    fn quick_config() -> RegistryConfig {
        RegistryConfig {
            positive_ttl: Duration::from_secs(60),
            negative_ttl: Duration::from_millis(20),
            max_chunks: 4,
        }
    }

    // -----------------------------------------------------------------------
    // Hit / miss / memoization
    // -----------------------------------------------------------------------

    #[test]
    fn cold_peek_is_a_miss_then_load_warms_it() {
        let (store, stored) = store_with_lock(0);
        let registry = LockRegistry::new(quick_config());

        assert_eq!(registry.peek(&pos(0)), Lookup::Miss);
        assert_eq!(registry.get_or_load(&pos(0), &store).unwrap(), Some(stored.clone()));
        assert_eq!(registry.peek(&pos(0)), Lookup::Hit(Some(stored)));
    }

    #[test]
    fn absence_is_memoized_too() {
        let store = MemoryProtectionStore::new();
        let registry = LockRegistry::new(quick_config());

        assert_eq!(registry.get_or_load(&pos(0), &store).unwrap(), None);
        assert_eq!(registry.peek(&pos(0)), Lookup::Hit(None));
    }

    #[test]
    fn negative_entries_expire_faster() {
        let store = MemoryProtectionStore::new();
        let registry = LockRegistry::new(quick_config());

        registry.get_or_load(&pos(0), &store).unwrap();
        assert_eq!(registry.peek(&pos(0)), Lookup::Hit(None));

        thread::sleep(Duration::from_millis(30));
        // Negative TTL elapsed: back to a miss, so presence can be seen.
        assert_eq!(registry.peek(&pos(0)), Lookup::Miss);
    }

    #[test]
    fn warm_reads_do_not_touch_the_store() {
        let (store, stored) = store_with_lock(0);
        let registry = LockRegistry::new(quick_config());
        registry.get_or_load(&pos(0), &store).unwrap();

        // Mutate the store behind the registry's back; the cached answer
        // stays until invalidation (the lifecycle manager's job).
        store.delete(stored.id, stored.version).unwrap();
        assert_eq!(registry.get_or_load(&pos(0), &store).unwrap(), Some(stored));
    }

    // -----------------------------------------------------------------------
    // Invalidation
    // -----------------------------------------------------------------------

    #[test]
    fn invalidate_forces_a_fresh_read() {
        let (store, stored) = store_with_lock(0);
        let registry = LockRegistry::new(quick_config());
        registry.get_or_load(&pos(0), &store).unwrap();

        store.delete(stored.id, stored.version).unwrap();
        registry.invalidate(&pos(0));
        assert_eq!(registry.peek(&pos(0)), Lookup::Miss);
        assert_eq!(registry.get_or_load(&pos(0), &store).unwrap(), None);
    }

    #[test]
    fn invalidate_lock_covers_every_location() {
        let store = MemoryProtectionStore::new();
        let mut lock = Lock::new(
            Principal::player(PlayerId::random(), "alice"),
            LockType::Private,
            pos(0),
        );
        lock.add_location(pos(1));
        let stored = store.put(&lock, 0).unwrap();

        let registry = LockRegistry::new(quick_config());
        registry.get_or_load(&pos(0), &store).unwrap();
        registry.get_or_load(&pos(1), &store).unwrap();
        assert_eq!(registry.len(), 2);

        registry.invalidate_lock(&stored);
        assert_eq!(registry.len(), 0);
    }

    // -----------------------------------------------------------------------
    // Chunk eviction
    // -----------------------------------------------------------------------

    #[test]
    fn chunk_unload_evicts_the_column() {
        let store = MemoryProtectionStore::new();
        let registry = LockRegistry::new(quick_config());
        registry.get_or_load(&pos(0), &store).unwrap();
        registry.get_or_load(&pos(1), &store).unwrap(); // same chunk

        registry.evict_chunk(&pos(0).chunk());
        assert!(registry.is_empty());
    }

    #[test]
    fn capacity_evicts_the_coldest_chunk() {
        let store = MemoryProtectionStore::new();
        let registry = LockRegistry::new(quick_config()); // max 4 chunks

        // Five distinct chunks: x = 0, 16, 32, 48, 64.
        for i in 0..5 {
            registry.get_or_load(&pos(i * 16), &store).unwrap();
        }
        // The first chunk was the coldest and must be gone.
        assert_eq!(registry.peek(&pos(0)), Lookup::Miss);
        // The newest survives.
        assert_eq!(registry.peek(&pos(64)), Lookup::Hit(None));
    }

    #[test]
    fn recent_hits_keep_a_chunk_resident() {
        let store = MemoryProtectionStore::new();
        let registry = LockRegistry::new(RegistryConfig {
            max_chunks: 4,
            ..RegistryConfig::default()
        });

        // Four chunks, the one at x = 0 loaded first.
        for i in 0..4 {
            registry.get_or_load(&pos(i * 16), &store).unwrap();
        }
        // Re-reading the oldest chunk makes it the hottest.
        for _ in 0..100 {
            assert_eq!(registry.peek(&pos(0)), Lookup::Hit(None));
        }

        // Overflow evicts the least recently accessed chunk, not the
        // least recently inserted one.
        registry.get_or_load(&pos(64), &store).unwrap();
        assert_eq!(registry.peek(&pos(0)), Lookup::Hit(None));
        assert_eq!(registry.peek(&pos(16)), Lookup::Miss);
    }

    #[test]
    fn flush_empties_the_cache() {
        let store = MemoryProtectionStore::new();
        let registry = LockRegistry::new(quick_config());
        registry.get_or_load(&pos(0), &store).unwrap();
        registry.flush();
        assert!(registry.is_empty());
    }
}
