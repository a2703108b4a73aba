//! Bounded FIFO cache of serialized results.
//!
//! Keys are `(TypeId, value hash)`, where the value hash is 128 bits from
//! two independently seeded hashers, so colliding values cannot be crafted
//! ahead of time. When the cache is full the
//! oldest-inserted entry is evicted, regardless of how recently it was
//! read. That keeps every operation O(1) at the cost of hit rate.
//!
//! The cache is best-effort. A poisoned lock is logged and treated as a
//! miss (on read) or skipped (on write); it never fails a serialize call.
//!
//! A write is committed under the lock only if the caller's token is still
//! live, so a cancelled call never leaves an entry behind.

use std::{
    any::TypeId,
    collections::{HashMap, VecDeque, hash_map::RandomState},
    hash::{BuildHasher, Hash},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio_util::sync::CancellationToken;

/// `(type, value hash, second value hash)`.
pub type CacheKey = (TypeId, u64, u64);

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Hits over lookups, or `0.0` before the first lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<[u8]>>,
    /// Insertion order (front = oldest).
    order: VecDeque<CacheKey>,
}

/// Thread-safe FIFO cache of serialized bytes.
pub struct SerializationCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    seeds: (RandomState, RandomState),
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl SerializationCache {
    /// # Panics
    /// Panics if `max_entries` is zero.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        assert!(max_entries > 0, "SerializationCache max_entries must be > 0");
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::with_capacity(max_entries),
                order: VecDeque::with_capacity(max_entries),
            }),
            max_entries,
            seeds: (RandomState::new(), RandomState::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Derive the key for a value. Keys are only meaningful to the cache
    /// that derived them.
    #[must_use]
    pub fn key_for<T: Hash + 'static>(&self, value: &T) -> CacheKey {
        (
            TypeId::of::<T>(),
            self.seeds.0.hash_one(value),
            self.seeds.1.hash_one(value),
        )
    }

    /// Look up cached bytes, counting the hit or miss.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[u8]>> {
        let found = match self.state.lock() {
            Ok(state) => state.entries.get(key).cloned(),
            Err(_) => {
                tracing::warn!("Serialization cache lock poisoned; treating lookup as a miss");
                None
            }
        };
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert, evicting the oldest entry first when full.
    ///
    /// A key that is already present keeps its original bytes and position.
    pub fn insert(&self, key: CacheKey, bytes: Arc<[u8]>) {
        self.insert_unless_cancelled(key, bytes, &CancellationToken::new());
    }

    /// [`insert`](Self::insert), skipped if `cancel` has fired by the time
    /// the lock is held. Returns whether the entry was written.
    pub fn insert_unless_cancelled(
        &self,
        key: CacheKey,
        bytes: Arc<[u8]>,
        cancel: &CancellationToken,
    ) -> bool {
        let Ok(mut state) = self.state.lock() else {
            tracing::warn!("Serialization cache lock poisoned; skipping insert");
            return false;
        };
        if cancel.is_cancelled() || state.entries.contains_key(&key) {
            return false;
        }

        if state.entries.len() >= self.max_entries {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(max_entries = self.max_entries, "Serialization cache evicted oldest entry");
            }
        }

        state.entries.insert(key, bytes);
        state.order.push_back(key);
        true
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state
            .lock()
            .is_ok_and(|state| state.entries.contains_key(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.order.clear();
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl std::fmt::Debug for SerializationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationCache")
            .field("max_entries", &self.max_entries)
            .field("stats", &self.stats())
            .finish()
    }
}
