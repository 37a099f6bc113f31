//! In-memory, TTL- and capacity-bounded cache keyed by content fingerprint
//! (spec.md §3 "Lifecycles", §4.5 "Memory bound"). Unlike the teacher's
//! disk-backed `SolFilesCache`, nothing here is persisted across process
//! lifetimes (spec.md §1 non-goals) — entries live only as long as the
//! process and expire on their own.

use crate::fingerprint::Fingerprint;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A bounded, TTL-expiring map from [`Fingerprint`] to `V`. `V` is cheap to
/// clone in this crate's two instantiations (`Arc<CompilationResult>`,
/// signature-only views), so [`FingerprintCache::get_fresh`] returns an
/// owned copy rather than a guard, keeping the lock (held by callers, not
/// by this type) as short as possible.
pub struct FingerprintCache<V> {
    entries: HashMap<Fingerprint, Entry<V>>,
    ttl: Duration,
    capacity: usize,
    /// Fraction of `capacity` evicted, oldest-first, once the cache is
    /// full (spec.md §4.5 "evicted oldest-first"; batching amortizes the
    /// cost of eviction across many insertions instead of evicting one
    /// entry per insert at the capacity boundary).
    eviction_fraction: f64,
}

impl<V: Clone> FingerprintCache<V> {
    pub fn new(ttl: Duration, capacity: usize, eviction_fraction: f64) -> Self {
        Self { entries: HashMap::new(), ttl, capacity, eviction_fraction }
    }

    /// Returns the cached value for `fingerprint` if present and not yet
    /// expired. An expired entry is treated as absent but left in place —
    /// removal happens on the next `insert`'s eviction pass or on an
    /// explicit `clear`, not eagerly on read.
    pub fn get_fresh(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.entries
            .get(fingerprint)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.value.clone())
    }

    /// Returns the cached value regardless of freshness, for callers that
    /// want to serve a stale result while a refresh is in flight.
    pub fn get_any(&self, fingerprint: &Fingerprint) -> Option<V> {
        self.entries.get(fingerprint).map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, fingerprint: Fingerprint, value: V) {
        self.entries.insert(fingerprint, Entry { value, inserted_at: Instant::now() });
        if self.entries.len() > self.capacity {
            self.evict_oldest();
        }
    }

    pub fn remove(&mut self, fingerprint: &Fingerprint) {
        self.entries.remove(fingerprint);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &Entry<V>) -> bool {
        entry.inserted_at.elapsed() >= self.ttl
    }

    /// Evicts the oldest `eviction_fraction` of `capacity` entries
    /// (rounded up to at least one), sorted by insertion time.
    fn evict_oldest(&mut self) {
        let evict_count = ((self.capacity as f64 * self.eviction_fraction).ceil() as usize).max(1);
        let mut by_age: Vec<(Fingerprint, Instant)> =
            self.entries.iter().map(|(fp, entry)| (*fp, entry.inserted_at)).collect();
        by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
        for (fingerprint, _) in by_age.into_iter().take(evict_count) {
            self.entries.remove(&fingerprint);
        }
    }
}
