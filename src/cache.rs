//! Feature value cache
//!
//! Window feature values are pure functions of `(feature, flow, window, size)`,
//! so they can be memoized. Composite features re-read their inputs (bursts read
//! directions and sizes, totals read signed sizes), and the cache makes those
//! shared reads cheap.
//!
//! Entries are grouped per `(window name, window size)` and the number of groups
//! is bounded; the least recently used group is evicted first. Eviction only
//! costs recomputation.

use crate::base::window::WindowContext;
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Default number of distinct (window, size) pairs kept
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    name: String,
    window_size: usize,
}

#[derive(Debug)]
struct WindowEntry {
    /// Hash of flow id and packet contents, to catch reused window names
    fingerprint: u64,
    /// Tick of last access, for LRU eviction
    last_tick: u64,
    /// Values keyed by feature id
    values: HashMap<String, Vec<f64>>,
}

#[derive(Debug, Default)]
struct CacheState {
    windows: HashMap<WindowKey, WindowEntry>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Counters describing cache effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub windows: usize,
    pub capacity: usize,
}

/// Bounded, thread-safe memoization of window feature values.
#[derive(Debug)]
pub struct FeatureCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for FeatureCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl FeatureCache {
    /// Create a cache holding at most `capacity` (window, size) pairs
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached vector for `feature` on this window, computing it on a miss.
    ///
    /// The lock is not held while computing, so composite features may read
    /// other features through the same cache.
    pub fn get_or_compute<F>(
        &self,
        feature: &str,
        ctx: &WindowContext<'_>,
        compute: F,
    ) -> Result<Vec<f64>, FeatureError>
    where
        F: FnOnce() -> Result<Vec<f64>, FeatureError>,
    {
        let key = WindowKey {
            name: ctx.window().name().to_string(),
            window_size: ctx.window_size(),
        };
        let fingerprint = context_fingerprint(ctx);

        {
            let mut guard = self.lock();
            let state = &mut *guard;
            state.tick += 1;
            let tick = state.tick;

            if let Some(entry) = state.windows.get_mut(&key) {
                if entry.fingerprint != fingerprint {
                    return Err(identity_conflict(&key));
                }
                entry.last_tick = tick;
                if let Some(values) = entry.values.get(feature) {
                    state.hits += 1;
                    return Ok(values.clone());
                }
            }
            state.misses += 1;
        }

        let values = compute()?;

        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.windows.contains_key(&key) && state.windows.len() >= self.capacity {
            evict_oldest(state);
        }
        let tick = state.tick;
        let entry = state
            .windows
            .entry(key.clone())
            .or_insert_with(|| WindowEntry {
                fingerprint,
                last_tick: tick,
                values: HashMap::new(),
            });
        if entry.fingerprint != fingerprint {
            return Err(identity_conflict(&key));
        }
        entry.values.insert(feature.to_string(), values.clone());

        Ok(values)
    }

    /// Number of (window, size) pairs currently held
    pub fn len(&self) -> usize {
        self.lock().windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().windows.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            windows: state.windows.len(),
            capacity: self.capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic mid-insert leaves at worst a missing entry
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn context_fingerprint(ctx: &WindowContext<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    ctx.fid().hash(&mut hasher);
    ctx.window().fingerprint().hash(&mut hasher);
    hasher.finish()
}

fn evict_oldest(state: &mut CacheState) {
    if let Some(oldest) = state
        .windows
        .iter()
        .min_by_key(|(_, entry)| entry.last_tick)
        .map(|(key, _)| key.clone())
    {
        debug!(window = %oldest.name, window_size = oldest.window_size, "evicting cached window");
        state.windows.remove(&oldest);
        state.evictions += 1;
    }
}

fn identity_conflict(key: &WindowKey) -> FeatureError {
    warn!(window = %key.name, "window name reused for different contents");
    FeatureError::WindowIdentityConflict {
        window: key.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FlowId, Packet, PacketWindow, Protocol};
    use std::cell::Cell;
    use std::net::{IpAddr, Ipv4Addr};

    fn flow() -> FlowId {
        FlowId::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
            1,
            2,
            Protocol::Udp,
        )
    }

    fn window(name: &str, ts: f64) -> PacketWindow {
        PacketWindow::new(name, vec![Packet::non_ip(ts)])
    }

    #[test]
    fn test_hit_skips_compute() {
        let cache = FeatureCache::new(4);
        let fid = flow();
        let w = window("a", 0.0);
        let ctx = WindowContext::new(&fid, &w, 3).unwrap();
        let calls = Cell::new(0);

        for _ in 0..3 {
            let values = cache
                .get_or_compute("Size", &ctx, || {
                    calls.set(calls.get() + 1);
                    Ok(vec![1.0, 2.0, 3.0])
                })
                .unwrap();
            assert_eq!(values, vec![1.0, 2.0, 3.0]);
        }

        assert_eq!(calls.get(), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_window_size_is_part_of_key() {
        let cache = FeatureCache::new(4);
        let fid = flow();
        let w = window("a", 0.0);
        let small = WindowContext::new(&fid, &w, 2).unwrap();
        let large = WindowContext::new(&fid, &w, 4).unwrap();

        cache.get_or_compute("Size", &small, || Ok(vec![0.0; 2])).unwrap();
        let values = cache.get_or_compute("Size", &large, || Ok(vec![0.0; 4])).unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction_bounds_windows() {
        let cache = FeatureCache::new(2);
        let fid = flow();
        let a = window("a", 0.0);
        let b = window("b", 0.0);
        let c = window("c", 0.0);
        let ctx_a = WindowContext::new(&fid, &a, 1).unwrap();
        let ctx_b = WindowContext::new(&fid, &b, 1).unwrap();
        let ctx_c = WindowContext::new(&fid, &c, 1).unwrap();

        cache.get_or_compute("f", &ctx_a, || Ok(vec![1.0])).unwrap();
        cache.get_or_compute("f", &ctx_b, || Ok(vec![2.0])).unwrap();
        // Touch a so b becomes the oldest
        cache.get_or_compute("f", &ctx_a, || Ok(vec![1.0])).unwrap();
        cache.get_or_compute("f", &ctx_c, || Ok(vec![3.0])).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);

        let recomputed = Cell::new(false);
        cache
            .get_or_compute("f", &ctx_b, || {
                recomputed.set(true);
                Ok(vec![2.0])
            })
            .unwrap();
        assert!(recomputed.get());
    }

    #[test]
    fn test_reused_window_name_is_an_error() {
        let cache = FeatureCache::new(4);
        let fid = flow();
        let first = window("dup", 0.0);
        let second = window("dup", 9.0);
        let ctx1 = WindowContext::new(&fid, &first, 1).unwrap();
        let ctx2 = WindowContext::new(&fid, &second, 1).unwrap();

        cache.get_or_compute("f", &ctx1, || Ok(vec![0.0])).unwrap();
        let err = cache.get_or_compute("f", &ctx2, || Ok(vec![0.0])).unwrap_err();
        assert!(matches!(err, FeatureError::WindowIdentityConflict { .. }));
    }

    #[test]
    fn test_compute_errors_are_not_cached() {
        let cache = FeatureCache::new(4);
        let fid = flow();
        let w = window("a", 0.0);
        let ctx = WindowContext::new(&fid, &w, 1).unwrap();

        let err = cache
            .get_or_compute("f", &ctx, || Err(FeatureError::UnknownFeature("f".into())))
            .unwrap_err();
        assert!(matches!(err, FeatureError::UnknownFeature(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = std::sync::Arc::new(FeatureCache::new(16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    let fid = flow();
                    let w = window(&format!("w{t}"), t as f64);
                    let ctx = WindowContext::new(&fid, &w, 1).unwrap();
                    cache.get_or_compute("f", &ctx, || Ok(vec![t as f64])).unwrap()
                })
            })
            .collect();
        for (t, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), vec![t as f64]);
        }
        assert_eq!(cache.len(), 4);
    }
}
