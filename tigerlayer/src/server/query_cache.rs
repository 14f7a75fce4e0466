//! Viewport query cache with TTL expiry and LRU eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS};
use crate::spatial::Viewport;

/// Decimal places kept when quantizing a viewport.
const KEY_SCALE: f64 = 1000.0;

/// A viewport quantized to three decimal places.
///
/// Viewports that differ only beyond the third decimal share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportKey([i64; 4]);

impl ViewportKey {
    pub fn new(viewport: &Viewport) -> Self {
        let q = |v: f64| (v * KEY_SCALE).round() as i64;
        Self([
            q(viewport.west),
            q(viewport.south),
            q(viewport.east),
            q(viewport.north),
        ])
    }
}

impl From<&Viewport> for ViewportKey {
    fn from(viewport: &Viewport) -> Self {
        Self::new(viewport)
    }
}

#[derive(Debug)]
struct CacheEntry {
    tiles: Arc<Vec<String>>,
    inserted_at: Instant,
    last_accessed: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Memoizes viewport → artifact filename lists.
///
/// Entries expire `ttl` after insertion. When the cache is full the least
/// recently read entry is evicted. All mutation happens under one lock.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<HashMap<ViewportKey, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl QueryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Cached tiles for a key, or `None` when absent or expired.
    pub fn get(&self, key: &ViewportKey) -> Option<Arc<Vec<String>>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                entry.last_accessed = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.tiles));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a result, evicting the least recently used entry when full.
    pub fn put(&self, key: ViewportKey, tiles: Vec<String>) -> Arc<Vec<String>> {
        let now = Instant::now();
        let tiles = Arc::new(tiles);
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            self.purge_expired(&mut entries, now);
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_accessed)
                    .map(|(k, _)| *k);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                tiles: Arc::clone(&tiles),
                inserted_at: now,
                last_accessed: now,
            },
        );
        tiles
    }

    fn purge_expired(&self, entries: &mut HashMap<ViewportKey, CacheEntry>, now: Instant) {
        entries.retain(|_, entry| now.duration_since(entry.inserted_at) < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> QueryCacheStats {
        QueryCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            DEFAULT_CACHE_MAX_ENTRIES,
        )
    }
}
