//! Time-bounded product metadata cache keyed by product id and locale.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use storescout_core::MetadataCacheEntry;

pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub ttl_secs: u64,
}

/// Entries live for a fixed TTL from insertion and are never updated in
/// place; there is no per-key invalidation. Expired entries are dropped when
/// read and swept from the whole map on every insert.
pub struct MetadataCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, MetadataCacheEntry)>>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_TTL)
    }
}

impl MetadataCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(product_id: &str, locale: &str) -> String {
        format!("{product_id}{locale}")
    }

    #[must_use]
    pub fn get(&self, product_id: &str, locale: &str) -> Option<MetadataCacheEntry> {
        let key = Self::key(product_id, locale);
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                Some((inserted, entry)) if inserted.elapsed() < self.ttl => {
                    tracing::debug!(product_id, locale, "metadata cache hit");
                    return Some(entry.clone());
                }
                Some(_) => {}
                None => {
                    tracing::debug!(product_id, locale, "metadata cache miss");
                    return None;
                }
            }
        }

        tracing::debug!(product_id, locale, "metadata cache entry expired");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        None
    }

    /// Stores `entry` unless a live entry already exists for the key.
    pub fn set(&self, product_id: &str, locale: &str, entry: MetadataCacheEntry) {
        let key = Self::key(product_id, locale);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        let before = entries.len();
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, "swept expired metadata cache entries");
        }

        entries.entry(key).or_insert_with(|| (Instant::now(), entry));
    }

    /// Number of unexpired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(inserted, _)| inserted.elapsed() < self.ttl)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observability approximation: `entries / (products_processed + 1)`.
    ///
    /// This is not a historical hit ratio; it relates the current cache size
    /// to the number of products handled by one request.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // counts are far below 2^52
    pub fn hit_rate(&self, products_processed: usize) -> f64 {
        self.len() as f64 / (products_processed as f64 + 1.0)
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            ttl_secs: self.ttl.as_secs(),
        }
    }
}
