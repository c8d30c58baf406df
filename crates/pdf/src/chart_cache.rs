use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use serde::Serialize;
use tracing::debug;

pub const DEFAULT_CHART_CACHE_SIZE: usize = 100;
const FINGERPRINT_PREFIX_BYTES: usize = 1024;

/// Hex md5 over the chart key and the first KiB of its payload. A cheap
/// fingerprint, not a security boundary.
pub fn cache_key(chart_key: &str, data: &[u8]) -> String {
    let mut context = md5::Context::new();
    context.consume(chart_key.as_bytes());
    context.consume(&data[..data.len().min(FINGERPRINT_PREFIX_BYTES)]);
    format!("{:x}", context.compute())
}

#[derive(Debug)]
struct CacheEntry {
    bytes: Vec<u8>,
    access_count: u64,
    inserted: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: usize,
    pub max_size: usize,
    pub memory_bytes: usize,
}

/// Bounded cache of prepared chart images. When full, the entry with the
/// fewest accesses is evicted; ties go to the oldest insertion.
#[derive(Debug)]
pub struct ChartCache {
    entries: HashMap<String, CacheEntry>,
    max_size: usize,
    hits: u64,
    misses: u64,
    insertions: u64,
}

impl Default for ChartCache {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_CACHE_SIZE)
    }
}

impl ChartCache {
    pub fn new(max_size: usize) -> Self {
        Self { entries: HashMap::new(), max_size, hits: 0, misses: 0, insertions: 0 }
    }

    pub fn get(&mut self, chart_key: &str, data: &[u8]) -> Option<Vec<u8>> {
        let key = cache_key(chart_key, data);
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.access_count += 1;
                self.hits += 1;
                Some(entry.bytes.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, chart_key: &str, data: &[u8], prepared: Vec<u8>) {
        if self.max_size == 0 {
            return;
        }
        let key = cache_key(chart_key, data);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.bytes = prepared;
            return;
        }

        while self.entries.len() >= self.max_size {
            let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (entry.access_count, entry.inserted))
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            self.entries.remove(&victim);
            debug!(event_name = "pdf.chart_cache.evicted", key = %victim, "evicted chart cache entry");
        }

        self.insertions += 1;
        self.entries.insert(
            key,
            CacheEntry { bytes: prepared, access_count: 0, inserted: self.insertions },
        );
    }

    pub fn contains(&self, chart_key: &str, data: &[u8]) -> bool {
        self.entries.contains_key(&cache_key(chart_key, data))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> ChartCacheStats {
        let lookups = self.hits + self.misses;
        ChartCacheStats {
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups == 0 { 0.0 } else { self.hits as f64 / lookups as f64 },
            entries: self.entries.len(),
            max_size: self.max_size,
            memory_bytes: self.entries.iter().map(|(key, entry)| key.len() + entry.bytes.len()).sum(),
        }
    }
}

static SHARED_CHART_CACHE: OnceLock<Mutex<ChartCache>> = OnceLock::new();

/// Process-wide cache. The size passed on the first call wins.
pub fn shared_chart_cache(max_size: usize) -> &'static Mutex<ChartCache> {
    SHARED_CHART_CACHE.get_or_init(|| Mutex::new(ChartCache::new(max_size)))
}
