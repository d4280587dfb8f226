//! Partitioned in-memory TTL cache.
//!
//! Every partition is a map from key to entry with a partition-level TTL.
//! One mutex guards the whole partition map, the TTL table and the
//! counters. Expired entries are removed lazily on read, or in bulk by
//! [`CacheStore::purge_expired`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::partition::{default_partition_ttls, DEFAULT_TTL, SYMBOL_KEYED_PARTITIONS};
use super::stats::{CacheCounters, CacheInfo, CacheOverview, CacheStats, PartitionInfo};
use crate::clock::{elapsed_between, Clock, SystemClock};
use crate::errors::AdminError;

/// Stored value plus the time it was written.
#[derive(Clone, Debug)]
struct CacheEntry {
    value: Value,
    stored_at: DateTime<Utc>,
    /// Entry-specific TTL. When absent the partition TTL applies.
    ttl_override: Option<Duration>,
}

impl CacheEntry {
    fn is_expired(&self, partition_ttl: Duration, now: DateTime<Utc>) -> bool {
        let ttl = self.ttl_override.unwrap_or(partition_ttl);
        elapsed_between(self.stored_at, now) >= ttl
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    partitions: HashMap<String, HashMap<String, CacheEntry>>,
    ttls: HashMap<String, Duration>,
    counters: CacheCounters,
}

impl CacheInner {
    fn ttl_for(&self, partition: &str, default_ttl: Duration) -> Duration {
        self.ttls.get(partition).copied().unwrap_or(default_ttl)
    }

    fn sizes(&self) -> BTreeMap<String, usize> {
        self.partitions
            .iter()
            .map(|(name, entries)| (name.clone(), entries.len()))
            .collect()
    }
}

/// Thread-safe partitioned key/value cache with per-partition expiry.
pub struct CacheStore {
    inner: Mutex<CacheInner>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Create a cache with the default partition TTLs and the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache with the default partition TTLs and a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(default_partition_ttls(), DEFAULT_TTL, clock)
    }

    /// Create a cache with explicit TTL settings.
    ///
    /// # Arguments
    ///
    /// * `ttls` - Partition name to TTL
    /// * `default_ttl` - TTL for partitions missing from `ttls`
    /// * `clock` - Time source used for `stored_at` and expiry checks
    pub fn with_config(
        ttls: HashMap<String, Duration>,
        default_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                ttls,
                ..Default::default()
            }),
            default_ttl,
            clock,
        }
    }

    /// Lock the cache state, recovering from poison if necessary.
    ///
    /// The worst case after a panic mid-update is a slightly wrong counter
    /// or a stale entry, which `get` still expires correctly.
    fn lock_inner(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up a value.
    ///
    /// Counts a hit for a live entry. An expired entry is removed and counted
    /// as an expiration and a miss. A missing entry is a miss.
    pub fn get(&self, partition: &str, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut inner = self.lock_inner();
        let ttl = inner.ttl_for(partition, self.default_ttl);

        let expired = inner
            .partitions
            .get(partition)
            .and_then(|entries| entries.get(key))
            .map(|entry| entry.is_expired(ttl, now));

        match expired {
            Some(false) => {
                inner.counters.hits += 1;
                debug!("Cache hit: {}/{}", partition, key);
                inner
                    .partitions
                    .get(partition)
                    .and_then(|entries| entries.get(key))
                    .map(|entry| entry.value.clone())
            }
            Some(true) => {
                if let Some(entries) = inner.partitions.get_mut(partition) {
                    entries.remove(key);
                }
                inner.counters.expirations += 1;
                inner.counters.misses += 1;
                debug!("Cache entry expired: {}/{}", partition, key);
                None
            }
            None => {
                inner.counters.misses += 1;
                debug!("Cache miss: {}/{}", partition, key);
                None
            }
        }
    }

    /// Look up a value and decode it.
    ///
    /// A stored value that does not decode as `T` is logged and reported as
    /// absent. The lookup itself is still counted.
    pub fn get_json<T: DeserializeOwned>(&self, partition: &str, key: &str) -> Option<T> {
        let value = self.get(partition, key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(
                    "Cached value {}/{} could not be decoded: {}",
                    partition, key, e
                );
                None
            }
        }
    }

    /// Store a value, creating the partition if needed.
    ///
    /// `ttl_override` applies to this entry only. The partition TTL is
    /// changed exclusively through [`set_ttl`](Self::set_ttl).
    pub fn set(&self, partition: &str, key: &str, value: Value, ttl_override: Option<Duration>) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl_override,
        };

        let mut inner = self.lock_inner();
        inner
            .partitions
            .entry(partition.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        inner.counters.sets += 1;
        debug!("Cache set: {}/{}", partition, key);
    }

    /// Encode and store a value.
    pub fn set_json<T: Serialize>(
        &self,
        partition: &str,
        key: &str,
        value: &T,
        ttl_override: Option<Duration>,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.set(partition, key, value, ttl_override);
        Ok(())
    }

    /// Remove one entry. Returns whether anything was removed.
    pub fn delete(&self, partition: &str, key: &str) -> bool {
        let mut inner = self.lock_inner();
        let removed = inner
            .partitions
            .get_mut(partition)
            .and_then(|entries| entries.remove(key))
            .is_some();

        if removed {
            inner.counters.deletes += 1;
        } else {
            debug!("Cache delete: nothing stored at {}/{}", partition, key);
        }
        removed
    }

    /// Remove every entry of one partition. Returns the number removed.
    pub fn clear_partition(&self, partition: &str) -> usize {
        let mut inner = self.lock_inner();
        let removed = match inner.partitions.get_mut(partition) {
            Some(entries) => {
                let count = entries.len();
                entries.clear();
                count
            }
            None => {
                debug!("Cache clear: partition '{}' does not exist", partition);
                return 0;
            }
        };

        inner.counters.deletes += removed as u64;
        info!("Cleared {} '{}' cache entries", removed, partition);
        removed
    }

    /// Remove every entry of every partition. Returns the number removed.
    pub fn clear_all(&self) -> usize {
        let mut inner = self.lock_inner();
        let removed: usize = inner.partitions.values().map(HashMap::len).sum();
        inner.partitions.clear();
        inner.counters.deletes += removed as u64;
        info!("All caches cleared ({} entries)", removed);
        removed
    }

    /// Remove `symbol` from every symbol-keyed partition.
    ///
    /// Entries for other symbols in the same partitions are left alone.
    pub fn invalidate_related(&self, symbol: &str) -> usize {
        let mut inner = self.lock_inner();
        let mut removed = 0;

        for partition in SYMBOL_KEYED_PARTITIONS {
            if let Some(entries) = inner.partitions.get_mut(partition) {
                if entries.remove(symbol).is_some() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            inner.counters.deletes += removed as u64;
            info!("Invalidated {} cache entries for {}", removed, symbol);
        }
        removed
    }

    /// Snapshot of the counters and current partition sizes.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock_inner();
        CacheStats::from_counters(inner.counters, inner.sizes())
    }

    /// Describe one partition, or the whole cache when `partition` is `None`.
    ///
    /// Returns `None` for a partition that has never been written.
    pub fn info(&self, partition: Option<&str>) -> Option<CacheInfo> {
        let inner = self.lock_inner();

        match partition {
            Some(name) => inner.partitions.get(name).map(|entries| {
                let mut keys: Vec<String> = entries.keys().cloned().collect();
                keys.sort();
                CacheInfo::Partition(PartitionInfo {
                    name: name.to_string(),
                    entries: entries.len(),
                    ttl_secs: inner.ttl_for(name, self.default_ttl).as_secs(),
                    keys,
                })
            }),
            None => Some(CacheInfo::Overview(CacheOverview {
                partitions: inner.sizes(),
                ttl_settings: inner
                    .ttls
                    .iter()
                    .map(|(name, ttl)| (name.clone(), ttl.as_secs()))
                    .collect(),
                default_ttl_secs: self.default_ttl.as_secs(),
            })),
        }
    }

    /// Set the TTL used for every entry of a partition without an override.
    pub fn set_ttl(&self, partition: &str, ttl: Duration) -> Result<(), AdminError> {
        if partition.trim().is_empty() {
            return Err(AdminError::EmptyPartitionName);
        }
        if ttl.is_zero() {
            return Err(AdminError::InvalidTtl {
                partition: partition.to_string(),
            });
        }

        let mut inner = self.lock_inner();
        inner.ttls.insert(partition.to_string(), ttl);
        info!("Set TTL for {}: {:?}", partition, ttl);
        Ok(())
    }

    /// TTL currently configured for a partition.
    pub fn ttl(&self, partition: &str) -> Duration {
        self.lock_inner().ttl_for(partition, self.default_ttl)
    }

    /// Remove every expired entry in every partition.
    ///
    /// Each removal counts as an expiration. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let default_ttl = self.default_ttl;
        let mut guard = self.lock_inner();
        let CacheInner {
            partitions,
            ttls,
            counters,
        } = &mut *guard;

        let mut purged = 0;
        for (name, entries) in partitions.iter_mut() {
            let ttl = ttls.get(name).copied().unwrap_or(default_ttl);
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(ttl, now));
            purged += before - entries.len();
        }

        counters.expirations += purged as u64;
        purged
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
