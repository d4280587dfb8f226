//! Cache statistics and introspection results.

use std::collections::BTreeMap;

use serde::Serialize;

/// Lifetime counters. Monotonic for the life of the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub expirations: u64,
}

/// Point-in-time copy of the cache counters plus current sizes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    /// Entry count per partition that currently exists.
    pub partitions: BTreeMap<String, usize>,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub expirations: u64,
    /// Hit rate formatted for display, e.g. "66.7%".
    pub hit_rate: String,
}

impl CacheStats {
    pub(crate) fn from_counters(
        counters: CacheCounters,
        partitions: BTreeMap<String, usize>,
    ) -> Self {
        let total_entries = partitions.values().sum();
        let lookups = counters.hits + counters.misses;
        let ratio = if lookups > 0 {
            counters.hits as f64 / lookups as f64
        } else {
            0.0
        };

        Self {
            total_entries,
            partitions,
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            deletes: counters.deletes,
            expirations: counters.expirations,
            hit_rate: format!("{:.1}%", ratio * 100.0),
        }
    }

    /// Hits as a fraction of all lookups, 0.0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Details for a single partition.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub name: String,
    pub entries: usize,
    pub ttl_secs: u64,
    pub keys: Vec<String>,
}

/// Sizes of every partition and every configured TTL.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOverview {
    pub partitions: BTreeMap<String, usize>,
    pub ttl_settings: BTreeMap<String, u64>,
    pub default_ttl_secs: u64,
}

/// Result of an `info` call: one partition, or the whole cache.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CacheInfo {
    Partition(PartitionInfo),
    Overview(CacheOverview),
}
