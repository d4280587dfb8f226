//! Library configuration.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::cache::partition::{default_partition_ttls, DEFAULT_TTL};
use crate::provider::RetryPolicy;

/// Tuning knobs for the cache, the sweeper and the fetch path.
#[derive(Clone, Debug)]
pub struct MarketDataConfig {
    /// TTL for partitions missing from `partition_ttls`.
    pub default_ttl: Duration,
    pub partition_ttls: HashMap<String, Duration>,
    /// Per-entry TTL for fallback snapshots, so real sources are retried soon.
    pub fallback_ttl: Duration,
    pub sweep_interval: Duration,
    pub retry: RetryPolicy,
    /// Priority overrides by source name. Beat adapter defaults.
    pub source_priorities: HashMap<String, i32>,
    /// Sources that start disabled.
    pub disabled_sources: HashSet<String>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            partition_ttls: default_partition_ttls(),
            fallback_ttl: Duration::from_secs(2 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            retry: RetryPolicy::default(),
            source_priorities: HashMap::new(),
            disabled_sources: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::partition::STOCK_INFO;

    #[test]
    fn test_defaults() {
        let config = MarketDataConfig::default();

        assert_eq!(config.partition_ttls[STOCK_INFO], Duration::from_secs(3600));
        assert!(config.fallback_ttl < config.partition_ttls[STOCK_INFO]);
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.retry.max_attempts, 2);
    }
}
