//! Entry point for callers: fetch plus the administrative calls.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::cache::{CacheInfo, CacheStats, CacheStore, CacheSweeper, SweeperHandle};
use crate::clock::{Clock, SystemClock};
use crate::config::MarketDataConfig;
use crate::errors::{AdminError, MarketDataError};
use crate::models::Snapshot;
use crate::orchestrator::FetchOrchestrator;
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::finnhub::FinnhubProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::{AttemptRunner, SourceAdapter};
use crate::registry::{FetchDiagnostics, SourceRegistry, SourceUsageStats};
use crate::resolver::normalize_symbol;

/// Owns the cache, the source registry and the orchestrator built on them.
///
/// Every method takes `&self`; share the service behind an `Arc` to use it
/// from several tasks.
pub struct MarketDataService {
    orchestrator: FetchOrchestrator,
    cache: Arc<CacheStore>,
    registry: Arc<SourceRegistry>,
    sweep_interval: Duration,
}

impl MarketDataService {
    /// Build a service over `adapters` using the system clock.
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, config: MarketDataConfig) -> Self {
        Self::with_clock(adapters, config, Arc::new(SystemClock))
    }

    /// Build a service with an explicit time source for the cache and the
    /// rate gate.
    pub fn with_clock(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        config: MarketDataConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(CacheStore::with_config(
            config.partition_ttls,
            config.default_ttl,
            clock.clone(),
        ));
        let registry = Arc::new(SourceRegistry::with_overrides(
            &adapters,
            &config.source_priorities,
            &config.disabled_sources,
            clock.clone(),
        ));
        let orchestrator = FetchOrchestrator::new(
            cache.clone(),
            registry.clone(),
            adapters,
            AttemptRunner::new(config.retry),
            config.fallback_ttl,
            clock,
        );

        Self {
            orchestrator,
            cache,
            registry,
            sweep_interval: config.sweep_interval,
        }
    }

    /// Build a service over the bundled upstream sources.
    ///
    /// Alpha Vantage is only registered when a non-empty key is given.
    /// Finnhub accepts its public `demo` key.
    pub fn with_default_sources(
        alpha_vantage_key: Option<String>,
        finnhub_key: String,
        config: MarketDataConfig,
    ) -> Result<Self, MarketDataError> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(YahooProvider::new()?)];

        match alpha_vantage_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => adapters.push(Arc::new(AlphaVantageProvider::new(key))),
            None => info!("No Alpha Vantage API key configured, source not registered"),
        }
        adapters.push(Arc::new(FinnhubProvider::new(finnhub_key)));

        Ok(Self::new(adapters, config))
    }

    // Fetch

    /// Best-effort snapshot for `symbol`. Never fails; see
    /// [`Snapshot::is_fallback`] to tell seed data from live data.
    pub async fn fetch(&self, symbol: &str) -> Snapshot {
        self.orchestrator.fetch(symbol).await
    }

    pub async fn fetch_with_diagnostics(&self, symbol: &str) -> (Snapshot, FetchDiagnostics) {
        self.orchestrator.fetch_with_diagnostics(symbol).await
    }

    // Cache administration

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Details of one partition, or an overview of all of them.
    ///
    /// Returns `None` for an unknown partition.
    pub fn cache_info(&self, partition: Option<&str>) -> Option<CacheInfo> {
        self.cache.info(partition)
    }

    /// Clear one partition, or every partition when `partition` is `None`.
    /// Returns the number of entries removed.
    pub fn clear_cache(&self, partition: Option<&str>) -> usize {
        match partition {
            Some(partition) => self.cache.clear_partition(partition),
            None => self.cache.clear_all(),
        }
    }

    /// Drop every symbol-keyed entry for `symbol`.
    pub fn invalidate_symbol(&self, symbol: &str) -> usize {
        self.cache.invalidate_related(&normalize_symbol(symbol))
    }

    pub fn set_cache_ttl(&self, partition: &str, ttl: Duration) -> Result<(), AdminError> {
        self.cache.set_ttl(partition, ttl)
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    /// Start the background sweeper at the configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) -> SweeperHandle {
        CacheSweeper::new(self.cache.clone(), self.sweep_interval).start()
    }

    // Source administration

    pub fn enable_source(&self, name: &str, enabled: bool) -> Result<(), AdminError> {
        self.registry.enable(name, enabled)
    }

    pub fn set_source_priority(&self, name: &str, priority: i32) -> Result<(), AdminError> {
        self.registry.set_priority(name, priority)
    }

    pub fn set_source_rate_limit(
        &self,
        name: &str,
        requests_per_minute: u32,
    ) -> Result<(), AdminError> {
        self.registry.set_rate_limit(name, requests_per_minute)
    }

    pub fn source_stats(&self) -> SourceUsageStats {
        self.registry.usage_stats()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }
}
