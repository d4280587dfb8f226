//! Cache-aside fetch across prioritized sources with fallback.
//!
//! A fetch checks the `stock_info` partition first. On a miss, sources are
//! tried one at a time in ascending priority. A source that is disabled or
//! still inside its rate window is skipped, never waited on. The first valid
//! snapshot is cached and returned. If nothing answers, seed data is cached
//! with a short TTL and returned in its place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::cache::partition::STOCK_INFO;
use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::fallback::{fallback_snapshot, is_seeded, UNKNOWN_SYMBOL};
use crate::models::Snapshot;
use crate::provider::{AttemptRunner, SourceAdapter};
use crate::registry::{Admission, FetchDiagnostics, SkipReason, SourceRegistry};
use crate::resolver::normalize_symbol;

/// Drives one `fetch` through the cache, the registry and the adapters.
///
/// The cache and the registry are shared with the admin surface. Neither
/// lock is held while the other is taken, and neither is held across an
/// upstream call.
pub struct FetchOrchestrator {
    cache: Arc<CacheStore>,
    registry: Arc<SourceRegistry>,
    adapters: HashMap<String, Arc<dyn SourceAdapter>>,
    runner: AttemptRunner,
    fallback_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FetchOrchestrator {
    /// Create an orchestrator.
    ///
    /// Adapters are matched to registry entries by [`SourceAdapter::name`].
    /// A later adapter with an already used name replaces the earlier one.
    /// `clock` stamps `fetched_at` on every snapshot handed out.
    pub fn new(
        cache: Arc<CacheStore>,
        registry: Arc<SourceRegistry>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        runner: AttemptRunner,
        fallback_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.name().to_string(), adapter))
            .collect();

        Self {
            cache,
            registry,
            adapters,
            runner,
            fallback_ttl,
            clock,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Best-effort snapshot for `symbol`. Never fails.
    pub async fn fetch(&self, symbol: &str) -> Snapshot {
        self.fetch_with_diagnostics(symbol).await.0
    }

    /// Like [`fetch`](Self::fetch), also reporting what happened to each
    /// source.
    pub async fn fetch_with_diagnostics(&self, symbol: &str) -> (Snapshot, FetchDiagnostics) {
        let mut diagnostics = FetchDiagnostics::new();
        let symbol = normalize_symbol(symbol);

        if symbol.is_empty() {
            debug!("Blank symbol requested, serving {}", UNKNOWN_SYMBOL);
            diagnostics.used_fallback = true;
            let mut snapshot = fallback_snapshot(UNKNOWN_SYMBOL);
            snapshot.fetched_at = self.clock.now();
            return (snapshot, diagnostics);
        }

        if let Some(cached) = self.cache.get_json::<Snapshot>(STOCK_INFO, &symbol) {
            debug!("Cache hit for {} (source '{}')", symbol, cached.source_name);
            diagnostics.from_cache = true;
            return (cached, diagnostics);
        }

        // Order is fixed for the whole call; reliability changes made below
        // only affect later fetches.
        for source in self.registry.ordered() {
            let Some(adapter) = self.adapters.get(&source.name) else {
                diagnostics.record_skip(&source.name, SkipReason::NoAdapter);
                continue;
            };

            match self.registry.try_admit(&source.name) {
                Admission::Admitted => {}
                Admission::Disabled => {
                    diagnostics.record_skip(&source.name, SkipReason::Disabled);
                    continue;
                }
                Admission::Throttled { retry_after } => {
                    debug!(
                        "Skipping '{}' for {}: rate limited for another {:?}",
                        source.name, symbol, retry_after
                    );
                    diagnostics.record_skip(&source.name, SkipReason::RateLimited { retry_after });
                    continue;
                }
                // Removed between ordered() and try_admit()
                Admission::Unknown => continue,
            }

            let result = self.runner.run(adapter.as_ref(), &symbol).await;
            self.registry.record_outcome(&source.name, result.success);

            match result.snapshot {
                Some(mut snapshot) if result.success => {
                    snapshot.fetched_at = self.clock.now();
                    info!("Fetched {} from '{}'", symbol, source.name);
                    diagnostics.record_success(&source.name);
                    self.store(&symbol, &snapshot, None);
                    return (snapshot, diagnostics);
                }
                _ => {
                    let error = result
                        .error
                        .unwrap_or_else(|| "no valid snapshot".to_string());
                    diagnostics.record_error(&source.name, error);
                }
            }
        }

        let mut snapshot = fallback_snapshot(&symbol);
        snapshot.fetched_at = self.clock.now();
        info!(
            "No source answered for {}, serving {} fallback data ({})",
            symbol,
            if is_seeded(&symbol) { "seeded" } else { "generic" },
            diagnostics.summary()
        );
        diagnostics.used_fallback = true;

        // Seed data must never outlive live data in the same partition
        let ttl = self.fallback_ttl.min(self.cache.ttl(STOCK_INFO));
        self.store(&symbol, &snapshot, Some(ttl));
        (snapshot, diagnostics)
    }

    fn store(&self, symbol: &str, snapshot: &Snapshot, ttl_override: Option<Duration>) {
        if let Err(e) = self
            .cache
            .set_json(STOCK_INFO, symbol, snapshot, ttl_override)
        {
            warn!("Failed to cache snapshot for {}: {}", symbol, e);
        }
    }
}
