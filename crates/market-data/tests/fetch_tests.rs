//! Fetch path integration tests through `MarketDataService`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stockpulse_market_data::fallback::FALLBACK_SOURCE;
use stockpulse_market_data::{
    ManualClock, MarketDataConfig, MarketDataError, MarketDataService, RateLimit, SkipReason,
    Snapshot, SourceAdapter,
};

// =============================================================================
// Mock adapter
// =============================================================================

struct MockSource {
    name: &'static str,
    priority: i32,
    requests_per_minute: u32,
    fails: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(name: &'static str, priority: i32, fails: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            requests_per_minute: 600,
            fails,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn throttled(name: &'static str, priority: i32, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            priority,
            requests_per_minute: 1,
            fails: false,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(self.requests_per_minute)
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fails {
            Err(MarketDataError::SymbolNotFound(symbol.to_string()))
        } else {
            Ok(Snapshot::new(symbol, self.name)
                .display_name("Mock Corp")
                .current_price(12.5))
        }
    }
}

fn service_with(sources: &[Arc<MockSource>]) -> (MarketDataService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let adapters: Vec<Arc<dyn SourceAdapter>> = sources
        .iter()
        .map(|s| s.clone() as Arc<dyn SourceAdapter>)
        .collect();
    let service = MarketDataService::with_clock(
        adapters,
        MarketDataConfig::default(),
        clock.clone(),
    );
    (service, clock)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn priority_order_first_success_wins() {
    let p1 = MockSource::new("p1", 1, true);
    let p2 = MockSource::new("p2", 2, true);
    let p3 = MockSource::new("p3", 3, false);
    let (service, _clock) = service_with(&[p3.clone(), p2.clone(), p1.clone()]);

    let (snapshot, diagnostics) = service.fetch_with_diagnostics("AAA").await;

    assert_eq!(snapshot.source_name, "p3");
    assert_eq!(p1.calls(), 1);
    assert_eq!(p2.calls(), 1);
    assert_eq!(p3.calls(), 1);
    assert_eq!(diagnostics.attempted(), vec!["p1", "p2", "p3"]);
    assert_eq!(
        diagnostics.summary(),
        "p1: ERROR (Symbol not found: AAA) -> p2: ERROR (Symbol not found: AAA) -> p3: SUCCESS"
    );

    let stats = service.source_stats();
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.successful_requests, 1);
    assert_eq!(stats.source_usage.get("p3"), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn total_failure_returns_fallback() {
    let (service, _clock) = service_with(&[
        MockSource::new("a", 1, true),
        MockSource::new("b", 2, true),
    ]);

    let snapshot = service.fetch("UNKNOWN").await;

    assert_eq!(snapshot.source_name, FALLBACK_SOURCE);
    assert!(!snapshot.symbol.is_empty());
}

#[tokio::test(start_paused = true)]
async fn all_disabled_returns_fallback_without_calls() {
    let a = MockSource::new("a", 1, false);
    let b = MockSource::new("b", 2, false);
    let (service, _clock) = service_with(&[a.clone(), b.clone()]);
    service.enable_source("a", false).unwrap();
    service.enable_source("b", false).unwrap();

    let (snapshot, diagnostics) = service.fetch_with_diagnostics("UNKNOWN").await;

    assert_eq!(snapshot.source_name, FALLBACK_SOURCE);
    assert_eq!(a.calls() + b.calls(), 0);
    assert!(diagnostics.used_fallback);
    assert!(diagnostics
        .skip_reasons()
        .iter()
        .all(|(_, reason)| **reason == SkipReason::Disabled));
}

#[tokio::test(start_paused = true)]
async fn throttled_source_falls_through_immediately() {
    let slow = MockSource::throttled("slow", 1, Duration::ZERO);
    let fast = MockSource::new("fast", 2, false);
    let (service, clock) = service_with(&[slow.clone(), fast.clone()]);

    assert_eq!(service.fetch("AAA").await.source_name, "slow");

    let (snapshot, diagnostics) = service.fetch_with_diagnostics("BBB").await;
    assert_eq!(snapshot.source_name, "fast");
    assert!(matches!(
        diagnostics.skip_reasons()[0],
        ("slow", SkipReason::RateLimited { .. })
    ));

    // Quota window over: the preferred source is used again
    clock.advance(Duration::from_secs(60));
    assert_eq!(service.fetch("CCC").await.source_name, "slow");
    assert_eq!(slow.calls(), 2);
    assert_eq!(fast.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn fallback_expires_before_live_data() {
    let source = MockSource::new("flaky", 1, true);
    let (service, clock) = service_with(&[source.clone()]);

    assert!(service.fetch("0005.HK").await.is_fallback());
    assert!(service.fetch("0005.HK").await.is_fallback());
    assert_eq!(source.calls(), 1);

    clock.advance(Duration::from_secs(2 * 60));
    service.fetch("0005.HK").await;
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn priority_change_applies_to_next_fetch() {
    let a = MockSource::new("a", 1, false);
    let b = MockSource::new("b", 2, false);
    let (service, _clock) = service_with(&[a.clone(), b.clone()]);

    service.set_source_priority("b", 0).unwrap();
    let snapshot = service.fetch("AAA").await;

    assert_eq!(snapshot.source_name, "b");
    assert_eq!(a.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fetches_respect_rate_limit() {
    let slow = MockSource::throttled("slow", 1, Duration::from_millis(50));
    let backup = MockSource::throttled("backup", 2, Duration::ZERO);
    let (service, _clock) = service_with(&[slow.clone(), backup.clone()]);
    let service = Arc::new(service);

    // Frozen clock: each source admits exactly one request
    let handles: Vec<_> = ["AAA", "BBB", "CCC", "DDD"]
        .into_iter()
        .map(|symbol| {
            let service = service.clone();
            tokio::spawn(async move { service.fetch(symbol).await })
        })
        .collect();

    let mut sources = Vec::new();
    for handle in handles {
        sources.push(handle.await.unwrap().source_name);
    }

    assert_eq!(slow.calls(), 1);
    assert_eq!(backup.calls(), 1);
    let served_by = |name: &str| sources.iter().filter(|s| *s == name).count();
    assert_eq!(served_by("slow"), 1);
    assert_eq!(served_by("backup"), 1);
    assert_eq!(served_by(FALLBACK_SOURCE), 2);
}
