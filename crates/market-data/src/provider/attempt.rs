//! Retry, timeout and symbol-variant loop around a single adapter.

use std::time::Duration;

use log::{debug, warn};
use rand::Rng;
use tokio::time::timeout;

use super::traits::SourceAdapter;
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{FetchAttemptResult, Snapshot};
use crate::registry::SnapshotValidator;

/// How hard to try one source before giving up on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per symbol variant, including the first.
    pub max_attempts: u32,
    /// Multiplied by the attempt index to get the backoff.
    pub base_delay: Duration,
    /// Upper bound of the random offset added to each backoff.
    pub max_jitter: Duration,
    /// Bound on a single upstream call.
    pub request_timeout: Duration,
    /// Bound on all attempts and variants for one source, backoff included.
    pub source_deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            source_deadline: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (1-based). Zero for the first attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };

        self.base_delay * (attempt - 1) + Duration::from_millis(jitter)
    }
}

/// Runs an adapter under a [`RetryPolicy`].
///
/// For every symbol variant the adapter offers, the call is retried with
/// jittered backoff while the error is transient. A transport failure that
/// outlasts its retries stops the source, since another ticker format would
/// hit the same upstream. "Not found" style errors move straight to the next
/// variant, and quota or credential errors stop the source. The first
/// snapshot that passes validation wins, and the whole run is bounded by
/// [`RetryPolicy::source_deadline`].
pub struct AttemptRunner {
    policy: RetryPolicy,
    validator: SnapshotValidator,
}

impl AttemptRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_validator(policy, SnapshotValidator::new())
    }

    pub fn with_validator(policy: RetryPolicy, validator: SnapshotValidator) -> Self {
        Self { policy, validator }
    }

    /// Fetch `symbol` from `adapter`. Never returns an error: failures are
    /// reported as an unsuccessful [`FetchAttemptResult`].
    ///
    /// A successful snapshot carries the requested `symbol` even when a
    /// variant was used upstream.
    pub async fn run(&self, adapter: &dyn SourceAdapter, symbol: &str) -> FetchAttemptResult {
        match timeout(self.policy.source_deadline, self.run_variants(adapter, symbol)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "'{}' gave no answer for {} within {:?}",
                    adapter.name(),
                    symbol,
                    self.policy.source_deadline
                );
                let error = MarketDataError::Timeout {
                    provider: adapter.name().to_string(),
                };
                FetchAttemptResult::failed(error.to_string())
            }
        }
    }

    async fn run_variants(&self, adapter: &dyn SourceAdapter, symbol: &str) -> FetchAttemptResult {
        let source = adapter.name();
        let variants = adapter.symbol_variants(symbol);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<MarketDataError> = None;

        'variants: for variant in &variants {
            for attempt in 1..=max_attempts {
                let delay = self.policy.backoff(attempt);
                if !delay.is_zero() {
                    debug!(
                        "Retrying '{}' for {} in {:?} (attempt {}/{})",
                        source, variant, delay, attempt, max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }

                let error = match self.attempt(adapter, variant).await {
                    Ok(mut snapshot) => {
                        if variant != symbol {
                            debug!("'{}' answered {} as {}", source, symbol, variant);
                        }
                        snapshot.symbol = symbol.to_string();
                        snapshot.source_name = source.to_string();
                        return FetchAttemptResult::succeeded(snapshot);
                    }
                    Err(e) => e,
                };

                warn!(
                    "'{}' failed for {} (attempt {}/{}): {}",
                    source, variant, attempt, max_attempts, error
                );

                let class = error.retry_class();
                last_error = Some(error);
                match class {
                    RetryClass::WithBackoff if attempt < max_attempts => continue,
                    RetryClass::WithBackoff => break 'variants,
                    RetryClass::NextVariant => continue 'variants,
                    RetryClass::Abort => break 'variants,
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("{} offered no symbol variants", source));
        FetchAttemptResult::failed(message)
    }

    /// One bounded call plus validation.
    async fn attempt(
        &self,
        adapter: &dyn SourceAdapter,
        variant: &str,
    ) -> Result<Snapshot, MarketDataError> {
        let snapshot = timeout(self.policy.request_timeout, adapter.fetch_snapshot(variant))
            .await
            .map_err(|_| MarketDataError::Timeout {
                provider: adapter.name().to_string(),
            })??;

        self.validator.validate(&snapshot)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RateLimit;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Adapter that replays a script of responses and records every call.
    struct ScriptedAdapter {
        variants: Vec<String>,
        script: Mutex<VecDeque<Result<Snapshot, MarketDataError>>>,
        calls: Mutex<Vec<String>>,
        hang: bool,
    }

    impl ScriptedAdapter {
        fn new(script: Vec<Result<Snapshot, MarketDataError>>) -> Self {
            Self {
                variants: Vec::new(),
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
                hang: false,
            }
        }

        fn with_variants(mut self, variants: &[&str]) -> Self {
            self.variants = variants.iter().map(|v| v.to_string()).collect();
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceAdapter for ScriptedAdapter {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn rate_limit(&self) -> RateLimit {
            RateLimit::default()
        }

        fn symbol_variants(&self, symbol: &str) -> Vec<String> {
            if self.variants.is_empty() {
                vec![symbol.to_string()]
            } else {
                self.variants.clone()
            }
        }

        async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(MarketDataError::SymbolNotFound(symbol.to_string())))
        }
    }

    fn priced(symbol: &str) -> Result<Snapshot, MarketDataError> {
        Ok(Snapshot::new(symbol, "scripted").current_price(10.0))
    }

    fn transient() -> Result<Snapshot, MarketDataError> {
        Err(MarketDataError::ProviderError {
            provider: "scripted".to_string(),
            message: "HTTP 502".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success() {
        let adapter = ScriptedAdapter::new(vec![priced("AAA")]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "AAA").await;

        assert!(result.success);
        assert_eq!(adapter.calls(), vec!["AAA"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried() {
        let adapter = ScriptedAdapter::new(vec![transient(), priced("AAA")]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "AAA").await;

        assert!(result.success);
        assert_eq!(adapter.calls(), vec!["AAA", "AAA"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let adapter = ScriptedAdapter::new(vec![transient(), transient(), transient()]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "AAA").await;

        assert!(!result.success);
        assert_eq!(adapter.calls().len(), 2);
        assert!(result.error.unwrap().contains("HTTP 502"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_moves_to_next_variant() {
        let adapter = ScriptedAdapter::new(vec![
            Err(MarketDataError::SymbolNotFound("700.HK".to_string())),
            priced("0700.HK"),
        ])
        .with_variants(&["700.HK", "0700.HK"]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "700.HK").await;

        assert!(result.success);
        assert_eq!(adapter.calls(), vec!["700.HK", "0700.HK"]);
        // Reported under the requested symbol
        assert_eq!(result.snapshot.unwrap().symbol, "700.HK");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_snapshot_moves_to_next_variant() {
        let adapter = ScriptedAdapter::new(vec![
            Ok(Snapshot::new("A1", "scripted")),
            priced("A2"),
        ])
        .with_variants(&["A1", "A2"]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "A1").await;

        assert!(result.success);
        assert_eq!(adapter.calls(), vec!["A1", "A2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_aborts_source() {
        let adapter = ScriptedAdapter::new(vec![
            Err(MarketDataError::RateLimited {
                provider: "scripted".to_string(),
            }),
            priced("B"),
        ])
        .with_variants(&["A", "B"]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "A").await;

        assert!(!result.success);
        assert_eq!(adapter.calls(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out() {
        let mut adapter = ScriptedAdapter::new(vec![]);
        adapter.hang = true;
        let runner = AttemptRunner::new(RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        });

        let result = runner.run(&adapter, "AAA").await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Timeout: scripted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_transient_errors_stop_the_source() {
        let adapter = ScriptedAdapter::new(vec![transient(), transient(), priced("0700")])
            .with_variants(&["0700.HK", "0700"]);
        let runner = AttemptRunner::new(RetryPolicy::default());

        let result = runner.run(&adapter, "0700.HK").await;

        assert!(!result.success);
        assert_eq!(adapter.calls(), vec!["0700.HK", "0700.HK"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_multi_variant_source_is_bounded() {
        let mut adapter =
            ScriptedAdapter::new(vec![]).with_variants(&["0700.HK", "0700", "0700.HKG"]);
        adapter.hang = true;
        let policy = RetryPolicy::default();
        let runner = AttemptRunner::new(policy.clone());

        let started = tokio::time::Instant::now();
        let result = runner.run(&adapter, "0700.HK").await;

        assert!(!result.success);
        // Timer wheel resolution is one millisecond
        assert!(started.elapsed() < policy.source_deadline + Duration::from_millis(10));
        assert!(adapter.calls().iter().all(|v| v == "0700.HK"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_deadline_cuts_retries_short() {
        let mut adapter = ScriptedAdapter::new(vec![]);
        adapter.hang = true;
        let runner = AttemptRunner::new(RetryPolicy {
            max_attempts: 5,
            source_deadline: Duration::from_secs(12),
            ..RetryPolicy::default()
        });

        let started = tokio::time::Instant::now();
        let result = runner.run(&adapter, "AAA").await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(12));
        assert!(elapsed < Duration::from_millis(12_010));
        assert_eq!(result.error.as_deref(), Some("Timeout: scripted"));
        assert_eq!(adapter.calls().len(), 2);
    }

    #[test]
    fn test_backoff_grows_with_attempt() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff(1), Duration::ZERO);

        let second = policy.backoff(2);
        assert!(second >= Duration::from_secs(1));
        assert!(second <= Duration::from_millis(1500));

        let third = policy.backoff(3);
        assert!(third >= Duration::from_secs(2));
        assert!(third <= Duration::from_millis(2500));
    }
}
