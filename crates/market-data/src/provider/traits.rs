//! Source adapter trait definitions.
//!
//! This module defines the core `SourceAdapter` trait that every upstream
//! integration implements.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::Snapshot;

use super::capabilities::RateLimit;

/// Trait for upstream market data sources.
///
/// An adapter performs exactly one request per `fetch_snapshot` call.
/// Retries, timeouts and symbol variant probing are applied around it by
/// [`AttemptRunner`](super::AttemptRunner).
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stockpulse_market_data::provider::{RateLimit, SourceAdapter};
///
/// struct MySource {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl SourceAdapter for MySource {
///     fn name(&self) -> &'static str {
///         "my_source"
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::per_minute(30)
///     }
///
///     async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
///         // ... call the upstream and normalize
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier for this source, e.g. "yahoo_finance".
    ///
    /// Used as the registry key and as `source_name` on snapshots.
    fn name(&self) -> &'static str;

    /// Default priority. Lower values are tried first.
    fn priority(&self) -> i32 {
        10
    }

    /// Starting reliability estimate in [0, 1].
    fn initial_reliability(&self) -> f64 {
        0.5
    }

    /// Request quota of the upstream.
    fn rate_limit(&self) -> RateLimit;

    /// Symbol forms to try, in order. The first entry is normally `symbol`
    /// itself.
    fn symbol_variants(&self, symbol: &str) -> Vec<String> {
        vec![symbol.to_string()]
    }

    /// Fetch and normalize a snapshot for one symbol form.
    ///
    /// The returned snapshot's `source_name` should be [`name`](Self::name).
    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError>;
}
