//! StockPulse Market Data Crate
//!
//! This crate fetches company snapshots from several free-tier market data
//! sources and keeps them in an in-memory TTL cache.
//!
//! # Overview
//!
//! The market data crate supports:
//! - A partitioned cache with per-partition TTLs and hit/miss statistics
//! - Multiple sources: Yahoo Finance, Alpha Vantage, Finnhub
//! - Per-source quotas enforced without blocking the caller
//! - Static fallback data when every source is unavailable
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! | MarketDataService  |  (fetch + admin calls)
//! +--------------------+
//!           |
//!           v
//! +--------------------+     +------------------+
//! | FetchOrchestrator  | --> |   CacheStore     |  (cache-aside, TTL)
//! +--------------------+     +------------------+
//!           |                         ^
//!           v                         |
//! +--------------------+     +------------------+
//! |  SourceRegistry    |     |  CacheSweeper    |  (periodic purge)
//! +--------------------+     +------------------+
//!           |
//!           v
//! +--------------------+
//! |   AttemptRunner    |  (timeout, retries, symbol variants)
//! +--------------------+
//!           |
//!           v
//! +--------------------+
//! |   SourceAdapter    |  (Yahoo, AlphaVantage, Finnhub)
//! +--------------------+
//!           |
//!           v
//! +--------------------+
//! |     Snapshot       |  (or fallback seed data)
//! +--------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataService`] - Entry point owning the cache and the registry
//! - [`Snapshot`] - Canonical normalized record for one symbol
//! - [`CacheStore`] - Partitioned key/value cache with expiry
//! - [`SourceRegistry`] - Source descriptors, admission and usage counters
//! - [`FetchDiagnostics`] - What happened to each source during a fetch
//! - [`MarketDataConfig`] - TTLs, retry policy and source overrides

pub mod cache;
pub mod clock;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod service;

// Re-export the main entry points
pub use config::MarketDataConfig;
pub use orchestrator::FetchOrchestrator;
pub use service::MarketDataService;

// Re-export model and error types
pub use errors::{AdminError, MarketDataError, RetryClass};
pub use models::{FetchAttemptResult, Snapshot};

// Re-export cache types
pub use cache::{
    CacheInfo, CacheOverview, CacheStats, CacheStore, CacheSweeper, PartitionInfo, SweeperHandle,
};

// Re-export registry types
pub use registry::{
    Admission, FetchDiagnostics, SkipReason, SourceAttempt, SourceDescriptor, SourceRegistry,
    SourceUsageStats,
};

// Re-export provider types
pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::yahoo::YahooProvider;
pub use provider::{AttemptRunner, RateLimit, RetryPolicy, SourceAdapter};

// Re-export time sources
pub use clock::{Clock, ManualClock, SystemClock};
