//! Upstream source abstractions and implementations.
//!
//! This module contains:
//! - The `SourceAdapter` trait that all sources implement
//! - Rate limit configuration published by each source
//! - The `AttemptRunner` that applies timeouts, retries and symbol variants
//! - Concrete adapters (Yahoo Finance, Alpha Vantage, Finnhub)
//!
//! Adapters perform a single upstream request and normalize the response
//! into a [`Snapshot`](crate::models::Snapshot). Everything around that
//! request (admission, retries, fallback) lives outside the adapter.

mod attempt;
mod capabilities;
mod traits;

pub mod alpha_vantage;
pub mod finnhub;
pub mod yahoo;

// Re-exports
pub use attempt::{AttemptRunner, RetryPolicy};
pub use capabilities::RateLimit;
pub use traits::SourceAdapter;
