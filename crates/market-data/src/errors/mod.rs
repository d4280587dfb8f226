//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: Failures raised inside source adapters
//! - [`RetryClass`]: Classification for determining retry behavior
//! - [`AdminError`]: Rejected administrative calls

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to an upstream source.
///
/// These never leave the fetch path: adapters turn them into a failed
/// attempt, and the orchestrator degrades to the next source or fallback.
/// Each variant is classified into a [`RetryClass`] via
/// [`retry_class`](Self::retry_class).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The source has no data for this symbol form.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The source rejected the request because of its quota (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The source that rate limited the request
        provider: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The source that timed out
        provider: String,
    },

    /// The source answered with an error or an unparseable body.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The source that returned the error
        provider: String,
        /// The error message from the source
        message: String,
    },

    /// The source is missing credentials or refused them.
    #[error("Not configured: {provider} - {message}")]
    NotConfigured {
        /// The source that is not usable
        provider: String,
        /// What is missing
        message: String,
    },

    /// The normalized snapshot failed validation.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// A network error occurred while communicating with a source.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stockpulse_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { provider: "finnhub".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::SymbolNotFound("0700.HK".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::NextVariant);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } | Self::ProviderError { .. } | Self::Network(_) => {
                RetryClass::WithBackoff
            }
            Self::SymbolNotFound(_) | Self::ValidationFailed { .. } => RetryClass::NextVariant,
            Self::RateLimited { .. } | Self::NotConfigured { .. } => RetryClass::Abort,
        }
    }
}

/// Administrative calls rejected because the caller passed invalid input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid TTL for partition '{partition}': TTL must be greater than zero")]
    InvalidTtl { partition: String },

    #[error("Invalid rate limit for source '{source_name}': requests per minute must be greater than zero")]
    InvalidRateLimit { source_name: String },

    #[error("Partition name must not be empty")]
    EmptyPartitionName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_not_found_tries_next_variant() {
        let error = MarketDataError::SymbolNotFound("700.HK".to_string());
        assert_eq!(error.retry_class(), RetryClass::NextVariant);
    }

    #[test]
    fn test_validation_failed_tries_next_variant() {
        let error = MarketDataError::ValidationFailed {
            message: "no price and no name".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextVariant);
    }

    #[test]
    fn test_timeout_retries_with_backoff() {
        let error = MarketDataError::Timeout {
            provider: "alpha_vantage".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_provider_error_retries_with_backoff() {
        let error = MarketDataError::ProviderError {
            provider: "yahoo_finance".to_string(),
            message: "HTTP 502".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_rate_limited_aborts() {
        let error = MarketDataError::RateLimited {
            provider: "finnhub".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Abort);
    }

    #[test]
    fn test_not_configured_aborts() {
        let error = MarketDataError::NotConfigured {
            provider: "finnhub".to_string(),
            message: "Invalid or missing API key".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Abort);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::SymbolNotFound("INVALID".to_string());
        assert_eq!(format!("{}", error), "Symbol not found: INVALID");

        let error = MarketDataError::RateLimited {
            provider: "yahoo_finance".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: yahoo_finance");

        let error = AdminError::UnknownSource("bloomberg".to_string());
        assert_eq!(format!("{}", error), "Unknown source: bloomberg");
    }
}
