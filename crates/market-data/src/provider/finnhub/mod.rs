//! Finnhub source adapter.
//!
//! Uses the /quote endpoint, which returns a price and nothing else.
//! Finnhub free tier is limited to 60 API calls per minute.
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::MarketDataError;
use crate::models::Snapshot;
use crate::provider::{RateLimit, SourceAdapter};
use crate::resolver::{symbol_variants, FINNHUB_RULES};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const SOURCE_NAME: &str = "finnhub";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
    // Note: d, dp, h, l, t exist but are not part of a snapshot
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub source adapter.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub adapter with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, MarketDataError> {
        let url = format!("{}{}", BASE_URL, endpoint);

        // API key as header rather than query param
        let request = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params);

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: SOURCE_NAME.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: SOURCE_NAME.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::NotConfigured {
                provider: SOURCE_NAME.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }

        // Quota exhausted, or the symbol's exchange is outside the plan
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(MarketDataError::RateLimited {
                provider: SOURCE_NAME.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                if let Some(error_msg) = error_resp.error {
                    return Err(MarketDataError::ProviderError {
                        provider: SOURCE_NAME.to_string(),
                        message: error_msg,
                    });
                }
            }

            return Err(MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: format!("HTTP {} - {}", status, body),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: format!("Failed to read response: {}", e),
            })
    }
}

/// Decode a /quote body into a price-only snapshot.
fn parse_quote(symbol: &str, text: &str) -> Result<Snapshot, MarketDataError> {
    let response: QuoteResponse =
        serde_json::from_str(text).map_err(|e| MarketDataError::ProviderError {
            provider: SOURCE_NAME.to_string(),
            message: format!("Failed to parse quote response: {}", e),
        })?;

    let current = response.c.unwrap_or(0.0);

    // Finnhub returns zeros for unknown symbols instead of an error
    if current == 0.0 && response.o.unwrap_or(0.0) == 0.0 {
        return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
    }

    let price = if current > 0.0 {
        current
    } else {
        response.pc.filter(|p| *p > 0.0).unwrap_or(current)
    };

    Ok(Snapshot::new(symbol, SOURCE_NAME).current_price(price))
}

// ============================================================================
// SourceAdapter Implementation
// ============================================================================

#[async_trait]
impl SourceAdapter for FinnhubProvider {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn priority(&self) -> i32 {
        3
    }

    fn initial_reliability(&self) -> f64 {
        0.7
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(60)
    }

    fn symbol_variants(&self, symbol: &str) -> Vec<String> {
        symbol_variants(symbol, FINNHUB_RULES)
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        let text = self.fetch("/quote", &[("symbol", symbol)]).await?;
        parse_quote(symbol, &text)
    }
}

// ============================================================================
// Tests
// ============================================================================
