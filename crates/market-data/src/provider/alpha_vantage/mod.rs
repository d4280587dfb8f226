//! Alpha Vantage source adapter.
//!
//! Uses the `OVERVIEW` function, which returns name, classification and
//! fundamentals but no live price. The free tier allows 5 calls per minute.
//! API documentation: https://www.alphavantage.co/documentation/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::Snapshot;
use crate::provider::{RateLimit, SourceAdapter};
use crate::resolver::{symbol_variants, ALPHA_VANTAGE_RULES};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const SOURCE_NAME: &str = "alpha_vantage";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from the OVERVIEW function.
///
/// Every value is a string. Missing data is `"None"`, `"-"` or absent. An
/// unknown symbol yields `{}`.
#[derive(Debug, Default, Deserialize)]
struct CompanyOverviewResponse {
    #[serde(rename = "Symbol")]
    symbol: Option<String>,
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Sector")]
    sector: Option<String>,
    #[serde(rename = "Industry")]
    industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "PriceToBookRatio")]
    price_to_book_ratio: Option<String>,
    #[serde(rename = "DebtToEquityRatio")]
    debt_to_equity_ratio: Option<String>,
    #[serde(rename = "ReturnOnEquityTTM")]
    return_on_equity_ttm: Option<String>,
    #[serde(rename = "ProfitMargin")]
    profit_margin: Option<String>,

    // API status fields
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl CompanyOverviewResponse {
    /// Parse a string field as f64, handling "None" and "-" values
    fn parse_f64(s: &Option<String>) -> Option<f64> {
        Self::clean_text(s).and_then(|v| v.parse::<f64>().ok())
    }

    /// Trimmed text, or `None` for Alpha Vantage's placeholders.
    fn clean_text(s: &Option<String>) -> Option<&str> {
        s.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "None" && *v != "-")
    }

    fn to_snapshot(&self, symbol: &str) -> Snapshot {
        let mut snapshot = Snapshot::new(symbol, SOURCE_NAME);
        snapshot.display_name = Self::clean_text(&self.name).map(str::to_string);
        snapshot.sector = Self::clean_text(&self.sector).map(title_case);
        snapshot.industry = Self::clean_text(&self.industry).map(title_case);
        snapshot.market_cap = Self::parse_f64(&self.market_capitalization);
        snapshot.pe_ratio = Self::parse_f64(&self.pe_ratio);
        snapshot.price_to_book = Self::parse_f64(&self.price_to_book_ratio);
        snapshot.debt_to_equity = Self::parse_f64(&self.debt_to_equity_ratio);
        snapshot.return_on_equity = Self::parse_f64(&self.return_on_equity_ttm);
        snapshot.profit_margin = Self::parse_f64(&self.profit_margin);
        snapshot
    }
}

// ============================================================================
// AlphaVantageProvider
// ============================================================================

/// Alpha Vantage source adapter.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage adapter with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(BASE_URL, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
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

        if !status.is_success() {
            return Err(MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: e.to_string(),
            })
    }

    /// Check for API-level errors in the response.
    ///
    /// Alpha Vantage answers quota and key problems with HTTP 200 and a
    /// `Note` or `Information` message.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(ref msg) = error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: msg.clone(),
            });
        }

        for msg in [note, information].into_iter().flatten() {
            if msg.contains("API call frequency")
                || msg.contains("rate limit")
                || msg.contains("requests per day")
            {
                return Err(MarketDataError::RateLimited {
                    provider: SOURCE_NAME.to_string(),
                });
            }
            if msg.contains("apikey") || msg.contains("API key") {
                return Err(MarketDataError::NotConfigured {
                    provider: SOURCE_NAME.to_string(),
                    message: msg.clone(),
                });
            }
            warn!("Alpha Vantage message: {}", msg);
        }

        Ok(())
    }

    /// Fetch company overview using the OVERVIEW function.
    async fn fetch_company_overview(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        let params = [("function", "OVERVIEW"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;
        parse_overview(symbol, &text)
    }
}

/// Decode an OVERVIEW body into a snapshot.
fn parse_overview(symbol: &str, text: &str) -> Result<Snapshot, MarketDataError> {
    let response: CompanyOverviewResponse =
        serde_json::from_str(text).map_err(|e| MarketDataError::ProviderError {
            provider: SOURCE_NAME.to_string(),
            message: format!("Failed to parse company overview response: {}", e),
        })?;

    AlphaVantageProvider::check_api_error(
        &response.error_message,
        &response.note,
        &response.information,
    )?;

    if response.symbol.is_none() {
        return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
    }

    debug!("Alpha Vantage: fetched company overview for {}", symbol);
    Ok(response.to_snapshot(symbol))
}

/// "TECHNOLOGY" -> "Technology", "COMPUTER & OFFICE EQUIPMENT" -> "Computer & Office Equipment"
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// SourceAdapter Implementation
// ============================================================================

#[async_trait]
impl SourceAdapter for AlphaVantageProvider {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn priority(&self) -> i32 {
        2
    }

    fn initial_reliability(&self) -> f64 {
        0.8
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(5)
    }

    fn symbol_variants(&self, symbol: &str) -> Vec<String> {
        symbol_variants(symbol, ALPHA_VANTAGE_RULES)
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        if self.api_key.trim().is_empty() {
            return Err(MarketDataError::NotConfigured {
                provider: SOURCE_NAME.to_string(),
                message: "ALPHA_VANTAGE_API_KEY is not set".to_string(),
            });
        }
        self.fetch_company_overview(symbol).await
    }
}

// ============================================================================
// Tests
// ============================================================================
