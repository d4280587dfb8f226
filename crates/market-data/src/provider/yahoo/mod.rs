//! Yahoo Finance source adapter.
//!
//! Primary path: the quoteSummary API, which needs a cookie/crumb pair and
//! returns name, classification, price and fundamentals in one call.
//! Backup path: the chart API via `yahoo_finance_api`, which only yields a
//! price.

mod models;

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::Snapshot;
use crate::provider::{RateLimit, SourceAdapter};
use crate::resolver::{symbol_variants, YAHOO_RULES};

use models::{raw, YahooQuoteSummaryResponse, YahooQuoteSummaryResult};

const SOURCE_NAME: &str = "yahoo_finance";

const QUOTE_SUMMARY_MODULES: &str =
    "price,summaryProfile,summaryDetail,financialData,defaultKeyStatistics";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance source adapter.
pub struct YahooProvider {
    client: Client,
    connector: yahoo::YahooConnector,
    crumb: RwLock<Option<CrumbData>>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance adapter.
    pub fn new() -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(MarketDataError::Network)?;

        Ok(Self {
            client,
            connector,
            crumb: RwLock::new(None),
        })
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    fn cached_crumb(&self) -> Option<CrumbData> {
        self.crumb
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_crumb(&self, crumb: Option<CrumbData>) {
        *self
            .crumb
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = crumb;
    }

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }
        self.fetch_crumb().await
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // Step 1: Get cookie from fc.yahoo.com
        let response = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(request_error)?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: Get crumb using cookie
        let response = self
            .client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::COOKIE, &cookie)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: SOURCE_NAME.to_string(),
            });
        }

        let crumb = response.text().await.map_err(request_error)?;
        if crumb.trim().is_empty() || crumb.contains('<') {
            return Err(MarketDataError::ProviderError {
                provider: SOURCE_NAME.to_string(),
                message: "Yahoo returned an invalid crumb".to_string(),
            });
        }

        let crumb_data = CrumbData { cookie, crumb };
        self.store_crumb(Some(crumb_data.clone()));
        debug!("Obtained new Yahoo crumb");

        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication fails)
    fn clear_crumb(&self) {
        self.store_crumb(None);
    }

    // ========================================================================
    // Snapshot Fetching
    // ========================================================================

    /// Fetch a full snapshot from the quoteSummary API.
    async fn fetch_quote_summary(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        let crumb = self.ensure_crumb().await?;

        let url = format!(
            "https://query1.finance.yahoo.com/v10/finance/quoteSummary/{}?modules={}&crumb={}",
            encode(symbol),
            QUOTE_SUMMARY_MODULES,
            encode(&crumb.crumb)
        );

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, &crumb.cookie)
            .send()
            .await
            .map_err(request_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.clear_crumb();
                return Err(MarketDataError::ProviderError {
                    provider: SOURCE_NAME.to_string(),
                    message: "Yahoo authentication expired".to_string(),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(MarketDataError::RateLimited {
                    provider: SOURCE_NAME.to_string(),
                });
            }
            StatusCode::NOT_FOUND => {
                return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
            }
            status if !status.is_success() => {
                return Err(MarketDataError::ProviderError {
                    provider: SOURCE_NAME.to_string(),
                    message: format!("HTTP {}", status),
                });
            }
            _ => {}
        }

        let data: YahooQuoteSummaryResponse =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::ProviderError {
                    provider: SOURCE_NAME.to_string(),
                    message: format!("Failed to parse quoteSummary response: {}", e),
                })?;

        if let Some(error) = data.quote_summary.error {
            debug!(
                "quoteSummary error for {}: {:?} {:?}",
                symbol, error.code, error.description
            );
        }

        let result = data
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        Ok(snapshot_from_summary(symbol, &result))
    }

    /// Fetch a price-only snapshot from the chart API.
    async fn fetch_chart_price(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| {
                if matches!(e, yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) {
                    MarketDataError::SymbolNotFound(symbol.to_string())
                } else {
                    MarketDataError::ProviderError {
                        provider: SOURCE_NAME.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let quote = response.last_quote().map_err(|e| {
            warn!("No quotes returned for {}: {}", symbol, e);
            MarketDataError::SymbolNotFound(symbol.to_string())
        })?;

        Ok(Snapshot::new(symbol, SOURCE_NAME).current_price(quote.close))
    }
}

// ============================================================================
// SourceAdapter Implementation
// ============================================================================

#[async_trait]
impl SourceAdapter for YahooProvider {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn priority(&self) -> i32 {
        1
    }

    fn initial_reliability(&self) -> f64 {
        0.9
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::per_minute(100)
    }

    fn symbol_variants(&self, symbol: &str) -> Vec<String> {
        symbol_variants(symbol, YAHOO_RULES)
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<Snapshot, MarketDataError> {
        debug!("Fetching snapshot for {} from Yahoo", symbol);

        let primary_error = match self.fetch_quote_summary(symbol).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e @ MarketDataError::RateLimited { .. }) => return Err(e),
            Err(e) => e,
        };

        debug!(
            "quoteSummary failed for {}: {}, trying chart API",
            symbol, primary_error
        );

        match self.fetch_chart_price(symbol).await {
            Ok(snapshot) => Ok(snapshot),
            Err(backup_error) => {
                debug!("Chart API failed for {}: {}", symbol, backup_error);
                Err(primary_error)
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn request_error(e: reqwest::Error) -> MarketDataError {
    if e.is_timeout() {
        MarketDataError::Timeout {
            provider: SOURCE_NAME.to_string(),
        }
    } else {
        MarketDataError::Network(e)
    }
}

/// Normalize a quoteSummary result.
///
/// Price preference: `financialData.currentPrice`, then
/// `price.regularMarketPrice`, then `summaryDetail.previousClose`.
fn snapshot_from_summary(symbol: &str, result: &YahooQuoteSummaryResult) -> Snapshot {
    let price = result.price.as_ref();
    let profile = result.summary_profile.as_ref();
    let detail = result.summary_detail.as_ref();
    let financial = result.financial_data.as_ref();
    let stats = result.default_key_statistics.as_ref();

    let mut snapshot = Snapshot::new(symbol, SOURCE_NAME);

    snapshot.display_name = price
        .and_then(|p| non_empty(p.long_name.as_deref()).or(non_empty(p.short_name.as_deref())))
        .map(|name| name.replace("&amp;", "&"));
    snapshot.sector = profile.and_then(|p| non_empty(p.sector.as_deref()).map(format_sector));
    snapshot.industry = profile.and_then(|p| non_empty(p.industry.as_deref()).map(str::to_string));

    snapshot.current_price = financial
        .and_then(|f| raw(&f.current_price))
        .or_else(|| price.and_then(|p| raw(&p.regular_market_price)))
        .or_else(|| detail.and_then(|d| raw(&d.previous_close)));
    snapshot.market_cap = detail
        .and_then(|d| raw(&d.market_cap))
        .or_else(|| price.and_then(|p| raw(&p.market_cap)));
    snapshot.pe_ratio = detail.and_then(|d| raw(&d.trailing_pe));
    snapshot.price_to_book = stats.and_then(|s| raw(&s.price_to_book));
    snapshot.debt_to_equity = financial.and_then(|f| raw(&f.debt_to_equity));
    snapshot.return_on_equity = financial.and_then(|f| raw(&f.return_on_equity));
    snapshot.profit_margin = financial.and_then(|f| raw(&f.profit_margins));

    snapshot
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Convert snake_case sector to Title Case.
fn format_sector(sector: &str) -> String {
    sector
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> YahooQuoteSummaryResult {
        let response: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        response
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .unwrap()
    }

    #[test]
    fn test_full_summary_is_normalized() {
        let result = parse(
            r#"{"quoteSummary": {"result": [{
                "price": {
                    "currency": "HKD",
                    "shortName": "TENCENT",
                    "longName": "Tencent Holdings Limited",
                    "regularMarketPrice": {"raw": 321.0, "fmt": "321.00"}
                },
                "summaryProfile": {
                    "sector": "Communication Services",
                    "industry": "Internet Content & Information"
                },
                "summaryDetail": {
                    "previousClose": {"raw": 318.0},
                    "marketCap": {"raw": 3000000000000},
                    "trailingPE": {"raw": 15.2}
                },
                "financialData": {
                    "currentPrice": {"raw": 320.4},
                    "returnOnEquity": {"raw": 0.25},
                    "profitMargins": {"raw": 0.35}
                },
                "defaultKeyStatistics": {
                    "priceToBook": {"raw": 3.8}
                }
            }], "error": null}}"#,
        );

        let snapshot = snapshot_from_summary("0700.HK", &result);

        assert_eq!(snapshot.display_name.as_deref(), Some("Tencent Holdings Limited"));
        assert_eq!(snapshot.sector.as_deref(), Some("Communication Services"));
        assert_eq!(snapshot.current_price, Some(320.4));
        assert_eq!(snapshot.market_cap, Some(3_000_000_000_000.0));
        assert_eq!(snapshot.pe_ratio, Some(15.2));
        assert_eq!(snapshot.price_to_book, Some(3.8));
        assert_eq!(snapshot.return_on_equity, Some(0.25));
        assert_eq!(snapshot.profit_margin, Some(0.35));
        assert_eq!(snapshot.debt_to_equity, None);
        assert_eq!(snapshot.source_name, "yahoo_finance");
    }

    #[test]
    fn test_price_falls_back_to_previous_close() {
        let result = parse(
            r#"{"quoteSummary": {"result": [{
                "price": {"shortName": "HSBC HOLDINGS", "regularMarketPrice": {}},
                "summaryDetail": {"previousClose": {"raw": 65.5}},
                "financialData": {"currentPrice": {}}
            }]}}"#,
        );

        let snapshot = snapshot_from_summary("0005.HK", &result);

        assert_eq!(snapshot.current_price, Some(65.5));
        assert_eq!(snapshot.display_name.as_deref(), Some("HSBC HOLDINGS"));
    }

    #[test]
    fn test_empty_result_has_neither_price_nor_name() {
        let result = parse(r#"{"quoteSummary": {"result": [{"price": {"longName": "  "}}]}}"#);

        let snapshot = snapshot_from_summary("ZZZZ", &result);

        assert!(snapshot.display_name.is_none());
        assert!(snapshot.current_price.is_none());
    }

    #[test]
    fn test_format_sector() {
        assert_eq!(format_sector("technology"), "Technology");
        assert_eq!(format_sector("basic_materials"), "Basic Materials");
        assert_eq!(format_sector("Financial Services"), "Financial Services");
    }

    #[test]
    fn test_symbol_variants_use_yahoo_rules() {
        let provider = YahooProvider::new().unwrap();
        assert_eq!(provider.symbol_variants("5.HK"), vec!["5.HK", "0005.HK"]);
        assert_eq!(provider.rate_limit(), RateLimit::per_minute(100));
    }
}
