//! Yahoo Finance API response models.
//!
//! These models are used for parsing quoteSummary responses. Numeric fields
//! arrive as `{"raw": 123.45, "fmt": "123.45"}` objects, or as `{}` when the
//! value is unknown.

use serde::Deserialize;

/// Main response wrapper for quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

/// Quote summary container
///
/// Unknown symbols come back with `result: null` and a populated `error`.
#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    #[serde(default)]
    pub result: Option<Vec<YahooQuoteSummaryResult>>,
    #[serde(default)]
    pub error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooApiError {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Individual result from quoteSummary API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResult {
    pub price: Option<YahooPriceData>,
    pub summary_profile: Option<YahooSummaryProfile>,
    pub summary_detail: Option<YahooSummaryDetail>,
    pub financial_data: Option<YahooFinancialData>,
    pub default_key_statistics: Option<YahooKeyStatistics>,
}

/// Price module
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooPriceData {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<YahooValue>,
    pub market_cap: Option<YahooValue>,
}

/// Raw value with its display form
#[derive(Debug, Deserialize, Clone)]
pub struct YahooValue {
    pub raw: Option<f64>,
}

/// Company info
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// Trading metrics
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooSummaryDetail {
    pub previous_close: Option<YahooValue>,
    pub market_cap: Option<YahooValue>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<YahooValue>,
}

/// Fundamentals
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooFinancialData {
    pub current_price: Option<YahooValue>,
    pub debt_to_equity: Option<YahooValue>,
    pub return_on_equity: Option<YahooValue>,
    pub profit_margins: Option<YahooValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooKeyStatistics {
    pub price_to_book: Option<YahooValue>,
}

/// Read the raw number out of an optional `{raw, fmt}` object.
pub fn raw(value: &Option<YahooValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_value() {
        let json = r#"{"raw": 150.25, "fmt": "150.25"}"#;
        let value: YahooValue = serde_json::from_str(json).unwrap();
        assert_eq!(value.raw, Some(150.25));

        let empty: YahooValue = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.raw, None);
    }

    #[test]
    fn test_deserialize_not_found_response() {
        let json = r#"{
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}
            }
        }"#;
        let response: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        assert!(response.quote_summary.result.is_none());
        assert_eq!(
            response.quote_summary.error.and_then(|e| e.code),
            Some("Not Found".to_string())
        );
    }

    #[test]
    fn test_deserialize_financial_data() {
        let json = r#"{
            "currentPrice": {"raw": 320.4, "fmt": "320.40"},
            "debtToEquity": {"raw": 45.2, "fmt": "45.20"},
            "returnOnEquity": {},
            "profitMargins": {"raw": 0.35, "fmt": "35.00%"}
        }"#;
        let data: YahooFinancialData = serde_json::from_str(json).unwrap();
        assert_eq!(raw(&data.current_price), Some(320.4));
        assert_eq!(raw(&data.return_on_equity), None);
        assert_eq!(raw(&data.profit_margins), Some(0.35));
    }

    #[test]
    fn test_deserialize_summary_detail() {
        let json = r#"{
            "previousClose": {"raw": 318.0, "fmt": "318.00"},
            "marketCap": {"raw": 3000000000000, "fmt": "3T"},
            "trailingPE": {"raw": 15.2, "fmt": "15.20"}
        }"#;
        let detail: YahooSummaryDetail = serde_json::from_str(json).unwrap();
        assert_eq!(raw(&detail.previous_close), Some(318.0));
        assert_eq!(raw(&detail.market_cap), Some(3_000_000_000_000.0));
        assert_eq!(raw(&detail.trailing_pe), Some(15.2));
    }
}
