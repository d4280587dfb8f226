use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical market snapshot for one symbol.
///
/// Every source adapter and the fallback seed table normalize into this shape.
/// Numeric fields are absent rather than zero when the source did not report
/// them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Symbol as requested by the caller (e.g., "0700.HK")
    pub symbol: String,

    /// Company or instrument name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Business sector (e.g., "Technology")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    /// Industry within sector (e.g., "Internet Content & Information")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Last traded or regular market price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,

    /// Market capitalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,

    /// Trailing price-to-earnings ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_book: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<f64>,

    /// Return on equity as a decimal (0.25 for 25%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_on_equity: Option<f64>,

    /// Profit margin as a decimal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,

    /// Source that produced this snapshot ("fallback" for seed data)
    pub source_name: String,

    /// Stamped from the service clock when the snapshot is handed out;
    /// `new` only fills in a provisional wall-clock value.
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Create a snapshot with only the required fields set.
    pub fn new(symbol: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: None,
            sector: None,
            industry: None,
            current_price: None,
            market_cap: None,
            pe_ratio: None,
            price_to_book: None,
            debt_to_equity: None,
            return_on_equity: None,
            profit_margin: None,
            source_name: source_name.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the display name
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the sector
    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Set the industry
    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Set the current price
    pub fn current_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Whether this snapshot came from the seed table rather than a live source.
    pub fn is_fallback(&self) -> bool {
        self.source_name == crate::fallback::FALLBACK_SOURCE
    }
}

/// Outcome of one adapter invocation inside the orchestrator loop.
#[derive(Clone, Debug)]
pub struct FetchAttemptResult {
    pub success: bool,
    pub snapshot: Option<Snapshot>,
    /// Last error seen when `success` is false.
    pub error: Option<String>,
}

impl FetchAttemptResult {
    pub fn succeeded(snapshot: Snapshot) -> Self {
        Self {
            success: true,
            snapshot: Some(snapshot),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            snapshot: None,
            error: Some(error.into()),
        }
    }
}
