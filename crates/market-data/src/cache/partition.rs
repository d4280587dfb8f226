//! Well-known cache partitions and their default TTLs.

use std::collections::HashMap;
use std::time::Duration;

pub const STOCK_INFO: &str = "stock_info";
pub const PRICE_DATA: &str = "price_data";
pub const FINANCIAL_DATA: &str = "financial_data";
pub const NEWS: &str = "news";
pub const ECONOMIC_INDICATORS: &str = "economic_indicators";
pub const SECTOR_PERFORMANCE: &str = "sector_performance";
pub const ANALYSIS_RESULT: &str = "analysis_result";

/// TTL applied to partitions that were never configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Partitions keyed by symbol, cleared together by `invalidate_related`.
pub const SYMBOL_KEYED_PARTITIONS: [&str; 5] =
    [STOCK_INFO, PRICE_DATA, FINANCIAL_DATA, NEWS, ANALYSIS_RESULT];

const HOUR: u64 = 60 * 60;

/// Default TTL per well-known partition.
pub fn default_partition_ttls() -> HashMap<String, Duration> {
    [
        (STOCK_INFO, Duration::from_secs(HOUR)),
        (PRICE_DATA, Duration::from_secs(4 * HOUR)),
        (FINANCIAL_DATA, Duration::from_secs(24 * HOUR)),
        (NEWS, Duration::from_secs(30 * 60)),
        (ECONOMIC_INDICATORS, Duration::from_secs(12 * HOUR)),
        (SECTOR_PERFORMANCE, Duration::from_secs(12 * HOUR)),
        (ANALYSIS_RESULT, Duration::from_secs(HOUR)),
    ]
    .into_iter()
    .map(|(name, ttl)| (name.to_string(), ttl))
    .collect()
}
