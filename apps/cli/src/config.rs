use std::collections::{HashMap, HashSet};
use std::time::Duration;

use stockpulse_market_data::MarketDataConfig;

pub struct Config {
    pub alpha_vantage_key: Option<String>,
    pub finnhub_key: String,
    pub market_data: MarketDataConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let alpha_vantage_key = std::env::var("ALPHA_VANTAGE_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let finnhub_key = std::env::var("FINNHUB_API_KEY").unwrap_or_else(|_| "demo".into());

        let mut market_data = MarketDataConfig::default();
        market_data.sweep_interval =
            env_secs("STOCKPULSE_SWEEP_INTERVAL_SECS", market_data.sweep_interval);
        market_data.fallback_ttl =
            env_secs("STOCKPULSE_FALLBACK_TTL_SECS", market_data.fallback_ttl);
        market_data.retry.request_timeout = env_secs(
            "STOCKPULSE_REQUEST_TIMEOUT_SECS",
            market_data.retry.request_timeout,
        );
        market_data.retry.source_deadline = env_secs(
            "STOCKPULSE_SOURCE_DEADLINE_SECS",
            market_data.retry.source_deadline,
        );
        market_data.retry.max_attempts = std::env::var("STOCKPULSE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(market_data.retry.max_attempts);
        market_data.disabled_sources =
            parse_source_list(&std::env::var("STOCKPULSE_DISABLED_SOURCES").unwrap_or_default());
        market_data.source_priorities = parse_source_priorities(
            &std::env::var("STOCKPULSE_SOURCE_PRIORITIES").unwrap_or_default(),
        );

        Self {
            alpha_vantage_key,
            finnhub_key,
            market_data,
        }
    }
}

/// Whole seconds from `key`, or `default` when unset, unparseable or zero.
fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// "yahoo_finance, finnhub" -> {"yahoo_finance", "finnhub"}
fn parse_source_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// "finnhub=1,yahoo_finance=3" -> {"finnhub": 1, "yahoo_finance": 3}
///
/// Malformed pairs are logged and skipped.
fn parse_source_priorities(raw: &str) -> HashMap<String, i32> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let parsed = pair
                .split_once('=')
                .and_then(|(name, prio)| Some((name.trim(), prio.trim().parse::<i32>().ok()?)))
                .filter(|(name, _)| !name.is_empty());
            if parsed.is_none() {
                tracing::warn!("Ignoring malformed source priority '{}'", pair);
            }
            parsed.map(|(name, prio)| (name.to_string(), prio))
        })
        .collect()
}
