//! Static seed data served when no live source answers.
//!
//! Snapshots built here carry `source_name == "fallback"` so callers can
//! tell synthetic data from live data.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::models::Snapshot;
use crate::resolver::strip_exchange_suffix;

/// `source_name` of every seed snapshot.
pub const FALLBACK_SOURCE: &str = "fallback";

/// Symbol used for blank requests.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Reference figures for a well-known listing.
#[derive(Debug, Clone, Copy)]
struct SeedRecord {
    name: &'static str,
    sector: &'static str,
    industry: &'static str,
    price: f64,
    market_cap: f64,
    pe_ratio: f64,
    price_to_book: f64,
    return_on_equity: f64,
    profit_margin: f64,
}

lazy_static! {
    static ref SEED_RECORDS: HashMap<&'static str, SeedRecord> = {
        let records = [
            ("0700.HK", SeedRecord {
                name: "Tencent Holdings Ltd",
                sector: "Technology",
                industry: "Internet Services",
                price: 320.0,
                market_cap: 3.0e12,
                pe_ratio: 15.2,
                price_to_book: 3.8,
                return_on_equity: 0.25,
                profit_margin: 0.35,
            }),
            ("0005.HK", SeedRecord {
                name: "HSBC Holdings plc",
                sector: "Financials",
                industry: "Banks",
                price: 65.0,
                market_cap: 1.2e12,
                pe_ratio: 8.5,
                price_to_book: 0.9,
                return_on_equity: 0.12,
                profit_margin: 0.28,
            }),
            ("0941.HK", SeedRecord {
                name: "China Mobile Limited",
                sector: "Communication Services",
                industry: "Telecommunications",
                price: 45.0,
                market_cap: 9.0e11,
                pe_ratio: 12.0,
                price_to_book: 1.2,
                return_on_equity: 0.15,
                profit_margin: 0.20,
            }),
            ("1398.HK", SeedRecord {
                name: "Industrial and Commercial Bank of China Limited",
                sector: "Financials",
                industry: "Banks",
                price: 4.2,
                market_cap: 1.5e12,
                pe_ratio: 5.8,
                price_to_book: 0.7,
                return_on_equity: 0.14,
                profit_margin: 0.35,
            }),
            ("3988.HK", SeedRecord {
                name: "Bank of China Limited",
                sector: "Financials",
                industry: "Banks",
                price: 3.1,
                market_cap: 9.0e11,
                pe_ratio: 5.2,
                price_to_book: 0.6,
                return_on_equity: 0.12,
                profit_margin: 0.30,
            }),
            ("0003.HK", SeedRecord {
                name: "The Hong Kong and China Gas Company Limited",
                sector: "Utilities",
                industry: "Gas Utilities",
                price: 8.5,
                market_cap: 4.0e11,
                pe_ratio: 18.0,
                price_to_book: 2.1,
                return_on_equity: 0.11,
                profit_margin: 0.25,
            }),
            ("0100.HK", SeedRecord {
                name: "Clear Media Limited",
                sector: "Communication Services",
                industry: "Media",
                price: 0.85,
                market_cap: 8.0e9,
                pe_ratio: 12.5,
                price_to_book: 1.8,
                return_on_equity: 0.14,
                profit_margin: 0.18,
            }),
        ];
        records.into_iter().collect()
    };

    /// Listings for which only a display name is known.
    static ref SEED_NAMES: HashMap<&'static str, &'static str> = [
        ("0939.HK", "China Construction Bank Corporation"),
        ("2318.HK", "Ping An Insurance (Group) Company of China, Ltd."),
        ("1299.HK", "AIA Group Limited"),
        ("0388.HK", "Hong Kong Exchanges and Clearing Limited"),
        ("9988.HK", "Alibaba Group Holding Limited"),
        ("1024.HK", "Kuaishou Technology"),
        ("0007.HK", "Wisdom Wealth Resources Investment Holding Group Limited"),
    ]
    .into_iter()
    .collect();
}

/// Build the seed snapshot for `symbol`.
///
/// Known listings get their reference figures. Anything else gets a
/// snapshot named after the bare ticker with every numeric field absent.
pub fn fallback_snapshot(symbol: &str) -> Snapshot {
    let symbol = if symbol.trim().is_empty() {
        UNKNOWN_SYMBOL
    } else {
        symbol
    };

    if let Some(record) = SEED_RECORDS.get(symbol) {
        let mut snapshot = Snapshot::new(symbol, FALLBACK_SOURCE)
            .display_name(record.name)
            .sector(record.sector)
            .industry(record.industry)
            .current_price(record.price);
        snapshot.market_cap = Some(record.market_cap);
        snapshot.pe_ratio = Some(record.pe_ratio);
        snapshot.price_to_book = Some(record.price_to_book);
        snapshot.return_on_equity = Some(record.return_on_equity);
        snapshot.profit_margin = Some(record.profit_margin);
        return snapshot;
    }

    let name: &str = match SEED_NAMES.get(symbol) {
        Some(name) => name,
        None => strip_exchange_suffix(symbol),
    };

    Snapshot::new(symbol, FALLBACK_SOURCE).display_name(name)
}

/// Whether the seed table has any data for `symbol`.
pub fn is_seeded(symbol: &str) -> bool {
    SEED_RECORDS.contains_key(symbol) || SEED_NAMES.contains_key(symbol)
}
