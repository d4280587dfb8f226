//! Source-specific ticker formats.
//!
//! Upstreams disagree on how exchange-qualified tickers are written
//! (`700.HK` vs `0700.HK`, `.SH` vs `.SS`, bare codes). Each source owns a
//! static list of suffix rewrites; [`symbol_variants`] expands a symbol into
//! the ordered candidates a source should be asked for.

/// One rewrite of an exchange suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuffixRewrite {
    /// Swap one suffix for another (`.SH` -> `.SS`).
    Replace {
        from: &'static str,
        to: &'static str,
    },
    /// Drop the suffix entirely (`0700.HK` -> `0700`).
    Strip { suffix: &'static str },
    /// Left-pad a numeric code with zeros (`700.HK` -> `0700.HK`).
    PadCode { suffix: &'static str, width: usize },
}

impl SuffixRewrite {
    /// Apply the rewrite, or `None` when the symbol does not carry the suffix.
    pub fn apply(&self, symbol: &str) -> Option<String> {
        match *self {
            Self::Replace { from, to } => symbol
                .strip_suffix(from)
                .map(|code| format!("{}{}", code, to)),
            Self::Strip { suffix } => symbol
                .strip_suffix(suffix)
                .filter(|code| !code.is_empty())
                .map(str::to_string),
            Self::PadCode { suffix, width } => {
                let code = symbol.strip_suffix(suffix)?;
                if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                Some(format!("{:0>width$}{}", code, suffix, width = width))
            }
        }
    }
}

/// Yahoo Finance wants four-digit Hong Kong codes and `.SS` for Shanghai.
pub const YAHOO_RULES: &[SuffixRewrite] = &[
    SuffixRewrite::PadCode {
        suffix: ".HK",
        width: 4,
    },
    SuffixRewrite::Replace {
        from: ".SH",
        to: ".SS",
    },
];

/// Alpha Vantage lists Hong Kong codes bare or with `.HKG`.
pub const ALPHA_VANTAGE_RULES: &[SuffixRewrite] = &[
    SuffixRewrite::Strip { suffix: ".HK" },
    SuffixRewrite::Replace {
        from: ".HK",
        to: ".HKG",
    },
];

/// Finnhub's free tier only knows bare Hong Kong codes.
pub const FINNHUB_RULES: &[SuffixRewrite] = &[SuffixRewrite::Strip { suffix: ".HK" }];

/// Candidate symbols for a source: `symbol` first, then each rewrite that
/// applies, without duplicates.
pub fn symbol_variants(symbol: &str, rules: &[SuffixRewrite]) -> Vec<String> {
    let mut variants = vec![symbol.to_string()];
    for rule in rules {
        if let Some(candidate) = rule.apply(symbol) {
            if !variants.contains(&candidate) {
                variants.push(candidate);
            }
        }
    }
    variants
}

/// Trim and upper-case a user-supplied symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Strip the exchange suffix (everything from the last dot).
///
/// ```
/// use stockpulse_market_data::resolver::strip_exchange_suffix;
///
/// assert_eq!(strip_exchange_suffix("0700.HK"), "0700");
/// assert_eq!(strip_exchange_suffix("AAPL"), "AAPL");
/// ```
pub fn strip_exchange_suffix(symbol: &str) -> &str {
    match symbol.rfind('.') {
        Some(pos) if pos > 0 => &symbol[..pos],
        _ => symbol,
    }
}
