//! Symbol handling for upstream sources.
//!
//! Symbols arrive as free-form tickers. They are normalized once at the
//! service boundary, then each adapter expands them into the ticker forms
//! its upstream understands using the rule tables in `symbol_variants`.

mod symbol_variants;

pub use symbol_variants::{
    normalize_symbol, strip_exchange_suffix, symbol_variants, SuffixRewrite, ALPHA_VANTAGE_RULES,
    FINNHUB_RULES, YAHOO_RULES,
};
