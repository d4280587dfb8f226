//! Snapshot validation.
//!
//! A normalized snapshot is usable only if it carries a price or a name.
//! Beyond that minimum, obviously broken numbers are rejected and
//! implausible ones are logged.

use log::warn;

use crate::errors::MarketDataError;
use crate::models::Snapshot;

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Reject the snapshot, try the next variant or source.
    Hard,
    /// Accept the snapshot but log a warning.
    Soft,
}

#[derive(Clone, Debug)]
struct ValidationIssue {
    severity: ValidationSeverity,
    message: String,
}

/// Validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Prices above this are logged as suspicious.
    pub max_price: Option<f64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_price: Some(1_000_000_000.0),
        }
    }
}

/// Checks adapter output before it is accepted.
pub struct SnapshotValidator {
    config: ValidatorConfig,
}

impl SnapshotValidator {
    pub fn new() -> Self {
        Self {
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate a snapshot.
    ///
    /// Fails when the snapshot has neither a positive price nor a non-empty
    /// display name, or when the price is negative or not finite.
    pub fn validate(&self, snapshot: &Snapshot) -> Result<(), MarketDataError> {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        self.validate_price(snapshot, &mut issues);
        self.validate_identity(snapshot, &mut issues);
        self.validate_ratios(snapshot, &mut issues);

        let errors: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();

        if !errors.is_empty() {
            return Err(MarketDataError::ValidationFailed {
                message: errors.join("; "),
            });
        }

        for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
            warn!(
                "Snapshot validation warning for {}: {}",
                snapshot.symbol, issue.message
            );
        }

        Ok(())
    }

    fn validate_price(&self, snapshot: &Snapshot, issues: &mut Vec<ValidationIssue>) {
        let Some(price) = snapshot.current_price else {
            return;
        };

        if !price.is_finite() {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Non-finite price: {}", price),
            });
        } else if price < 0.0 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Negative price: {}", price),
            });
        } else if let Some(max_price) = self.config.max_price {
            if price > max_price {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Soft,
                    message: format!("Price ({}) exceeds max threshold ({})", price, max_price),
                });
            }
        }
    }

    fn validate_identity(&self, snapshot: &Snapshot, issues: &mut Vec<ValidationIssue>) {
        let has_price = snapshot
            .current_price
            .is_some_and(|p| p.is_finite() && p > 0.0);
        let has_name = snapshot
            .display_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());

        if !has_price && !has_name {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: "Neither a price nor a name was returned".to_string(),
            });
        }
    }

    fn validate_ratios(&self, snapshot: &Snapshot, issues: &mut Vec<ValidationIssue>) {
        if let Some(market_cap) = snapshot.market_cap {
            if market_cap < 0.0 {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Soft,
                    message: format!("Negative market cap: {}", market_cap),
                });
            }
        }

        if let Some(pb) = snapshot.price_to_book {
            if pb < 0.0 {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Soft,
                    message: format!("Negative price-to-book: {}", pb),
                });
            }
        }
    }
}

impl Default for SnapshotValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_only_is_valid() {
        let validator = SnapshotValidator::new();
        let snapshot = Snapshot::new("AAPL", "finnhub").current_price(189.5);
        assert!(validator.validate(&snapshot).is_ok());
    }

    #[test]
    fn test_name_only_is_valid() {
        let validator = SnapshotValidator::new();
        let snapshot = Snapshot::new("0700.HK", "alpha_vantage").display_name("Tencent");
        assert!(validator.validate(&snapshot).is_ok());
    }

    #[test]
    fn test_empty_snapshot_is_rejected() {
        let validator = SnapshotValidator::new();
        let snapshot = Snapshot::new("ZZZ", "yahoo_finance").display_name("  ");

        let result = validator.validate(&snapshot);
        assert!(matches!(
            result,
            Err(MarketDataError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_zero_price_without_name_is_rejected() {
        let validator = SnapshotValidator::new();
        let snapshot = Snapshot::new("ZZZ", "finnhub").current_price(0.0);
        assert!(validator.validate(&snapshot).is_err());
    }

    #[test]
    fn test_negative_or_nan_price_is_rejected() {
        let validator = SnapshotValidator::new();

        let negative = Snapshot::new("AAA", "finnhub")
            .display_name("Named")
            .current_price(-1.0);
        assert!(validator.validate(&negative).is_err());

        let nan = Snapshot::new("AAA", "finnhub")
            .display_name("Named")
            .current_price(f64::NAN);
        assert!(validator.validate(&nan).is_err());
    }

    #[test]
    fn test_huge_price_is_only_a_warning() {
        let validator = SnapshotValidator::with_config(ValidatorConfig {
            max_price: Some(1000.0),
        });
        let snapshot = Snapshot::new("BRK-A", "yahoo_finance").current_price(600_000.0);
        assert!(validator.validate(&snapshot).is_ok());
    }
}
