//! Per-fetch record of which sources were tried and why.

use std::time::Duration;

use serde::Serialize;

/// Why a source was passed over without being called.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    /// Switched off by configuration or an admin call.
    Disabled,

    /// Called too recently for its quota.
    RateLimited {
        #[serde(rename = "retryAfterMs", serialize_with = "serialize_millis")]
        retry_after: Duration,
    },

    /// Registered in the registry but no adapter is wired up for it.
    NoAdapter,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Record of a single source during a fetch.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttempt {
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

/// Detailed trace of one `fetch` call.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDiagnostics {
    pub attempts: Vec<SourceAttempt>,
    /// Served from the cache without contacting any source.
    pub from_cache: bool,
    /// Every source was skipped or failed and seed data was returned.
    pub used_fallback: bool,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, source_name: &str, reason: SkipReason) {
        self.attempts.push(SourceAttempt {
            source_name: source_name.to_string(),
            skipped: Some(reason),
            error: None,
            success: false,
        });
    }

    pub fn record_error(&mut self, source_name: &str, error: impl Into<String>) {
        self.attempts.push(SourceAttempt {
            source_name: source_name.to_string(),
            skipped: None,
            error: Some(error.into()),
            success: false,
        });
    }

    pub fn record_success(&mut self, source_name: &str) {
        self.attempts.push(SourceAttempt {
            source_name: source_name.to_string(),
            skipped: None,
            error: None,
            success: true,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        if self.from_cache {
            return "cache: HIT".to_string();
        }

        let mut parts: Vec<String> = self
            .attempts
            .iter()
            .map(|a| {
                if a.success {
                    format!("{}: SUCCESS", a.source_name)
                } else if let Some(skip) = &a.skipped {
                    format!("{}: SKIPPED ({:?})", a.source_name, skip)
                } else if let Some(err) = &a.error {
                    format!("{}: ERROR ({})", a.source_name, err)
                } else {
                    format!("{}: UNKNOWN", a.source_name)
                }
            })
            .collect();

        if self.used_fallback {
            parts.push("fallback: USED".to_string());
        }
        parts.join(" -> ")
    }

    /// Check if any source succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts.iter().any(|a| a.success)
    }

    /// Names of the sources that were actually called, in order.
    pub fn attempted(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter(|a| a.skipped.is_none())
            .map(|a| a.source_name.as_str())
            .collect()
    }

    /// Get all skip reasons.
    pub fn skip_reasons(&self) -> Vec<(&str, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.skipped.as_ref().map(|s| (a.source_name.as_str(), s)))
            .collect()
    }
}
