//! Registry of upstream sources and their admission state.
//!
//! The registry owns one [`SourceDescriptor`] per source. The admission
//! check and the `last_request_at` stamp happen under the same lock, so two
//! concurrent fetches can never both be admitted to a source in the same
//! spacing window.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use super::rate_gate::{self, Admission};
use crate::clock::Clock;
use crate::errors::AdminError;
use crate::provider::SourceAdapter;

/// Reliability gained on a successful attempt.
const RELIABILITY_REWARD: f64 = 0.01;

/// Reliability lost on a failed attempt.
const RELIABILITY_PENALTY: f64 = 0.05;

/// Mutable state of one upstream source.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub name: String,
    /// Lower is tried first.
    pub priority: i32,
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub last_request_at: Option<DateTime<Utc>>,
    /// Recent success estimate in [0, 1]. Informational only.
    pub reliability: f64,
}

impl SourceDescriptor {
    /// Descriptor seeded from an adapter's defaults.
    pub fn from_adapter(adapter: &dyn SourceAdapter) -> Self {
        Self {
            name: adapter.name().to_string(),
            priority: adapter.priority(),
            enabled: true,
            requests_per_minute: adapter.rate_limit().requests_per_minute.max(1),
            last_request_at: None,
            reliability: adapter.initial_reliability().clamp(0.0, 1.0),
        }
    }
}

/// Aggregate usage of all sources since process start.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUsageStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Success rate formatted for display, e.g. "80.0%".
    pub success_rate: String,
    /// Successful fetches per source.
    pub source_usage: BTreeMap<String, u64>,
    /// Current state of every source, in priority order.
    pub sources: Vec<SourceDescriptor>,
}

#[derive(Debug, Default)]
struct UsageCounters {
    total: u64,
    successful: u64,
    failed: u64,
    per_source: HashMap<String, u64>,
}

#[derive(Debug, Default)]
struct RegistryState {
    sources: Vec<SourceDescriptor>,
    usage: UsageCounters,
}

impl RegistryState {
    fn find_mut(&mut self, name: &str) -> Result<&mut SourceDescriptor, AdminError> {
        self.sources
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| AdminError::UnknownSource(name.to_string()))
    }
}

/// Thread-safe set of [`SourceDescriptor`]s.
pub struct SourceRegistry {
    state: Mutex<RegistryState>,
    clock: Arc<dyn Clock>,
}

impl SourceRegistry {
    /// Create a registry from explicit descriptors.
    ///
    /// A descriptor whose name was already seen is ignored.
    pub fn new(descriptors: Vec<SourceDescriptor>, clock: Arc<dyn Clock>) -> Self {
        let mut sources: Vec<SourceDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if sources.iter().any(|s| s.name == descriptor.name) {
                warn!("Duplicate source '{}' ignored", descriptor.name);
                continue;
            }
            sources.push(descriptor);
        }

        Self {
            state: Mutex::new(RegistryState {
                sources,
                usage: UsageCounters::default(),
            }),
            clock,
        }
    }

    /// Create a registry from adapters with user overrides.
    ///
    /// Priorities in `priorities` replace the adapter defaults. Sources named
    /// in `disabled` start disabled. Overrides for unknown sources are logged
    /// and ignored.
    pub fn with_overrides(
        adapters: &[Arc<dyn SourceAdapter>],
        priorities: &HashMap<String, i32>,
        disabled: &HashSet<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let descriptors: Vec<SourceDescriptor> = adapters
            .iter()
            .map(|adapter| {
                let mut descriptor = SourceDescriptor::from_adapter(adapter.as_ref());
                if let Some(priority) = priorities.get(&descriptor.name) {
                    descriptor.priority = *priority;
                }
                if disabled.contains(&descriptor.name) {
                    descriptor.enabled = false;
                }
                descriptor
            })
            .collect();

        for name in priorities.keys().chain(disabled.iter()) {
            if !descriptors.iter().any(|d| &d.name == name) {
                warn!("Override for unknown source '{}' ignored", name);
            }
        }

        Self::new(descriptors, clock)
    }

    /// Lock the registry state, recovering from poison if necessary.
    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Source registry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Copy of every descriptor, sorted by ascending priority.
    ///
    /// The sort is stable: sources with equal priority keep registration
    /// order.
    pub fn ordered(&self) -> Vec<SourceDescriptor> {
        let mut sources = self.lock_state().sources.clone();
        sources.sort_by_key(|s| s.priority);
        sources
    }

    /// Copy of one descriptor.
    pub fn get(&self, name: &str) -> Option<SourceDescriptor> {
        self.lock_state()
            .sources
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Check admission for `name` and, if admitted, stamp `last_request_at`.
    ///
    /// Never waits. A throttled source reports how long until it would be
    /// admitted.
    pub fn try_admit(&self, name: &str) -> Admission {
        let now = self.clock.now();
        let mut state = self.lock_state();

        let Some(source) = state.sources.iter_mut().find(|s| s.name == name) else {
            return Admission::Unknown;
        };

        let admission = rate_gate::check(source, now);
        if admission.is_admitted() {
            source.last_request_at = Some(now);
        }
        debug!("Admission for '{}': {:?}", name, admission);
        admission
    }

    /// Record the result of an admitted attempt.
    ///
    /// Adjusts reliability and the usage counters. Unknown names are ignored.
    pub fn record_outcome(&self, name: &str, success: bool) {
        let mut state = self.lock_state();

        let Some(source) = state.sources.iter_mut().find(|s| s.name == name) else {
            warn!("Outcome for unknown source '{}' ignored", name);
            return;
        };

        let delta = if success {
            RELIABILITY_REWARD
        } else {
            -RELIABILITY_PENALTY
        };
        source.reliability = (source.reliability + delta).clamp(0.0, 1.0);
        let reliability = source.reliability;

        state.usage.total += 1;
        if success {
            state.usage.successful += 1;
            *state.usage.per_source.entry(name.to_string()).or_insert(0) += 1;
        } else {
            state.usage.failed += 1;
        }

        debug!(
            "Source '{}' {} (reliability now {:.2})",
            name,
            if success { "succeeded" } else { "failed" },
            reliability
        );
    }

    /// Enable or disable a source.
    pub fn enable(&self, name: &str, enabled: bool) -> Result<(), AdminError> {
        let mut state = self.lock_state();
        state.find_mut(name)?.enabled = enabled;
        info!(
            "Source '{}' {}",
            name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Change the priority of a source. Takes effect on the next fetch.
    pub fn set_priority(&self, name: &str, priority: i32) -> Result<(), AdminError> {
        let mut state = self.lock_state();
        state.find_mut(name)?.priority = priority;
        info!("Source '{}' priority set to {}", name, priority);
        Ok(())
    }

    /// Change the request quota of a source.
    pub fn set_rate_limit(&self, name: &str, requests_per_minute: u32) -> Result<(), AdminError> {
        if requests_per_minute == 0 {
            return Err(AdminError::InvalidRateLimit {
                source_name: name.to_string(),
            });
        }

        let mut state = self.lock_state();
        state.find_mut(name)?.requests_per_minute = requests_per_minute;
        info!(
            "Source '{}' limited to {} requests/minute",
            name, requests_per_minute
        );
        Ok(())
    }

    /// Usage counters plus the current state of every source.
    pub fn usage_stats(&self) -> SourceUsageStats {
        let state = self.lock_state();
        let usage = &state.usage;

        let rate = if usage.total > 0 {
            usage.successful as f64 / usage.total as f64
        } else {
            0.0
        };

        let mut sources = state.sources.clone();
        sources.sort_by_key(|s| s.priority);

        SourceUsageStats {
            total_requests: usage.total,
            successful_requests: usage.successful,
            failed_requests: usage.failed,
            success_rate: format!("{:.1}%", rate * 100.0),
            source_usage: usage
                .per_source
                .iter()
                .map(|(name, count)| (name.clone(), *count))
                .collect(),
            sources,
        }
    }
}
