//! Minimum-spacing admission rule for upstream sources.
//!
//! A source quoted at N requests per minute is admitted at most once every
//! `60s / N`. There is no burst allowance: admissions are only bounded by
//! the spacing between consecutive requests.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::source_registry::SourceDescriptor;
use crate::clock::elapsed_between;

const NANOS_PER_MINUTE: u64 = 60_000_000_000;

/// Outcome of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The source may be called now. Its `last_request_at` has been stamped.
    Admitted,
    /// The source is switched off.
    Disabled,
    /// The source was called too recently.
    Throttled { retry_after: Duration },
    /// No source with that name is registered.
    Unknown,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Minimum spacing between two requests to a source.
///
/// Rounded up to the next nanosecond so that N spaced requests never fit
/// into less than a minute. A quota of zero is treated as one per minute.
pub fn min_interval(requests_per_minute: u32) -> Duration {
    let rpm = u64::from(requests_per_minute.max(1));
    Duration::from_nanos(NANOS_PER_MINUTE.div_ceil(rpm))
}

/// Evaluate the admission rule for `source` at `now` without mutating it.
pub fn check(source: &SourceDescriptor, now: DateTime<Utc>) -> Admission {
    if !source.enabled {
        return Admission::Disabled;
    }

    let Some(last) = source.last_request_at else {
        return Admission::Admitted;
    };

    let spacing = min_interval(source.requests_per_minute);
    let elapsed = elapsed_between(last, now);
    if elapsed >= spacing {
        Admission::Admitted
    } else {
        Admission::Throttled {
            retry_after: spacing - elapsed,
        }
    }
}
