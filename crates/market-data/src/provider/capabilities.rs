//! Rate limiting configuration for source adapters.

/// Request quota published by an upstream source.
///
/// Seeds the source's descriptor in the registry. The quota can be changed
/// later through the admin interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,
}

impl RateLimit {
    pub const fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(60)
    }
}
