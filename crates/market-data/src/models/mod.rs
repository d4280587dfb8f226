//! Market data models
//!
//! - `snapshot` - The canonical normalized record (Snapshot) and the transient
//!   per-attempt result (FetchAttemptResult)

mod snapshot;

pub use snapshot::{FetchAttemptResult, Snapshot};
