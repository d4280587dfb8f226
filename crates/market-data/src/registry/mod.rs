//! Source registry module.
//!
//! This module tracks the upstream sources, including:
//! - Source descriptors and priority ordering
//! - Minimum-spacing admission per source
//! - Reliability and usage accounting
//! - Snapshot validation and fetch diagnostics

mod diagnostics;
pub mod rate_gate;
mod source_registry;
mod validator;

pub use diagnostics::{FetchDiagnostics, SkipReason, SourceAttempt};
pub use rate_gate::Admission;
pub use source_registry::{SourceDescriptor, SourceRegistry, SourceUsageStats};
pub use validator::{SnapshotValidator, ValidationSeverity, ValidatorConfig};
