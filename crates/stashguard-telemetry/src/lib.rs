//! stashguard Telemetry
//!
//! Audit and statistics for policy decisions.
//!
//! Provides:
//! - A hash-chained audit trail of verdicts and committed ledger entries
//! - In-process evaluation counters

pub mod audit;
pub mod metrics;

pub use audit::{AuditEvent, AuditKind, AuditTrail};
pub use metrics::{MetricsCollector, MetricsSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditKind, AuditTrail};
    pub use crate::metrics::MetricsCollector;
}
