// --- File: crates/slotwise_access/src/lib.rs ---
//! Access control for Slotwise: RBAC with a super-admin flag, tenant
//! isolation, a bounded audit queue and datastore-backed feature flags.

pub mod audit;
pub mod doc;
pub mod feature_flags;
pub mod gate;
pub mod handlers;
pub mod routes;

pub use audit::{AuditLogger, DEFAULT_QUEUE_CAPACITY};
pub use feature_flags::FeatureFlagService;
pub use gate::{AccessGate, NewUser};
pub use handlers::{require_identity, AccessState};
