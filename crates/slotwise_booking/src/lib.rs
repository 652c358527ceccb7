// --- File: crates/slotwise_booking/src/lib.rs ---
//! Appointment booking: permission check, non-fatal calendar sync,
//! persistence and audit, shared by the dashboard API and the chat agent.

pub mod doc;
pub mod handlers;
pub mod orchestrator;
pub mod routes;
#[cfg(test)]
pub(crate) mod test_support;

pub use handlers::BookingState;
pub use orchestrator::{BookingOrchestrator, Caller, CreatedAppointment, DEFAULT_DURATION_MINUTES};
