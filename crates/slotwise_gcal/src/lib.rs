// --- File: crates/slotwise_gcal/src/lib.rs ---
pub mod adapter;
pub mod auth;
pub mod doc;
pub mod handlers;
pub mod routes;
#[cfg(test)]
mod routes_test;

pub use adapter::GoogleCalendarAdapter;
pub use handlers::{persist_rotated_token, GcalState};
