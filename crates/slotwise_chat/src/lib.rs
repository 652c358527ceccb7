// --- File: crates/slotwise_chat/src/lib.rs ---
//! The chat agent: turns customer messages into bookings through a
//! function-calling model.

pub mod agent;
pub mod doc;
pub mod functions;
pub mod handlers;
pub mod oracle;
pub mod routes;
#[cfg(test)]
mod routes_test;

pub use agent::{BookingAgent, ChatReply, ChatRequest};
pub use handlers::ChatState;
pub use oracle::{ChatOracle, GeminiOracle, OracleError};
