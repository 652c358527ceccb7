// --- File: crates/slotwise_common/src/services.rs ---
//! Service abstractions for external collaborators.
//!
//! The booking orchestrator and the HTTP handlers only see these traits, so the
//! Google implementation can be swapped for fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SlotwiseError;

/// Calendar id used when the caller does not name one.
pub const PRIMARY_CALENDAR: &str = "primary";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Google Calendar is not configured: {0}")]
    Configuration(String),

    #[error("Stored calendar token is unreadable: {0}")]
    Decryption(String),

    #[error("Authorization code exchange failed: {0}")]
    TokenExchange(String),

    /// Upstream failure, carrying the provider's message.
    #[error("{0}")]
    Sync(String),
}

impl From<CalendarError> for SlotwiseError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::Configuration(msg) => SlotwiseError::Configuration(msg),
            CalendarError::Decryption(msg) => SlotwiseError::Decryption(msg),
            CalendarError::TokenExchange(msg) => SlotwiseError::ExternalService {
                service_name: "google-oauth".to_string(),
                message: msg,
            },
            CalendarError::Sync(msg) => SlotwiseError::CalendarSync(msg),
        }
    }
}

/// What the booking flow asks the calendar to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub link: Option<String>,
}

/// A calendar result plus a re-encrypted token when the access token was
/// refreshed during the call. The caller persists `rotated_token`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotated<T> {
    pub value: T,
    pub rotated_token: Option<String>,
}

impl<T> Rotated<T> {
    pub fn unchanged(value: T) -> Self {
        Self {
            value,
            rotated_token: None,
        }
    }
}

/// Remote calendar reachable with a tenant's encrypted OAuth token.
///
/// Implementations never persist tokens; `token_blob` is always the vault
/// ciphertext stored on the tenant row.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Authorization URL requesting calendar scope, offline access and forced consent.
    fn auth_url(&self) -> Result<String, CalendarError>;

    /// Exchanges a one-time code and returns the encrypted token blob.
    async fn tokens_from_code(&self, code: &str) -> Result<String, CalendarError>;

    async fn create_event(
        &self,
        token_blob: &str,
        event: &EventDetails,
        calendar_id: &str,
    ) -> Result<Rotated<CreatedEvent>, CalendarError>;

    /// `true` iff no event overlaps `[time_min, time_max)`.
    async fn check_availability(
        &self,
        token_blob: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        calendar_id: &str,
    ) -> Result<Rotated<bool>, CalendarError>;

    async fn delete_event(
        &self,
        token_blob: &str,
        event_id: &str,
        calendar_id: &str,
    ) -> Result<Rotated<()>, CalendarError>;

    /// Calendar used by booking flows.
    fn calendar_id(&self) -> &str {
        PRIMARY_CALENDAR
    }
}
