// --- File: crates/slotwise_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The error taxonomy shared by every Slotwise crate.
///
/// Client-facing variants display their bare message so handlers can return
/// `{"error": "<message>"}` bodies verbatim. Crate-local errors convert into
/// this type through `From` impls in their own crates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlotwiseError {
    /// Caller lacks the permission or fails tenant isolation.
    #[error("{0}")]
    PermissionDenied(String),

    /// Malformed input. The client must fix and resend.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The remote calendar call failed. Booking flows downgrade this to a flag.
    #[error("Calendar sync failed: {0}")]
    CalendarSync(String),

    /// Tampered or corrupt token blob. Never treated as "no token".
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External service error: {service_name} - {message}")]
    ExternalService {
        service_name: String,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for SlotwiseError {
    fn status_code(&self) -> u16 {
        match self {
            SlotwiseError::PermissionDenied(_) => 403,
            SlotwiseError::Validation(_) => 400,
            SlotwiseError::NotFound(_) => 404,
            SlotwiseError::CalendarSync(_) => 502,
            SlotwiseError::Decryption(_) => 500,
            SlotwiseError::Storage(_) => 500,
            SlotwiseError::Configuration(_) => 500,
            SlotwiseError::ExternalService { .. } => 502,
            SlotwiseError::Internal(_) => 500,
        }
    }
}

impl From<reqwest::Error> for SlotwiseError {
    fn from(err: reqwest::Error) -> Self {
        SlotwiseError::ExternalService {
            service_name: "http".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SlotwiseError {
    fn from(err: serde_json::Error) -> Self {
        SlotwiseError::Validation(err.to_string())
    }
}

pub fn permission_denied<T: fmt::Display>(message: T) -> SlotwiseError {
    SlotwiseError::PermissionDenied(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> SlotwiseError {
    SlotwiseError::Validation(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> SlotwiseError {
    SlotwiseError::NotFound(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> SlotwiseError {
    SlotwiseError::ExternalService {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> SlotwiseError {
    SlotwiseError::Internal(message.to_string())
}
