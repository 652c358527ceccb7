// --- File: crates/slotwise_common/src/lib.rs ---

pub mod availability; // Shared range-overlap predicate
pub mod error;        // Error taxonomy
pub mod http;         // HTTP error mapping and outbound client
pub mod logging;      // Logging utilities
pub mod models;       // Domain records
pub mod services;     // External service abstractions

pub use error::{
    external_service_error, internal_error, not_found, permission_denied, validation_error,
    HttpStatusCode, SlotwiseError,
};

pub use http::{
    client::{create_client, HTTP_CLIENT},
    error_body, json_body, query_params, set_detailed_errors, IntoHttpResponse,
};

pub use logging::{init, init_with_level};

pub use availability::{is_window_free, windows_overlap};
