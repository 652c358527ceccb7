// File: crates/slotwise_gcal/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{
    AuthUrlResponse, AvailabilityResponse, CheckAvailabilityRequest, ConnectResponse,
    DisconnectRequest, DisconnectResponse, OAuthCallbackRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_url_handler,
        crate::handlers::oauth_callback_handler,
        crate::handlers::check_availability_handler,
        crate::handlers::disconnect_handler
    ),
    components(
        schemas(
            AuthUrlResponse,
            OAuthCallbackRequest,
            ConnectResponse,
            CheckAvailabilityRequest,
            AvailabilityResponse,
            DisconnectRequest,
            DisconnectResponse
        )
    ),
    tags(
        (name = "Calendar", description = "Google Calendar connection per tenant")
    ),
    servers(
        (url = "/api", description = "Slotwise API server")
    )
)]
pub struct GcalApiDoc;
