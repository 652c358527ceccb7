// --- File: crates/slotwise_gcal/src/routes.rs ---

use crate::handlers::{
    auth_url_handler, check_availability_handler, disconnect_handler, oauth_callback_handler,
    GcalState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Calendar routes, relative to `/api`. The OAuth callback lives in
/// [`callback_routes`] so the caller can put a rate limit on it alone.
pub fn routes(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/calendar/auth-url", get(auth_url_handler))
        .route("/calendar/check-availability", post(check_availability_handler))
        .route("/calendar/disconnect", post(disconnect_handler))
        .with_state(state)
}

pub fn callback_routes(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/calendar/oauth-callback", post(oauth_callback_handler))
        .with_state(state)
}
