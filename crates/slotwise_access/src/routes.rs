// --- File: crates/slotwise_access/src/routes.rs ---

use crate::handlers::{
    create_user_handler, deactivate_user_handler, get_feature_flags_handler,
    set_feature_flag_handler, update_user_role_handler, AccessState,
};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// User management and feature-flag admin routes, relative to `/api`.
pub fn routes(state: Arc<AccessState>) -> Router {
    Router::new()
        .route("/users", post(create_user_handler))
        .route("/users/{id}/role", put(update_user_role_handler))
        .route("/users/{id}", delete(deactivate_user_handler))
        .route(
            "/admin/feature-flags/{tenant_id}",
            get(get_feature_flags_handler).put(set_feature_flag_handler),
        )
        .with_state(state)
}
