// --- File: crates/slotwise_chat/src/routes.rs ---

use crate::handlers::{chat_handler, ChatState};
use axum::{routing::post, Router};
use std::sync::Arc;

pub fn routes(state: Arc<ChatState>) -> Router {
    Router::new()
        .route("/chat/{tenant_id}", post(chat_handler))
        .with_state(state)
}
