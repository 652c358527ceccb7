// File: crates/slotwise_chat/src/handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use slotwise_common::{json_body, SlotwiseError};
use std::sync::Arc;
use uuid::Uuid;

use crate::agent::{BookingAgent, ChatReply, ChatRequest};

#[derive(Clone)]
pub struct ChatState {
    pub agent: Arc<BookingAgent>,
}

#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/chat/{tenant_id}",
    params(("tenant_id" = Uuid, Path, description = "Tenant whose agent answers")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Agent reply; model failures become an apology", body = ChatReply),
        (status = 400, description = "Malformed body"),
        (status = 404, description = "Tenant not found")
    ),
    tag = "Chat"
))]
pub async fn chat_handler(
    State(state): State<Arc<ChatState>>,
    Path(tenant_id): Path<Uuid>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, SlotwiseError> {
    let request = json_body(request)?;
    state.agent.respond(tenant_id, request).await.map(Json)
}
