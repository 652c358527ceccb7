// File: crates/slotwise_chat/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::agent::{ChatReply, ChatRequest};
use slotwise_common::models::{ChatRole, ChatTurn};

#[derive(OpenApi)]
#[openapi(
    paths(crate::handlers::chat_handler),
    components(schemas(ChatRequest, ChatReply, ChatTurn, ChatRole)),
    tags(
        (name = "Chat", description = "Conversational booking agent")
    ),
    servers(
        (url = "/api", description = "Slotwise API server")
    )
)]
pub struct ChatApiDoc;
