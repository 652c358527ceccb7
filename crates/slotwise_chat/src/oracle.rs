// --- File: crates/slotwise_chat/src/oracle.rs ---
//! The function-calling model behind the agent.
//!
//! [`ChatOracle`] is the seam the agent talks to; [`GeminiOracle`] speaks the
//! `generateContent` REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotwise_common::models::{ChatRole, ChatTurn};
use slotwise_common::{create_client, external_service_error, SlotwiseError};
use slotwise_config::AiConfig;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Oracle returned an error: {message} (Status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Failed to parse oracle response: {0}")]
    Parse(String),

    #[error("Oracle configuration missing or incomplete: {0}")]
    Configuration(String),
}

impl From<OracleError> for SlotwiseError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Configuration(msg) => SlotwiseError::Configuration(msg),
            other => external_service_error("oracle", other),
        }
    }
}

/// A function the model may ask us to run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub system_instruction: String,
    pub contents: Vec<ChatTurn>,
    pub functions: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OracleReply {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
    pub tokens_used: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatOracle: Send + Sync {
    async fn generate(&self, request: OracleRequest) -> Result<OracleReply, OracleError>;
}

// --- generateContent wire types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    function_call: Option<FunctionCallPayload>,
}

#[derive(Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: u64,
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn build_request(request: OracleRequest) -> GenerateContentRequest {
    let tools = if request.functions.is_empty() {
        Vec::new()
    } else {
        vec![Tool {
            function_declarations: request.functions,
        }]
    };
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![TextPart {
                text: request.system_instruction,
            }],
        },
        contents: request
            .contents
            .into_iter()
            .map(|turn| Content {
                role: Some(wire_role(turn.role)),
                parts: vec![TextPart { text: turn.text }],
            })
            .collect(),
        tools,
    }
}

fn parse_reply(payload: GenerateContentResponse) -> Result<OracleReply, OracleError> {
    let candidate = payload
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Parse("response has no candidates".to_string()))?;

    let mut reply = OracleReply {
        tokens_used: payload
            .usage_metadata
            .map(|u| u.total_token_count)
            .unwrap_or_default(),
        ..OracleReply::default()
    };
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            reply.text.push_str(&text);
        }
        if let Some(call) = part.function_call {
            reply.function_calls.push(FunctionCall {
                name: call.name,
                args: call.args,
            });
        }
    }
    Ok(reply)
}

/// Google Gemini over REST.
pub struct GeminiOracle {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiOracle")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiOracle {
    pub fn from_config(config: &AiConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| OracleError::Configuration("ai.api_key is not set".to_string()))?;
        Ok(Self {
            client: create_client(config.timeout_secs)?,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }
}

#[async_trait]
impl ChatOracle for GeminiOracle {
    async fn generate(&self, request: OracleRequest) -> Result<OracleReply, OracleError> {
        let body = build_request(request);
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".into());
            error!(status_code, "Oracle call failed: {}", message);
            return Err(OracleError::Api {
                status_code,
                message,
            });
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;
        let reply = parse_reply(payload)?;
        debug!(
            calls = reply.function_calls.len(),
            tokens = reply.tokens_used,
            "Oracle replied"
        );
        Ok(reply)
    }
}
