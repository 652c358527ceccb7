#[cfg(test)]
mod tests {
    use crate::agent::BookingAgent;
    use crate::handlers::ChatState;
    use crate::oracle::{MockChatOracle, OracleReply};
    use crate::routes::routes;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use slotwise_access::{AccessGate, AuditLogger, FeatureFlagService};
    use slotwise_booking::BookingOrchestrator;
    use slotwise_common::models::{PlanTier, Tenant};
    use slotwise_config::ChatConfig;
    use slotwise_db::{Datastore, MemoryDatastore};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(store: Arc<MemoryDatastore>, oracle: MockChatOracle) -> Router {
        let (audit, _writer) = AuditLogger::spawn(store.clone(), 16);
        let flags = FeatureFlagService::new(store.clone());
        let orchestrator = Arc::new(BookingOrchestrator::new(
            store.clone(),
            Arc::new(AccessGate::new(store.clone(), audit)),
            flags.clone(),
            None,
        ));
        let agent = BookingAgent::new(
            store,
            flags,
            orchestrator,
            Some(Arc::new(oracle)),
            ChatConfig::default(),
        );
        routes(Arc::new(ChatState {
            agent: Arc::new(agent),
        }))
    }

    async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn reply_uses_camel_case_fields() {
        let store = Arc::new(MemoryDatastore::new());
        let tenant = Tenant::new("Studio Nord", PlanTier::Silver);
        store.insert_tenant(&tenant).await.unwrap();
        let mut oracle = MockChatOracle::new();
        oracle.expect_generate().times(1).returning(|_| {
            Ok(OracleReply {
                text: "Hello!".into(),
                function_calls: vec![],
                tokens_used: 7,
            })
        });

        let (status, body) = post(
            &app(store, oracle),
            &format!("/chat/{}", tenant.id),
            json!({
                "message": "hi",
                "history": [{ "role": "assistant", "text": "Welcome" }],
                "customerPhone": "+41790000000"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "response": "Hello!", "sendPromo": false, "tokensUsed": 7 })
        );
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let mut oracle = MockChatOracle::new();
        oracle.expect_generate().never();
        let (status, body) = post(
            &app(Arc::new(MemoryDatastore::new()), oracle),
            &format!("/chat/{}", Uuid::new_v4()),
            json!({ "message": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Tenant not found" }));
    }
}
