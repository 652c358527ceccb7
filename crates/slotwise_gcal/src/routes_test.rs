#[cfg(test)]
mod tests {
    use crate::handlers::GcalState;
    use crate::routes::{callback_routes, routes};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};
    use slotwise_common::models::{PlanTier, Tenant};
    use slotwise_common::services::{
        CalendarError, CalendarProvider, CreatedEvent, EventDetails, Rotated,
    };
    use slotwise_db::{Datastore, MemoryDatastore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Scripted calendar that counts every remote call.
    #[derive(Default)]
    struct FakeCalendar {
        calls: AtomicUsize,
        busy: bool,
        rotate_to: Option<String>,
    }

    #[async_trait]
    impl CalendarProvider for FakeCalendar {
        fn auth_url(&self) -> Result<String, CalendarError> {
            Ok("https://accounts.google.com/o/oauth2/v2/auth?client_id=x".to_string())
        }

        async fn tokens_from_code(&self, code: &str) -> Result<String, CalendarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sealed:{code}"))
        }

        async fn create_event(
            &self,
            _token_blob: &str,
            _event: &EventDetails,
            _calendar_id: &str,
        ) -> Result<Rotated<CreatedEvent>, CalendarError> {
            unreachable!("not used by calendar routes")
        }

        async fn check_availability(
            &self,
            _token_blob: &str,
            _time_min: DateTime<Utc>,
            _time_max: DateTime<Utc>,
            _calendar_id: &str,
        ) -> Result<Rotated<bool>, CalendarError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Rotated {
                value: !self.busy,
                rotated_token: self.rotate_to.clone(),
            })
        }

        async fn delete_event(
            &self,
            _token_blob: &str,
            _event_id: &str,
            _calendar_id: &str,
        ) -> Result<Rotated<()>, CalendarError> {
            unreachable!("not used by calendar routes")
        }
    }

    fn app(calendar: Arc<FakeCalendar>, store: Arc<MemoryDatastore>) -> Router {
        let state = Arc::new(GcalState { calendar, store });
        routes(state.clone()).merge(callback_routes(state))
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
    async fn short_code_is_rejected() {
        let calendar = Arc::new(FakeCalendar::default());
        let app = app(calendar.clone(), Arc::new(MemoryDatastore::new()));
        let (status, body) = post(
            &app,
            "/calendar/oauth-callback",
            json!({ "code": "short", "tenantId": "anything" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid authorization code format" }));
        assert_eq!(calendar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let calendar = Arc::new(FakeCalendar::default());
        let app = app(calendar.clone(), Arc::new(MemoryDatastore::new()));
        let (status, body) = post(
            &app,
            "/calendar/oauth-callback",
            json!({
                "code": "a".repeat(30),
                "tenantId": "12345678-1234-1234-1234-123456789abc"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Tenant not found" }));
        assert_eq!(calendar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn callback_validation_order() {
        let app = app(
            Arc::new(FakeCalendar::default()),
            Arc::new(MemoryDatastore::new()),
        );
        let cases = [
            (json!({ "tenantId": "x" }), "Missing code or tenantId"),
            (json!({ "code": "", "tenantId": "x" }), "Missing code or tenantId"),
            (
                json!({ "code": "c".repeat(201), "tenantId": "x" }),
                "Invalid authorization code format",
            ),
            (
                json!({ "code": "c".repeat(20), "tenantId": "12345678123412341234123456789abc" }),
                "Invalid tenant ID format",
            ),
        ];
        for (body, expected) in cases {
            let (status, reply) = post(&app, "/calendar/oauth-callback", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply["error"], expected);
        }
    }

    #[tokio::test]
    async fn successful_callback_stores_blob_and_enables_sync() {
        let store = Arc::new(MemoryDatastore::new());
        let tenant = Tenant::new("Barber", PlanTier::Silver);
        store.insert_tenant(&tenant).await.unwrap();
        let app = app(Arc::new(FakeCalendar::default()), store.clone());

        let code = "4/0AeaYSHB".to_string() + &"x".repeat(20);
        let (status, body) = post(
            &app,
            "/calendar/oauth-callback",
            json!({ "code": code, "tenantId": tenant.id.to_string() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let stored = store.get_tenant(tenant.id).await.unwrap().unwrap();
        assert!(stored.google_calendar_sync_enabled);
        assert_eq!(stored.calendar_token(), Some(format!("sealed:{code}").as_str()));
    }

    #[tokio::test]
    async fn availability_requires_connection() {
        let store = Arc::new(MemoryDatastore::new());
        let tenant = Tenant::new("Barber", PlanTier::Silver);
        store.insert_tenant(&tenant).await.unwrap();
        let app = app(Arc::new(FakeCalendar::default()), store);

        let (status, body) = post(
            &app,
            "/calendar/check-availability",
            json!({
                "tenantId": tenant.id,
                "startTime": "2025-06-02T10:00:00Z",
                "endTime": "2025-06-02T11:00:00Z"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Google Calendar not connected");
    }

    #[tokio::test]
    async fn availability_persists_rotated_token() {
        let store = Arc::new(MemoryDatastore::new());
        let tenant = Tenant::new("Barber", PlanTier::Silver);
        store.insert_tenant(&tenant).await.unwrap();
        store
            .set_calendar_token(tenant.id, Some("old-blob"), true)
            .await
            .unwrap();
        let calendar = Arc::new(FakeCalendar {
            busy: true,
            rotate_to: Some("new-blob".into()),
            ..FakeCalendar::default()
        });
        let app = app(calendar, store.clone());

        let (status, body) = post(
            &app,
            "/calendar/check-availability",
            json!({
                "tenantId": tenant.id,
                "startTime": "2025-06-02T10:00:00Z",
                "endTime": "2025-06-02T11:00:00Z"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "isAvailable": false }));
        let stored = store.get_tenant(tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.calendar_token(), Some("new-blob"));
    }

    #[tokio::test]
    async fn disconnect_clears_token_and_sync() {
        let store = Arc::new(MemoryDatastore::new());
        let tenant = Tenant::new("Barber", PlanTier::Silver);
        store.insert_tenant(&tenant).await.unwrap();
        store.set_calendar_token(tenant.id, Some("blob"), true).await.unwrap();
        let app = app(Arc::new(FakeCalendar::default()), store.clone());

        let (status, body) = post(&app, "/calendar/disconnect", json!({ "tenantId": tenant.id })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));
        let stored = store.get_tenant(tenant.id).await.unwrap().unwrap();
        assert!(!stored.google_calendar_sync_enabled);
        assert!(stored.google_calendar_token.is_none());
    }
}
