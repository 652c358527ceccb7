use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use slotwise_backend::{build_app, AppState, MetricsState, RateLimitState};
use slotwise_common::models::{permissions, PlanTier, Role, Service, Tenant, User};
use slotwise_common::services::{
    CalendarError, CalendarProvider, CreatedEvent, EventDetails, Rotated,
};
use slotwise_config::{AppConfig, RateLimitSettings};
use slotwise_db::{Datastore, MemoryDatastore};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct StaticCalendar;

#[async_trait]
impl CalendarProvider for StaticCalendar {
    fn auth_url(&self) -> Result<String, CalendarError> {
        Ok("https://accounts.google.com/o/oauth2/v2/auth?client_id=test".to_string())
    }

    async fn tokens_from_code(&self, code: &str) -> Result<String, CalendarError> {
        Ok(format!("sealed:{code}"))
    }

    async fn create_event(
        &self,
        _token_blob: &str,
        _event: &EventDetails,
        _calendar_id: &str,
    ) -> Result<Rotated<CreatedEvent>, CalendarError> {
        Ok(Rotated::unchanged(CreatedEvent {
            id: "evt-1".to_string(),
            link: None,
        }))
    }

    async fn check_availability(
        &self,
        _token_blob: &str,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
        _calendar_id: &str,
    ) -> Result<Rotated<bool>, CalendarError> {
        Ok(Rotated::unchanged(true))
    }

    async fn delete_event(
        &self,
        _token_blob: &str,
        _event_id: &str,
        _calendar_id: &str,
    ) -> Result<Rotated<()>, CalendarError> {
        Ok(Rotated::unchanged(()))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryDatastore>,
    tenant: Tenant,
    service: Service,
    staff: User,
}

async fn test_app(calendar: Option<Arc<dyn CalendarProvider>>, rate_limit: RateLimitState) -> TestApp {
    let store = Arc::new(MemoryDatastore::new());
    let tenant = Tenant::new("Barber Shop", PlanTier::Gold);
    store.insert_tenant(&tenant).await.unwrap();
    let service = Service {
        id: Uuid::new_v4(),
        tenant_id: tenant.id,
        name: "Haircut".into(),
        price: 30.0,
        duration_minutes: 30,
    };
    store.insert_service(&service).await.unwrap();
    let role = Role::new(
        "staff",
        [permissions::APPOINTMENTS_CREATE, permissions::APPOINTMENTS_READ],
    );
    store.insert_role(&role).await.unwrap();
    let staff = User::new("staff@barber.io", "Staff", tenant.id, role.id);
    store.insert_user(&staff).await.unwrap();

    let (state, _audit_writer) =
        AppState::from_parts(Arc::new(AppConfig::default()), store.clone(), calendar, None);
    let router = build_app(&state, MetricsState::disabled(), rate_limit);

    TestApp {
        router,
        store,
        tenant,
        service,
        staff,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = test_app(None, RateLimitState::disabled()).await;

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "slotwise");

    let (status, body) = send(&app.router, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["datastore"]["status"], "up");

    let (status, _) = send(&app.router, Method::GET, "/health/live", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn disabled_metrics_answer_503() {
    let app = test_app(None, RateLimitState::disabled()).await;
    let (status, _) = send(&app.router, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, body) = send(&app.router, Method::GET, "/metrics/json", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Metrics not enabled");
}

#[tokio::test]
async fn booking_without_calendar_is_saved_unsynced() {
    let app = test_app(None, RateLimitState::disabled()).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/appointments",
        Some(json!({
            "appointment": {
                "customerName": "Ana",
                "customerPhone": "+41790000000",
                "serviceId": app.service.id,
                "dateTime": "2025-06-02T10:00:00Z"
            },
            "userId": app.staff.id,
            "tenantId": app.tenant.id
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["googleCalendarSynced"], false);
    assert_eq!(app.store.list_appointments(app.tenant.id).await.unwrap().len(), 1);

    let uri = format!("/api/appointments/{}?userId={}", app.tenant.id, app.staff.id);
    let (status, body) = send(&app.router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_without_identity_is_forbidden() {
    let app = test_app(None, RateLimitState::disabled()).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/appointments",
        Some(json!({
            "appointment": {
                "customerName": "Ana",
                "customerPhone": "+41790000000",
                "serviceId": app.service.id,
                "dateTime": "2025-06-02T10:00:00Z"
            },
            "tenantId": app.tenant.id
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Caller identity required");
    assert!(app.store.list_appointments(app.tenant.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_without_oracle_answers_offline() {
    let app = test_app(None, RateLimitState::disabled()).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/chat/{}", app.tenant.id),
        Some(json!({ "message": "Hi", "history": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], AppConfig::default().chat.offline_message);
    assert_eq!(body["tokensUsed"], 0);
}

#[tokio::test]
async fn calendar_routes_need_a_configured_calendar() {
    let app = test_app(None, RateLimitState::disabled()).await;
    let (status, _) = send(&app.router, Method::GET, "/api/calendar/auth-url", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let app = test_app(Some(Arc::new(StaticCalendar)), RateLimitState::disabled()).await;
    let (status, body) = send(&app.router, Method::GET, "/api/calendar/auth-url", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["authUrl"].as_str().unwrap().starts_with("https://accounts.google.com"));
}

#[tokio::test]
async fn oauth_callback_is_rate_limited() {
    let limit = RateLimitState::from_settings(&RateLimitSettings {
        enabled: true,
        requests_per_window: 1,
        window_secs: 60,
        burst_size: 1,
    });
    let app = test_app(Some(Arc::new(StaticCalendar)), limit).await;
    let body = json!({
        "code": "4/0AeanS0a1b2c3d4e5f6g7h8i9j",
        "tenantId": app.tenant.id.to_string()
    });

    let (status, reply) = send(
        &app.router,
        Method::POST,
        "/api/calendar/oauth-callback",
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["success"], true);

    let (status, reply) = send(
        &app.router,
        Method::POST,
        "/api/calendar/oauth-callback",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply["error"], "Too many requests");

    // Other calendar routes share no budget with the callback.
    let (status, _) = send(&app.router, Method::GET, "/api/calendar/auth-url", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_booking_body_is_a_400_error_body() {
    let app = test_app(None, RateLimitState::disabled()).await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/appointments",
        Some(json!({ "appointment": "tomorrow", "tenantId": app.tenant.id })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(app.store.list_appointments(app.tenant.id).await.unwrap().is_empty());
}
