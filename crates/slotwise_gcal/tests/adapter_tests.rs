//! Drives the Google adapter against a local fake of the token endpoint and
//! the Calendar REST API.

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use slotwise_common::services::{CalendarError, CalendarProvider, EventDetails};
use slotwise_config::GcalConfig;
use slotwise_gcal::GoogleCalendarAdapter;
use slotwise_vault::{OAuthToken, TokenVault};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

fn config(server: &MockServer) -> GcalConfig {
    GcalConfig {
        client_id: Some("client-id".into()),
        client_secret: Some("client-secret".into()),
        redirect_uri: Some("http://localhost/callback".into()),
        token_endpoint: format!("{}/token", server.uri()),
        api_base_url: Some(format!("{}/calendar/v3", server.uri())),
        ..GcalConfig::default()
    }
}

fn vault() -> TokenVault {
    TokenVault::new("adapter-test-secret")
}

fn live_token() -> OAuthToken {
    OAuthToken {
        access_token: "ya29.live".into(),
        refresh_token: Some("1//refresh".into()),
        expiry_date: Some((Utc::now() + Duration::hours(1)).timestamp_millis()),
        scope: None,
        token_type: Some("Bearer".into()),
    }
}

#[tokio::test]
async fn code_exchange_returns_encrypted_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2F0Aea-test-code-000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.issued",
            "refresh_token": "1//issued",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/calendar",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vault = vault();
    let adapter = GoogleCalendarAdapter::new(config(&server), vault.clone()).unwrap();
    let blob = adapter.tokens_from_code("4/0Aea-test-code-000000").await.unwrap();

    assert!(!blob.contains("ya29.issued"));
    let token = vault.open_token(&blob).await.unwrap();
    assert_eq!(token.access_token, "ya29.issued");
    assert_eq!(token.refresh_token.as_deref(), Some("1//issued"));
    assert!(!token.is_expired(Utc::now()));
}

#[tokio::test]
async fn rejected_code_is_a_token_exchange_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let adapter = GoogleCalendarAdapter::new(config(&server), vault()).unwrap();
    let err = adapter.tokens_from_code("bad-code-bad-code-bad").await.unwrap_err();
    assert!(matches!(err, CalendarError::TokenExchange(_)));
}

#[tokio::test]
async fn create_event_sends_updates_to_attendees() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(query_param("sendUpdates", "all"))
        .and(header("authorization", "Bearer ya29.live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-123",
            "htmlLink": "https://calendar.google.com/event?eid=evt-123",
            "status": "confirmed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vault = vault();
    let blob = vault.seal_token(live_token()).await.unwrap();
    let adapter = GoogleCalendarAdapter::new(config(&server), vault).unwrap();
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();

    let created = adapter
        .create_event(
            &blob,
            &EventDetails {
                summary: "Haircut - Ana".into(),
                description: None,
                start,
                end: start + Duration::minutes(45),
                attendees: vec![],
            },
            "primary",
        )
        .await
        .unwrap();

    assert_eq!(created.value.id, "evt-123");
    assert!(created.rotated_token.is_none());
}

#[tokio::test]
async fn expired_token_is_refreshed_and_handed_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer ya29.fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "calendar#events",
            "items": [
                {
                    "id": "cancelled-one",
                    "status": "cancelled",
                    "start": { "dateTime": "2025-06-02T10:00:00Z" },
                    "end": { "dateTime": "2025-06-02T11:00:00Z" }
                },
                {
                    "id": "busy-one",
                    "status": "confirmed",
                    "start": { "dateTime": "2025-06-02T10:30:00Z" },
                    "end": { "dateTime": "2025-06-02T11:30:00Z" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let vault = vault();
    let expired = OAuthToken {
        access_token: "ya29.stale".into(),
        expiry_date: Some((Utc::now() - Duration::minutes(5)).timestamp_millis()),
        ..live_token()
    };
    let blob = vault.seal_token(expired).await.unwrap();
    let adapter = GoogleCalendarAdapter::new(config(&server), vault.clone()).unwrap();
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();

    let result = adapter
        .check_availability(&blob, start, start + Duration::hours(1), "primary")
        .await
        .unwrap();

    assert!(!result.value);
    let rotated = vault
        .open_token(result.rotated_token.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(rotated.access_token, "ya29.fresh");
    assert_eq!(rotated.refresh_token.as_deref(), Some("1//refresh"));
}

#[tokio::test]
async fn deleting_a_gone_event_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{EVENTS_PATH}/evt-gone")))
        .respond_with(ResponseTemplate::new(410).set_body_json(json!({
            "error": { "code": 410, "message": "Resource has been deleted" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{EVENTS_PATH}/evt-forbidden")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Forbidden" }
        })))
        .mount(&server)
        .await;

    let vault = vault();
    let blob = vault.seal_token(live_token()).await.unwrap();
    let adapter = GoogleCalendarAdapter::new(config(&server), vault).unwrap();

    assert!(adapter.delete_event(&blob, "evt-gone", "primary").await.is_ok());
    let err = adapter
        .delete_event(&blob, "evt-forbidden", "primary")
        .await
        .unwrap_err();
    assert!(matches!(err, CalendarError::Sync(_)));
}
