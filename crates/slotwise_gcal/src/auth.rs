// File: crates/slotwise_gcal/src/auth.rs
//! OAuth plumbing: the consent URL, code exchange, token refresh and the
//! per-call Calendar hub.

use chrono::{Duration, Utc};
use google_calendar3::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    CalendarHub,
};
use serde::Deserialize;
use slotwise_common::services::CalendarError;
use slotwise_config::GcalConfig;
use slotwise_vault::OAuthToken;
use tracing::{debug, error};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HttpClient = google_calendar3::common::Client<Connector>;

pub type HubType = CalendarHub<Connector>;

/// Shared HTTPS client for every hub this process builds.
pub fn create_http_client() -> Result<HttpClient, CalendarError> {
    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| CalendarError::Configuration(format!("TLS roots unavailable: {e}")))?
        .https_or_http()
        .enable_http1()
        .build();

    Ok(Client::builder(hyper_util::rt::TokioExecutor::new()).build(https))
}

/// A hub authenticated with a bare access token.
pub fn create_calendar_hub(
    client: &HttpClient,
    access_token: String,
    api_base_url: Option<&str>,
) -> HubType {
    let mut hub = CalendarHub::new(client.clone(), access_token);
    if let Some(base) = api_base_url {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        hub.base_url(base);
    }
    hub
}

struct Credentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

fn credentials(config: &GcalConfig) -> Result<Credentials<'_>, CalendarError> {
    let missing = |name: &str| CalendarError::Configuration(format!("{name} is not set"));
    Ok(Credentials {
        client_id: config
            .client_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("client_id"))?,
        client_secret: config
            .client_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("client_secret"))?,
        redirect_uri: config
            .redirect_uri
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("redirect_uri"))?,
    })
}

/// Consent URL asking for calendar scope, offline access and forced consent.
pub fn authorization_url(config: &GcalConfig) -> Result<String, CalendarError> {
    let creds = credentials(config)?;
    let query = serde_urlencoded::to_string([
        ("client_id", creds.client_id),
        ("redirect_uri", creds.redirect_uri),
        ("response_type", "code"),
        ("scope", CALENDAR_SCOPE),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ])
    .map_err(|e| CalendarError::Configuration(e.to_string()))?;

    Ok(format!("{}?{}", config.auth_endpoint, query))
}

/// Body of a successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self, previous_refresh: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry_date: self
                .expires_in
                .map(|secs| (Utc::now() + Duration::seconds(secs)).timestamp_millis()),
            scope: self.scope,
            token_type: self.token_type,
        }
    }
}

async fn post_token_form(
    http: &reqwest::Client,
    endpoint: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, CalendarError> {
    let response = http
        .post(endpoint)
        .form(form)
        .send()
        .await
        .map_err(|e| CalendarError::TokenExchange(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Token endpoint returned {}: {}", status, body);
        return Err(CalendarError::TokenExchange(format!(
            "token endpoint returned {status}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| CalendarError::TokenExchange(format!("unreadable token response: {e}")))
}

/// Trades a one-time authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &GcalConfig,
    code: &str,
) -> Result<OAuthToken, CalendarError> {
    let creds = credentials(config)?;
    debug!("Exchanging authorization code");
    let response = post_token_form(
        http,
        &config.token_endpoint,
        &[
            ("code", code),
            ("client_id", creds.client_id),
            ("client_secret", creds.client_secret),
            ("redirect_uri", creds.redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await?;
    Ok(response.into_token(None))
}

/// Gets a fresh access token; the refresh token is kept when Google omits it.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &GcalConfig,
    token: &OAuthToken,
) -> Result<OAuthToken, CalendarError> {
    let creds = credentials(config)?;
    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or_else(|| CalendarError::TokenExchange("no refresh token stored".to_string()))?;
    debug!("Refreshing expired access token");
    let response = post_token_form(
        http,
        &config.token_endpoint,
        &[
            ("refresh_token", refresh_token),
            ("client_id", creds.client_id),
            ("client_secret", creds.client_secret),
            ("grant_type", "refresh_token"),
        ],
    )
    .await?;
    Ok(response.into_token(token.refresh_token.clone()))
}
