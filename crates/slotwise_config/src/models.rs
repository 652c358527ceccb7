// --- File: crates/slotwise_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Deployment flavour. Production turns missing secrets into startup errors
/// and hides internal error messages from clients.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, RuntimeEnvironment::Production)
    }
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite://data/slotwise.db, override via SLOTWISE__DATABASE__URL
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

// --- Google Calendar Config ---
// Client credentials come from the OAuth consent screen of the tenant-facing app.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>, // SLOTWISE_SECRET_GCAL_CLIENT_SECRET
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Overrides the Calendar API root, used against local fakes.
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_auth_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_endpoint() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_time_zone() -> String {
    "Europe/Zurich".to_string()
}

impl Default for GcalConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_endpoint: default_auth_endpoint(),
            token_endpoint: default_token_endpoint(),
            api_base_url: None,
            calendar_id: default_calendar_id(),
            time_zone: default_time_zone(),
        }
    }
}

// --- Token Vault Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct VaultConfig {
    #[serde(default)]
    pub master_secret: Option<String>, // SLOTWISE_SECRET_VAULT_MASTER_SECRET
}

// --- Generative AI Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>, // SLOTWISE_SECRET_AI_API_KEY
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_api_url")]
    pub api_url: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

fn default_ai_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_ai_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            api_url: default_ai_api_url(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

// --- Conversational agent behaviour ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub offline_message: String,
    pub apology_message: String,
    pub default_persona: String,
    pub promo_marker: String,
    /// Window length used when the agent checks a requested time.
    pub slot_minutes: i64,
    /// Credits charged per answered message.
    pub credits_per_message: i64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            offline_message: "Our assistant is temporarily offline. Please try again later."
                .to_string(),
            apology_message:
                "Sorry, I am having trouble answering right now. Please try again in a moment."
                    .to_string(),
            default_persona: "You are a friendly receptionist. Be brief and polite.".to_string(),
            promo_marker: "[SEND_PROMO]".to_string(),
            slot_minutes: 60,
            credits_per_message: 1,
        }
    }
}

// --- Audit queue ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuditConfig {
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

// --- Rate limiting for the OAuth callback ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_secs: u64,
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 10,
            window_secs: 60,
            burst_size: 5,
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,
    #[serde(default)]
    pub use_ai: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub ai: Option<AiConfig>,

    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}
