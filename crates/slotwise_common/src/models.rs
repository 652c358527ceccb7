// --- File: crates/slotwise_common/src/models.rs ---
//! Domain records shared by the datastore, the access gate, the booking
//! orchestrator and the chat agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Bronze,
    Silver,
    Gold,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Bronze => "bronze",
            PlanTier::Silver => "silver",
            PlanTier::Gold => "gold",
        }
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "bronze" => Ok(PlanTier::Bronze),
            "silver" => Ok(PlanTier::Silver),
            "gold" => Ok(PlanTier::Gold),
            other => Err(format!("unknown plan tier: {other}")),
        }
    }
}

/// A business account and the unit of data isolation.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub plan: PlanTier,
    pub credits: i64,
    pub google_calendar_sync_enabled: bool,
    /// Encrypted token blob. Never serialized to clients.
    #[serde(skip_serializing, default)]
    pub google_calendar_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, plan: PlanTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            plan,
            credits: 0,
            google_calendar_sync_enabled: false,
            google_calendar_token: None,
            created_at: Utc::now(),
        }
    }

    /// The stored token, if calendar sync is switched on for this tenant.
    pub fn calendar_token(&self) -> Option<&str> {
        if self.google_calendar_sync_enabled {
            self.google_calendar_token.as_deref()
        } else {
            None
        }
    }
}

/// Balance after taking `amount` credits; never below zero.
pub fn debit_credits(balance: i64, amount: i64) -> i64 {
    balance.saturating_sub(amount.max(0)).max(0)
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{resource}.{action}`, e.g. `appointments.create`.
pub fn permission_name(resource: &str, action: Action) -> String {
    format!("{}.{}", resource, action)
}

pub mod permissions {
    pub const APPOINTMENTS_CREATE: &str = "appointments.create";
    pub const APPOINTMENTS_READ: &str = "appointments.read";
    pub const APPOINTMENTS_DELETE: &str = "appointments.delete";
    pub const USERS_CREATE: &str = "users.create";
    pub const USERS_UPDATE: &str = "users.update";
    pub const USERS_DELETE: &str = "users.delete";
    pub const FEATURE_FLAGS_UPDATE: &str = "feature_flags.update";
}

/// A named permission bundle. `is_super_admin` grants everything.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub is_super_admin: bool,
    pub permissions: BTreeSet<String>,
}

impl Role {
    pub fn new<I, S>(name: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_super_admin: false,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn super_admin(name: impl Into<String>) -> Self {
        Self {
            is_super_admin: true,
            ..Self::new(name, Vec::<String>::new())
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        display_name: impl Into<String>,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
            tenant_id,
            role_id,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// A user with the role and flattened permission set resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWithPermissions {
    pub user: User,
    pub role: Role,
}

impl UserWithPermissions {
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.role.permissions
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.is_super_admin
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Confirmed,
    Cancelled,
    Pending,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Pending => "pending",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "pending" => Ok(AppointmentStatus::Pending),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

/// The definitive result of the calendar step of a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { event_id: String },
    Failed { error: String },
    NotAttempted,
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

/// Booking input as sent by the dashboard or the chat agent.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    #[serde(alias = "customerName")]
    pub customer_name: String,
    #[serde(default, alias = "customerPhone")]
    pub customer_phone: String,
    #[serde(alias = "serviceId")]
    pub service_id: Uuid,
    #[serde(default, alias = "serviceName")]
    pub service_name: Option<String>,
    #[serde(alias = "dateTime")]
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub value: Option<f64>,
}

/// A persisted booking. Sync fields are only ever set from a [`SyncOutcome`].
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub service_id: Uuid,
    pub service_name: String,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub value: f64,
    pub google_calendar_event_id: Option<String>,
    pub google_calendar_synced: bool,
    pub google_calendar_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Builds the record for `input` with service data filled from `service`.
    pub fn new(tenant_id: Uuid, input: NewAppointment, service: &Service, sync: SyncOutcome) -> Self {
        let (event_id, synced, error) = match sync {
            SyncOutcome::Synced { event_id } => (Some(event_id), true, None),
            SyncOutcome::Failed { error } => (None, false, Some(error)),
            SyncOutcome::NotAttempted => (None, false, None),
        };
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            service_id: service.id,
            service_name: input.service_name.unwrap_or_else(|| service.name.clone()),
            date_time: input.date_time,
            status: input.status.unwrap_or_default(),
            value: input.value.unwrap_or(service.price),
            google_calendar_event_id: event_id,
            google_calendar_synced: synced,
            google_calendar_error: error,
            created_at: Utc::now(),
        }
    }

    pub fn sync_outcome(&self) -> SyncOutcome {
        match (&self.google_calendar_event_id, &self.google_calendar_error) {
            (Some(event_id), _) if self.google_calendar_synced => SyncOutcome::Synced {
                event_id: event_id.clone(),
            },
            (_, Some(error)) => SyncOutcome::Failed {
                error: error.clone(),
            },
            _ => SyncOutcome::NotAttempted,
        }
    }
}

/// Append-only audit record. `user_id` is `None` for system and agent actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub tenant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn new(tenant_id: Uuid, user_id: Option<Uuid>, action: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            action: action.into(),
            resource_type: None,
            resource_id: None,
            details: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now(),
        }
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Per-tenant configuration of the chat agent.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub tenant_id: Uuid,
    pub persona: String,
    pub bot_active: bool,
    pub promo_asset_url: Option<String>,
}

/// Runtime switches resolved per tenant.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    CalendarSync,
    AiAgent,
    PromoAssets,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 3] = [
        FeatureFlag::CalendarSync,
        FeatureFlag::AiAgent,
        FeatureFlag::PromoAssets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::CalendarSync => "calendar_sync",
            FeatureFlag::AiAgent => "ai_agent",
            FeatureFlag::PromoAssets => "promo_assets",
        }
    }

    /// Plan default when the tenant has no stored override.
    pub fn default_for(&self, plan: PlanTier) -> bool {
        match self {
            FeatureFlag::AiAgent | FeatureFlag::CalendarSync => true,
            FeatureFlag::PromoAssets => matches!(plan, PlanTier::Silver | PlanTier::Gold),
        }
    }
}

impl FromStr for FeatureFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| format!("unknown feature flag: {s}"))
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the running conversation.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}
