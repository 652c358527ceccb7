//! The datastore contract used by the gate, the orchestrator and the chat agent.

use async_trait::async_trait;
use slotwise_common::models::{
    ActivityLogEntry, AgentSettings, Appointment, FeatureFlag, Role, Service, Tenant, User,
};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::DbError;

/// Table-level access to tenant data.
///
/// Lookups return `Ok(None)` for missing rows; `Err` always means the store
/// itself failed.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Create tables if they do not exist.
    async fn init_schema(&self) -> Result<(), DbError>;

    async fn ping(&self) -> Result<(), DbError>;

    // --- tenants ---
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), DbError>;
    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, DbError>;
    /// Stores (or clears) the encrypted calendar token. Returns `false` if the tenant is unknown.
    async fn set_calendar_token(
        &self,
        tenant_id: Uuid,
        token_blob: Option<&str>,
        sync_enabled: bool,
    ) -> Result<bool, DbError>;
    /// Takes up to `amount` credits, clamping at zero. Returns the new balance.
    async fn debit_credits(&self, tenant_id: Uuid, amount: i64) -> Result<Option<i64>, DbError>;

    // --- roles and users ---
    async fn insert_role(&self, role: &Role) -> Result<(), DbError>;
    async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>, DbError>;
    async fn insert_user(&self, user: &User) -> Result<(), DbError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, DbError>;
    async fn update_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, DbError>;
    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool, DbError>;

    // --- services ---
    async fn insert_service(&self, service: &Service) -> Result<(), DbError>;
    async fn get_service(&self, tenant_id: Uuid, service_id: Uuid)
        -> Result<Option<Service>, DbError>;
    async fn list_services(&self, tenant_id: Uuid) -> Result<Vec<Service>, DbError>;

    // --- appointments ---
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError>;
    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, DbError>;
    /// Ordered by `date_time` ascending, then insertion order.
    async fn list_appointments(&self, tenant_id: Uuid) -> Result<Vec<Appointment>, DbError>;
    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<bool, DbError>;

    // --- audit ---
    async fn insert_activity(&self, entry: &ActivityLogEntry) -> Result<(), DbError>;
    async fn list_activity(&self, tenant_id: Uuid) -> Result<Vec<ActivityLogEntry>, DbError>;

    // --- agent settings ---
    async fn get_agent_settings(&self, tenant_id: Uuid) -> Result<Option<AgentSettings>, DbError>;
    async fn upsert_agent_settings(&self, settings: &AgentSettings) -> Result<(), DbError>;

    // --- feature flag overrides ---
    async fn feature_overrides(&self, tenant_id: Uuid)
        -> Result<BTreeMap<FeatureFlag, bool>, DbError>;
    async fn set_feature_override(
        &self,
        tenant_id: Uuid,
        flag: FeatureFlag,
        enabled: bool,
    ) -> Result<(), DbError>;
}
