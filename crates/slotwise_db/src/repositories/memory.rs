//! In-memory datastore
//!
//! Used when no database is configured and throughout the test suites.
//! Writes can be made to fail on demand to exercise storage-error paths.

use async_trait::async_trait;
use slotwise_common::models::{
    debit_credits, ActivityLogEntry, AgentSettings, Appointment, FeatureFlag, Role, Service,
    Tenant, User,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::datastore::Datastore;
use crate::error::DbError;

#[derive(Default)]
struct Tables {
    tenants: HashMap<Uuid, Tenant>,
    roles: HashMap<Uuid, Role>,
    users: HashMap<Uuid, User>,
    services: HashMap<Uuid, Service>,
    appointments: Vec<Appointment>,
    activity: Vec<ActivityLogEntry>,
    agent_settings: HashMap<Uuid, AgentSettings>,
    flags: HashMap<Uuid, BTreeMap<FeatureFlag, bool>>,
}

#[derive(Default)]
pub struct MemoryDatastore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl std::fmt::Debug for MemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatastore")
            .field("fail_writes", &self.fail_writes.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every mutating call returns [`DbError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(DbError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn init_schema(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables.write().await.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, DbError> {
        Ok(self.tables.read().await.tenants.get(&tenant_id).cloned())
    }

    async fn set_calendar_token(
        &self,
        tenant_id: Uuid,
        token_blob: Option<&str>,
        sync_enabled: bool,
    ) -> Result<bool, DbError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(match tables.tenants.get_mut(&tenant_id) {
            Some(tenant) => {
                tenant.google_calendar_token = token_blob.map(str::to_string);
                tenant.google_calendar_sync_enabled = sync_enabled;
                true
            }
            None => false,
        })
    }

    async fn debit_credits(&self, tenant_id: Uuid, amount: i64) -> Result<Option<i64>, DbError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables.tenants.get_mut(&tenant_id).map(|tenant| {
            tenant.credits = debit_credits(tenant.credits, amount);
            tenant.credits
        }))
    }

    async fn insert_role(&self, role: &Role) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables.write().await.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>, DbError> {
        Ok(self.tables.read().await.roles.get(&role_id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DbError::QueryError(format!(
                "UNIQUE constraint failed: users.email ({})",
                user.email
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, DbError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn update_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, DbError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&user_id)
            .map(|user| user.role_id = role_id)
            .is_some())
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool, DbError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&user_id)
            .map(|user| user.active = active)
            .is_some())
    }

    async fn insert_service(&self, service: &Service) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables.write().await.services.insert(service.id, service.clone());
        Ok(())
    }

    async fn get_service(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<Service>, DbError> {
        Ok(self
            .tables
            .read()
            .await
            .services
            .get(&service_id)
            .filter(|s| s.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_services(&self, tenant_id: Uuid) -> Result<Vec<Service>, DbError> {
        let tables = self.tables.read().await;
        let mut services: Vec<_> = tables
            .services
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables.write().await.appointments.push(appointment.clone());
        Ok(())
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, DbError> {
        Ok(self
            .tables
            .read()
            .await
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned())
    }

    async fn list_appointments(&self, tenant_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let tables = self.tables.read().await;
        let mut list: Vec<_> = tables
            .appointments
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal start times.
        list.sort_by_key(|a| a.date_time);
        Ok(list)
    }

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<bool, DbError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let before = tables.appointments.len();
        tables.appointments.retain(|a| a.id != appointment_id);
        Ok(tables.appointments.len() != before)
    }

    async fn insert_activity(&self, entry: &ActivityLogEntry) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables.write().await.activity.push(entry.clone());
        Ok(())
    }

    async fn list_activity(&self, tenant_id: Uuid) -> Result<Vec<ActivityLogEntry>, DbError> {
        Ok(self
            .tables
            .read()
            .await
            .activity
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn get_agent_settings(&self, tenant_id: Uuid) -> Result<Option<AgentSettings>, DbError> {
        Ok(self.tables.read().await.agent_settings.get(&tenant_id).cloned())
    }

    async fn upsert_agent_settings(&self, settings: &AgentSettings) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables
            .write()
            .await
            .agent_settings
            .insert(settings.tenant_id, settings.clone());
        Ok(())
    }

    async fn feature_overrides(
        &self,
        tenant_id: Uuid,
    ) -> Result<BTreeMap<FeatureFlag, bool>, DbError> {
        Ok(self
            .tables
            .read()
            .await
            .flags
            .get(&tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_feature_override(
        &self,
        tenant_id: Uuid,
        flag: FeatureFlag,
        enabled: bool,
    ) -> Result<(), DbError> {
        self.check_writable()?;
        self.tables
            .write()
            .await
            .flags
            .entry(tenant_id)
            .or_default()
            .insert(flag, enabled);
        Ok(())
    }
}
