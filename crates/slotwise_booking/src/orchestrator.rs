// --- File: crates/slotwise_booking/src/orchestrator.rs ---
//! The booking flow: auth check, calendar attempt, persist, audit.
//!
//! The calendar step never decides the outcome of a booking. Whatever it
//! returns is folded into a [`SyncOutcome`] before the record is built, so
//! an event id can only be stored together with `google_calendar_synced`.

use chrono::Duration;
use serde::Serialize;
use slotwise_access::{AccessGate, FeatureFlagService};
use slotwise_common::models::{
    permissions, ActivityLogEntry, Appointment, FeatureFlag, NewAppointment, Service,
    SyncOutcome, Tenant,
};
use slotwise_common::services::{CalendarProvider, EventDetails};
use slotwise_common::{not_found, permission_denied, SlotwiseError};
use slotwise_db::Datastore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Who is asking. HTTP requests are always a user; the chat agent books on
/// behalf of the tenant it serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    User(Uuid),
    Agent { tenant_id: Uuid },
}

impl Caller {
    fn audit_user(&self) -> Option<Uuid> {
        match self {
            Caller::User(id) => Some(*id),
            Caller::Agent { .. } => None,
        }
    }

    fn source(&self) -> &'static str {
        match self {
            Caller::User(_) => "dashboard",
            Caller::Agent { .. } => "agent",
        }
    }
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAppointment {
    pub appointment: Appointment,
    pub google_calendar_synced: bool,
}

pub struct BookingOrchestrator {
    store: Arc<dyn Datastore>,
    gate: Arc<AccessGate>,
    flags: FeatureFlagService,
    calendar: Option<Arc<dyn CalendarProvider>>,
}

impl std::fmt::Debug for BookingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingOrchestrator")
            .field("calendar", &self.calendar.is_some())
            .finish_non_exhaustive()
    }
}

impl BookingOrchestrator {
    /// `calendar` is `None` when calendar sync is switched off for the whole process.
    pub fn new(
        store: Arc<dyn Datastore>,
        gate: Arc<AccessGate>,
        flags: FeatureFlagService,
        calendar: Option<Arc<dyn CalendarProvider>>,
    ) -> Self {
        Self {
            store,
            gate,
            flags,
            calendar,
        }
    }

    pub fn store(&self) -> &Arc<dyn Datastore> {
        &self.store
    }

    pub fn flags(&self) -> &FeatureFlagService {
        &self.flags
    }

    async fn authorize(
        &self,
        caller: Caller,
        tenant_id: Uuid,
        permission: &str,
    ) -> Result<(), SlotwiseError> {
        let allowed = match caller {
            Caller::User(user_id) => self.gate.authorize(user_id, permission, tenant_id).await,
            Caller::Agent { tenant_id: bound } => bound == tenant_id,
        };
        if allowed {
            Ok(())
        } else {
            info!(?caller, %tenant_id, permission, "Booking request denied");
            metrics::counter!("slotwise_booking_denied_total", "permission" => permission.to_string())
                .increment(1);
            Err(permission_denied("Permission denied"))
        }
    }

    async fn load_tenant(&self, tenant_id: Uuid) -> Result<Tenant, SlotwiseError> {
        self.store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| not_found("Tenant not found"))
    }

    /// The stored service, or a stand-in built from the request when the
    /// service row is gone.
    async fn resolve_service(
        &self,
        tenant_id: Uuid,
        input: &NewAppointment,
    ) -> Result<Service, SlotwiseError> {
        let stored = self.store.get_service(tenant_id, input.service_id).await?;
        let mut service = stored.unwrap_or_else(|| {
            warn!(%tenant_id, service_id = %input.service_id, "Booking references an unknown service");
            Service {
                id: input.service_id,
                tenant_id,
                name: input
                    .service_name
                    .clone()
                    .unwrap_or_else(|| "Appointment".to_string()),
                price: input.value.unwrap_or(0.0),
                duration_minutes: DEFAULT_DURATION_MINUTES,
            }
        });
        if service.duration_minutes <= 0 {
            service.duration_minutes = DEFAULT_DURATION_MINUTES;
        }
        Ok(service)
    }

    /// Token blob to use, if the tenant is connected and the flag allows syncing.
    async fn sync_token<'t>(&self, tenant: &'t Tenant) -> Option<&'t str> {
        self.calendar.as_ref()?;
        let token = tenant.calendar_token()?;
        if !self.flags.is_enabled(tenant, FeatureFlag::CalendarSync).await {
            debug!(tenant_id = %tenant.id, "calendar_sync flag is off");
            return None;
        }
        Some(token)
    }

    async fn store_rotated(&self, tenant_id: Uuid, rotated: Option<String>) {
        if let Some(blob) = rotated {
            if let Err(e) = self
                .store
                .set_calendar_token(tenant_id, Some(&blob), true)
                .await
            {
                warn!(%tenant_id, "Failed to store refreshed calendar token: {}", e);
            }
        }
    }

    async fn calendar_attempt(
        &self,
        tenant: &Tenant,
        input: &NewAppointment,
        service: &Service,
    ) -> SyncOutcome {
        let (Some(calendar), Some(token)) = (self.calendar.as_ref(), self.sync_token(tenant).await)
        else {
            return SyncOutcome::NotAttempted;
        };

        let service_name = input.service_name.as_deref().unwrap_or(&service.name);
        let details = EventDetails {
            summary: format!("{} - {}", service_name, input.customer_name),
            description: Some(format!(
                "Customer: {}\nPhone: {}\nService: {}",
                input.customer_name, input.customer_phone, service_name
            )),
            start: input.date_time,
            end: input.date_time + Duration::minutes(service.duration_minutes),
            attendees: Vec::new(),
        };

        match calendar
            .create_event(token, &details, calendar.calendar_id())
            .await
        {
            Ok(result) => {
                self.store_rotated(tenant.id, result.rotated_token).await;
                SyncOutcome::Synced {
                    event_id: result.value.id,
                }
            }
            Err(e) => {
                warn!(tenant_id = %tenant.id, "Calendar sync failed, booking continues: {}", e);
                SyncOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub async fn create_appointment(
        &self,
        caller: Caller,
        tenant_id: Uuid,
        input: NewAppointment,
    ) -> Result<CreatedAppointment, SlotwiseError> {
        self.authorize(caller, tenant_id, permissions::APPOINTMENTS_CREATE)
            .await?;

        let tenant = self.load_tenant(tenant_id).await?;
        let service = self.resolve_service(tenant_id, &input).await?;

        let outcome = self.calendar_attempt(&tenant, &input, &service).await;
        let synced = outcome.is_synced();
        let appointment = Appointment::new(tenant_id, input, &service, outcome);

        self.store.insert_appointment(&appointment).await.map_err(|e| {
            error!(%tenant_id, "Failed to persist appointment: {}", e);
            SlotwiseError::from(e)
        })?;

        self.gate.log_activity(
            ActivityLogEntry::new(tenant_id, caller.audit_user(), "appointment.created")
                .resource("appointment", appointment.id)
                .details(serde_json::json!({
                    "source": caller.source(),
                    "googleCalendarSynced": synced,
                })),
        );
        metrics::counter!("slotwise_appointments_created_total", "synced" => synced.to_string())
            .increment(1);
        info!(%tenant_id, appointment_id = %appointment.id, synced, "Appointment created");

        Ok(CreatedAppointment {
            appointment,
            google_calendar_synced: synced,
        })
    }

    pub async fn list_appointments(
        &self,
        caller: Caller,
        tenant_id: Uuid,
    ) -> Result<Vec<Appointment>, SlotwiseError> {
        self.authorize(caller, tenant_id, permissions::APPOINTMENTS_READ)
            .await?;
        Ok(self.store.list_appointments(tenant_id).await?)
    }

    pub async fn delete_appointment(
        &self,
        caller: Caller,
        tenant_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(), SlotwiseError> {
        self.authorize(caller, tenant_id, permissions::APPOINTMENTS_DELETE)
            .await?;

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .filter(|a| a.tenant_id == tenant_id)
            .ok_or_else(|| not_found("Appointment not found"))?;

        if let SyncOutcome::Synced { event_id } = appointment.sync_outcome() {
            self.remove_remote_event(tenant_id, &event_id).await;
        }

        if !self.store.delete_appointment(appointment_id).await? {
            return Err(not_found("Appointment not found"));
        }

        self.gate.log_activity(
            ActivityLogEntry::new(tenant_id, caller.audit_user(), "appointment.deleted")
                .resource("appointment", appointment_id),
        );
        metrics::counter!("slotwise_appointments_deleted_total").increment(1);
        info!(%tenant_id, %appointment_id, "Appointment deleted");
        Ok(())
    }

    /// Best effort: a failure here never blocks the local delete.
    async fn remove_remote_event(&self, tenant_id: Uuid, event_id: &str) {
        let Some(calendar) = self.calendar.as_ref() else {
            return;
        };
        let tenant = match self.store.get_tenant(tenant_id).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => return,
            Err(e) => {
                warn!(%tenant_id, "Tenant lookup failed before remote delete: {}", e);
                return;
            }
        };
        let Some(token) = tenant.calendar_token() else {
            debug!(%tenant_id, "No calendar token, skipping remote delete");
            return;
        };
        match calendar
            .delete_event(token, event_id, calendar.calendar_id())
            .await
        {
            Ok(result) => self.store_rotated(tenant_id, result.rotated_token).await,
            Err(e) => warn!(%tenant_id, %event_id, "Remote calendar delete failed: {}", e),
        }
    }
}
