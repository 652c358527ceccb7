//! Shared fixtures for the orchestrator and route tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotwise_access::{AccessGate, AuditLogger, FeatureFlagService};
use slotwise_common::models::{permissions, PlanTier, Role, Service, Tenant, User};
use slotwise_common::services::{
    CalendarError, CalendarProvider, CreatedEvent, EventDetails, Rotated,
};
use slotwise_db::{Datastore, MemoryDatastore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::orchestrator::BookingOrchestrator;

/// Calendar fake that records what it was asked to do.
#[derive(Default)]
pub struct RecordingCalendar {
    calls: AtomicUsize,
    create_error: Option<String>,
    fail_deletes: AtomicBool,
    rotate_to: Option<String>,
    created: Mutex<Vec<EventDetails>>,
    deleted: Mutex<Vec<String>>,
}

impl RecordingCalendar {
    pub fn failing(message: &str) -> Self {
        Self {
            create_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn rotating(blob: &str) -> Self {
        Self {
            rotate_to: Some(blob.to_string()),
            ..Self::default()
        }
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<EventDetails> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProvider for RecordingCalendar {
    fn auth_url(&self) -> Result<String, CalendarError> {
        Ok("https://accounts.google.com/o/oauth2/v2/auth".to_string())
    }

    async fn tokens_from_code(&self, code: &str) -> Result<String, CalendarError> {
        Ok(format!("sealed:{code}"))
    }

    async fn create_event(
        &self,
        _token_blob: &str,
        event: &EventDetails,
        _calendar_id: &str,
    ) -> Result<Rotated<CreatedEvent>, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.create_error {
            return Err(CalendarError::Sync(message.clone()));
        }
        let mut created = self.created.lock().unwrap();
        created.push(event.clone());
        Ok(Rotated {
            value: CreatedEvent {
                id: format!("evt-{}", created.len()),
                link: None,
            },
            rotated_token: self.rotate_to.clone(),
        })
    }

    async fn check_availability(
        &self,
        _token_blob: &str,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
        _calendar_id: &str,
    ) -> Result<Rotated<bool>, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Rotated::unchanged(true))
    }

    async fn delete_event(
        &self,
        _token_blob: &str,
        event_id: &str,
        _calendar_id: &str,
    ) -> Result<Rotated<()>, CalendarError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.deleted.lock().unwrap().push(event_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CalendarError::Sync("backendError".to_string()));
        }
        Ok(Rotated::unchanged(()))
    }
}

pub struct Fixture {
    pub store: Arc<MemoryDatastore>,
    pub calendar: Arc<RecordingCalendar>,
    pub gate: Arc<AccessGate>,
    pub orchestrator: Arc<BookingOrchestrator>,
    pub tenant: Tenant,
    pub service: Service,
    /// Holds every appointment permission in `tenant`.
    pub staff: User,
}

impl Fixture {
    pub async fn new(plan: PlanTier, calendar: RecordingCalendar) -> Self {
        let store = Arc::new(MemoryDatastore::new());
        let calendar = Arc::new(calendar);
        let (audit, _writer) = AuditLogger::spawn(store.clone(), 64);
        let gate = Arc::new(AccessGate::new(store.clone(), audit));
        let orchestrator = Arc::new(BookingOrchestrator::new(
            store.clone(),
            gate.clone(),
            FeatureFlagService::new(store.clone()),
            Some(calendar.clone()),
        ));

        let tenant = Tenant::new("Barber Shop", plan);
        store.insert_tenant(&tenant).await.unwrap();
        let service = Service {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: "Beard trim".into(),
            price: 25.0,
            duration_minutes: 45,
        };
        store.insert_service(&service).await.unwrap();

        let role = Role::new(
            "staff",
            [
                permissions::APPOINTMENTS_CREATE,
                permissions::APPOINTMENTS_READ,
                permissions::APPOINTMENTS_DELETE,
            ],
        );
        store.insert_role(&role).await.unwrap();
        let staff = User::new("staff@barber.io", "Staff", tenant.id, role.id);
        store.insert_user(&staff).await.unwrap();

        Self {
            store,
            calendar,
            gate,
            orchestrator,
            tenant,
            service,
            staff,
        }
    }

    pub async fn connect_calendar(&self) {
        self.store
            .set_calendar_token(self.tenant.id, Some("sealed-token"), true)
            .await
            .unwrap();
    }

    /// A super-admin homed in an unrelated tenant.
    pub async fn add_admin(&self) -> User {
        let role = Role::super_admin("platform-admin");
        self.store.insert_role(&role).await.unwrap();
        let admin = User::new("root@slotwise.io", "Root", Uuid::new_v4(), role.id);
        self.store.insert_user(&admin).await.unwrap();
        admin
    }

    /// A user in `tenant` holding only the given permissions.
    pub async fn add_user(&self, perms: &[&str]) -> User {
        let role = Role::new("limited", perms.iter().copied());
        self.store.insert_role(&role).await.unwrap();
        let user = User::new(
            format!("{}@barber.io", Uuid::new_v4()),
            "Limited",
            self.tenant.id,
            role.id,
        );
        self.store.insert_user(&user).await.unwrap();
        user
    }
}
