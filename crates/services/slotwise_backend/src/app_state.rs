// --- File: crates/services/slotwise_backend/src/app_state.rs ---
use slotwise_access::{AccessGate, AccessState, AuditLogger, FeatureFlagService};
use slotwise_booking::{BookingOrchestrator, BookingState};
use slotwise_chat::{BookingAgent, ChatOracle, ChatState, GeminiOracle};
use slotwise_common::services::CalendarProvider;
use slotwise_config::AppConfig;
use slotwise_db::{Datastore, DatastoreFactory, DbError};
use slotwise_gcal::{GcalState, GoogleCalendarAdapter};
use slotwise_vault::{TokenVault, VaultError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to load config: {0}")]
    Config(#[from] slotwise_config::ConfigError),

    #[error("Token vault unavailable: {0}")]
    Vault(#[from] VaultError),

    #[error("Datastore unavailable: {0}")]
    Datastore(#[from] DbError),

    #[error("Google Calendar adapter could not be built: {0}")]
    Calendar(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the routers share, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Datastore>,
    pub gate: Arc<AccessGate>,
    pub flags: FeatureFlagService,
    /// `None` when Google Calendar is switched off.
    pub calendar: Option<Arc<dyn CalendarProvider>>,
    pub orchestrator: Arc<BookingOrchestrator>,
    pub agent: Arc<BookingAgent>,
}

impl AppState {
    /// Builds the production graph: datastore, vault, Google adapter and oracle
    /// as configured. The returned handle is the audit writer.
    pub async fn new(config: Arc<AppConfig>) -> Result<(Self, JoinHandle<()>), StartupError> {
        let store = DatastoreFactory::new().from_app_config(&config).await?;
        let vault = TokenVault::from_config(&config.vault, config.is_production())?;

        let calendar: Option<Arc<dyn CalendarProvider>> = match config.gcal.as_ref() {
            Some(gcal) if config.use_gcal => {
                info!("Initializing Google Calendar adapter...");
                let adapter = GoogleCalendarAdapter::new(gcal.clone(), vault)
                    .map_err(|e| StartupError::Calendar(e.to_string()))?;
                Some(Arc::new(adapter))
            }
            _ => {
                info!("Google Calendar disabled");
                None
            }
        };

        let oracle: Option<Arc<dyn ChatOracle>> = match config.ai.as_ref() {
            Some(ai) if config.use_ai => match GeminiOracle::from_config(ai) {
                Ok(oracle) => Some(Arc::new(oracle)),
                Err(e) => {
                    warn!("Chat agent disabled: {}", e);
                    None
                }
            },
            _ => {
                info!("Chat agent disabled");
                None
            }
        };

        Ok(Self::from_parts(config, store, calendar, oracle))
    }

    /// Wires the services around already-built collaborators.
    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn Datastore>,
        calendar: Option<Arc<dyn CalendarProvider>>,
        oracle: Option<Arc<dyn ChatOracle>>,
    ) -> (Self, JoinHandle<()>) {
        let (audit, audit_writer) = AuditLogger::spawn(store.clone(), config.audit.queue_capacity);
        let gate = Arc::new(AccessGate::new(store.clone(), audit));
        let flags = FeatureFlagService::new(store.clone());
        let orchestrator = Arc::new(BookingOrchestrator::new(
            store.clone(),
            gate.clone(),
            flags.clone(),
            calendar.clone(),
        ));
        let agent = Arc::new(BookingAgent::new(
            store.clone(),
            flags.clone(),
            orchestrator.clone(),
            oracle,
            config.chat.clone(),
        ));

        let state = Self {
            config,
            store,
            gate,
            flags,
            calendar,
            orchestrator,
            agent,
        };
        (state, audit_writer)
    }

    pub fn access_state(&self) -> Arc<AccessState> {
        Arc::new(AccessState {
            gate: self.gate.clone(),
            flags: self.flags.clone(),
        })
    }

    pub fn booking_state(&self) -> Arc<BookingState> {
        Arc::new(BookingState {
            orchestrator: self.orchestrator.clone(),
        })
    }

    pub fn chat_state(&self) -> Arc<ChatState> {
        Arc::new(ChatState {
            agent: self.agent.clone(),
        })
    }

    pub fn gcal_state(&self) -> Option<Arc<GcalState>> {
        self.calendar.as_ref().map(|calendar| {
            Arc::new(GcalState {
                calendar: calendar.clone(),
                store: self.store.clone(),
            })
        })
    }
}
