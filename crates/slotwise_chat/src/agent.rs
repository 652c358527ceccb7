// --- File: crates/slotwise_chat/src/agent.rs ---
//! One conversational turn: gate checks, first oracle round, function calls,
//! follow-up round, promo handling and credit debit.

use serde::{Deserialize, Serialize};
use slotwise_access::FeatureFlagService;
use slotwise_booking::BookingOrchestrator;
use slotwise_common::models::{AgentSettings, ChatRole, ChatTurn, FeatureFlag, Tenant};
use slotwise_common::{not_found, SlotwiseError};
use slotwise_config::ChatConfig;
use slotwise_db::Datastore;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::functions::{declarations, FunctionRunner};
use crate::oracle::{ChatOracle, OracleError, OracleRequest};

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub send_promo: bool,
    pub tokens_used: u64,
}

impl ChatReply {
    fn fixed(message: &str) -> Self {
        Self {
            response: message.to_string(),
            send_promo: false,
            tokens_used: 0,
        }
    }
}

pub struct BookingAgent {
    store: Arc<dyn Datastore>,
    flags: FeatureFlagService,
    orchestrator: Arc<BookingOrchestrator>,
    /// `None` when no model is configured; every turn then gets the offline message.
    oracle: Option<Arc<dyn ChatOracle>>,
    config: ChatConfig,
}

impl std::fmt::Debug for BookingAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingAgent")
            .field("oracle", &self.oracle.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BookingAgent {
    pub fn new(
        store: Arc<dyn Datastore>,
        flags: FeatureFlagService,
        orchestrator: Arc<BookingOrchestrator>,
        oracle: Option<Arc<dyn ChatOracle>>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            flags,
            orchestrator,
            oracle,
            config,
        }
    }

    async fn settings(&self, tenant_id: Uuid) -> AgentSettings {
        match self.store.get_agent_settings(tenant_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => self.default_settings(tenant_id),
            Err(e) => {
                warn!(%tenant_id, "Agent settings lookup failed, using defaults: {}", e);
                self.default_settings(tenant_id)
            }
        }
    }

    fn default_settings(&self, tenant_id: Uuid) -> AgentSettings {
        AgentSettings {
            tenant_id,
            persona: self.config.default_persona.clone(),
            bot_active: true,
            promo_asset_url: None,
        }
    }

    fn system_instruction(&self, tenant: &Tenant, settings: &AgentSettings) -> String {
        format!(
            "You are the booking assistant of \"{name}\".\n{persona}\n\n\
             Use listServices to look up services and prices. Before booking, call \
             checkAvailability for the requested time. Only call confirmBooking after the \
             customer has agreed to a service and a free time; pass the service id returned by \
             listServices and an ISO 8601 date and time. If the customer should receive our \
             promotional material, include {marker} in your answer.",
            name = tenant.name,
            persona = settings.persona,
            marker = self.config.promo_marker,
        )
    }

    pub async fn respond(
        &self,
        tenant_id: Uuid,
        request: ChatRequest,
    ) -> Result<ChatReply, SlotwiseError> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| not_found("Tenant not found"))?;

        let settings = self.settings(tenant_id).await;
        let Some(oracle) = self.oracle.as_ref() else {
            debug!(%tenant_id, "No oracle configured");
            return Ok(ChatReply::fixed(&self.config.offline_message));
        };
        if !settings.bot_active || !self.flags.is_enabled(&tenant, FeatureFlag::AiAgent).await {
            info!(%tenant_id, "Agent is offline for tenant");
            metrics::counter!("slotwise_chat_messages_total", "outcome" => "offline").increment(1);
            return Ok(ChatReply::fixed(&self.config.offline_message));
        }

        match self.converse(oracle.as_ref(), &tenant, &settings, &request).await {
            Ok((text, tokens_used)) => {
                let (response, marker_found) = self.strip_promo(&text);
                let send_promo = marker_found
                    && self.flags.is_enabled(&tenant, FeatureFlag::PromoAssets).await;
                self.charge(tenant_id).await;
                metrics::counter!("slotwise_chat_messages_total", "outcome" => "answered")
                    .increment(1);
                Ok(ChatReply {
                    response,
                    send_promo,
                    tokens_used,
                })
            }
            Err(e) => {
                warn!(%tenant_id, "Oracle call failed: {}", e);
                metrics::counter!("slotwise_chat_messages_total", "outcome" => "failed")
                    .increment(1);
                Ok(ChatReply::fixed(&self.config.apology_message))
            }
        }
    }

    /// Returns the final model text and total token usage.
    async fn converse(
        &self,
        oracle: &dyn ChatOracle,
        tenant: &Tenant,
        settings: &AgentSettings,
        request: &ChatRequest,
    ) -> Result<(String, u64), OracleError> {
        let mut contents = request.history.clone();
        contents.push(ChatTurn {
            role: ChatRole::User,
            text: request.message.clone(),
        });
        let system_instruction = self.system_instruction(tenant, settings);

        let first = oracle
            .generate(OracleRequest {
                system_instruction: system_instruction.clone(),
                contents: contents.clone(),
                functions: declarations(),
            })
            .await?;
        if first.function_calls.is_empty() {
            return Ok((first.text, first.tokens_used));
        }

        let runner = FunctionRunner {
            store: self.store.as_ref(),
            orchestrator: self.orchestrator.as_ref(),
            tenant_id: tenant.id,
            customer_phone: request.customer_phone.as_deref(),
            slot_minutes: self.config.slot_minutes,
        };
        let mut results = Vec::with_capacity(first.function_calls.len());
        for call in &first.function_calls {
            let result = runner.run(call).await;
            results.push(format!(
                "The result of function {} was: {}. Inform the customer.",
                call.name, result
            ));
        }

        if !first.text.is_empty() {
            contents.push(ChatTurn {
                role: ChatRole::Assistant,
                text: first.text.clone(),
            });
        }
        contents.push(ChatTurn {
            role: ChatRole::User,
            text: results.join("\n"),
        });

        // The follow-up round only phrases the results, so no functions are offered.
        let second = oracle
            .generate(OracleRequest {
                system_instruction,
                contents,
                functions: Vec::new(),
            })
            .await?;
        Ok((second.text, first.tokens_used + second.tokens_used))
    }

    fn strip_promo(&self, text: &str) -> (String, bool) {
        let marker = self.config.promo_marker.as_str();
        if marker.is_empty() || !text.contains(marker) {
            return (text.trim().to_string(), false);
        }
        (text.replace(marker, "").trim().to_string(), true)
    }

    async fn charge(&self, tenant_id: Uuid) {
        if self.config.credits_per_message <= 0 {
            return;
        }
        match self
            .store
            .debit_credits(tenant_id, self.config.credits_per_message)
            .await
        {
            Ok(Some(balance)) => debug!(%tenant_id, balance, "Credits debited"),
            Ok(None) => warn!(%tenant_id, "Tenant vanished before debit"),
            Err(e) => warn!(%tenant_id, "Credit debit failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{FunctionCall, MockChatOracle, OracleReply};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use slotwise_access::{AccessGate, AuditLogger};
    use slotwise_common::models::{NewAppointment, PlanTier, Service};
    use slotwise_booking::Caller;
    use slotwise_db::MemoryDatastore;

    struct Setup {
        store: Arc<MemoryDatastore>,
        flags: FeatureFlagService,
        orchestrator: Arc<BookingOrchestrator>,
        tenant: Tenant,
        service: Service,
    }

    async fn setup(plan: PlanTier) -> Setup {
        let store = Arc::new(MemoryDatastore::new());
        let (audit, _writer) = AuditLogger::spawn(store.clone(), 16);
        let gate = Arc::new(AccessGate::new(store.clone(), audit));
        let flags = FeatureFlagService::new(store.clone());
        let orchestrator = Arc::new(BookingOrchestrator::new(
            store.clone(),
            gate,
            flags.clone(),
            None,
        ));
        let mut tenant = Tenant::new("Studio Nord", plan);
        tenant.credits = 10;
        store.insert_tenant(&tenant).await.unwrap();
        let service = Service {
            id: Uuid::new_v4(),
            tenant_id: tenant.id,
            name: "Massage".into(),
            price: 80.0,
            duration_minutes: 60,
        };
        store.insert_service(&service).await.unwrap();
        Setup {
            store,
            flags,
            orchestrator,
            tenant,
            service,
        }
    }

    fn agent(s: &Setup, oracle: MockChatOracle) -> BookingAgent {
        BookingAgent::new(
            s.store.clone(),
            s.flags.clone(),
            s.orchestrator.clone(),
            Some(Arc::new(oracle)),
            ChatConfig::default(),
        )
    }

    fn ask(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.into(),
            history: vec![],
            customer_phone: Some("+41791112233".into()),
        }
    }

    fn text(reply: &str, tokens: u64) -> OracleReply {
        OracleReply {
            text: reply.into(),
            function_calls: vec![],
            tokens_used: tokens,
        }
    }

    #[tokio::test]
    async fn inactive_bot_never_calls_oracle() {
        let s = setup(PlanTier::Gold).await;
        s.store
            .upsert_agent_settings(&AgentSettings {
                tenant_id: s.tenant.id,
                persona: "Calm".into(),
                bot_active: false,
                promo_asset_url: None,
            })
            .await
            .unwrap();
        let mut oracle = MockChatOracle::new();
        oracle.expect_generate().never();

        let reply = agent(&s, oracle)
            .respond(s.tenant.id, ask("hello"))
            .await
            .unwrap();
        assert_eq!(reply.response, ChatConfig::default().offline_message);
        assert_eq!(reply.tokens_used, 0);
        assert!(!reply.send_promo);
    }

    #[tokio::test]
    async fn ai_flag_off_is_offline() {
        let s = setup(PlanTier::Gold).await;
        s.flags
            .set_override(s.tenant.id, FeatureFlag::AiAgent, false)
            .await
            .unwrap();
        let mut oracle = MockChatOracle::new();
        oracle.expect_generate().never();

        let reply = agent(&s, oracle)
            .respond(s.tenant.id, ask("hello"))
            .await
            .unwrap();
        assert_eq!(reply.tokens_used, 0);
        assert_eq!(reply.response, ChatConfig::default().offline_message);
    }

    #[tokio::test]
    async fn oracle_failure_becomes_apology() {
        let s = setup(PlanTier::Gold).await;
        let mut oracle = MockChatOracle::new();
        oracle.expect_generate().times(1).returning(|_| {
            Err(OracleError::Api {
                status_code: 503,
                message: "overloaded".into(),
            })
        });

        let reply = agent(&s, oracle)
            .respond(s.tenant.id, ask("hello"))
            .await
            .unwrap();
        assert_eq!(reply.response, ChatConfig::default().apology_message);
        assert_eq!(reply.tokens_used, 0);
        let tenant = s.store.get_tenant(s.tenant.id).await.unwrap().unwrap();
        assert_eq!(tenant.credits, 10);
    }

    #[tokio::test]
    async fn plain_answer_debits_one_credit() {
        let s = setup(PlanTier::Gold).await;
        let mut oracle = MockChatOracle::new();
        oracle
            .expect_generate()
            .withf(|req| {
                req.system_instruction.contains("Studio Nord")
                    && req.contents.last().map(|t| t.text.as_str()) == Some("hello")
            })
            .times(1)
            .returning(|_| Ok(text(" Hi there! ", 12)));

        let reply = agent(&s, oracle)
            .respond(s.tenant.id, ask("hello"))
            .await
            .unwrap();
        assert_eq!(reply.response, "Hi there!");
        assert_eq!(reply.tokens_used, 12);
        let tenant = s.store.get_tenant(s.tenant.id).await.unwrap().unwrap();
        assert_eq!(tenant.credits, 9);
    }

    #[tokio::test]
    async fn confirm_booking_runs_and_result_is_fed_back() {
        let s = setup(PlanTier::Gold).await;
        let service_id = s.service.id;
        let mut oracle = MockChatOracle::new();
        let mut seq = mockall::Sequence::new();
        oracle
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| {
                Ok(OracleReply {
                    text: String::new(),
                    function_calls: vec![FunctionCall {
                        name: "confirmBooking".into(),
                        args: json!({
                            "customerName": "Lena",
                            "serviceId": service_id.to_string(),
                            "dateTimeIso": "2025-06-02T10:00:00Z"
                        }),
                    }],
                    tokens_used: 20,
                })
            });
        oracle
            .expect_generate()
            .withf(|req| {
                req.functions.is_empty()
                    && req.contents.last().map(|t| t.text.as_str())
                        == Some("The result of function confirmBooking was: confirmed. Inform the customer.")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text("You're booked for Monday at 10:00.", 15)));

        let reply = agent(&s, oracle)
            .respond(s.tenant.id, ask("Book me a massage Monday 10am, I'm Lena"))
            .await
            .unwrap();
        assert_eq!(reply.response, "You're booked for Monday at 10:00.");
        assert_eq!(reply.tokens_used, 35);

        let stored = s.store.list_appointments(s.tenant.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].customer_name, "Lena");
        assert_eq!(stored[0].customer_phone, "+41791112233");
        assert_eq!(stored[0].service_name, "Massage");
    }

    #[tokio::test]
    async fn long_booking_blocks_its_whole_duration() {
        let s = setup(PlanTier::Gold).await;
        let colour = Service {
            id: Uuid::new_v4(),
            tenant_id: s.tenant.id,
            name: "Full colour".into(),
            price: 190.0,
            duration_minutes: 180,
        };
        s.store.insert_service(&colour).await.unwrap();
        s.orchestrator
            .create_appointment(
                Caller::Agent {
                    tenant_id: s.tenant.id,
                },
                s.tenant.id,
                NewAppointment {
                    customer_name: "Existing".into(),
                    customer_phone: String::new(),
                    service_id: colour.id,
                    service_name: None,
                    date_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
                    status: None,
                    value: None,
                },
            )
            .await
            .unwrap();

        let runner = FunctionRunner {
            store: s.store.as_ref(),
            orchestrator: s.orchestrator.as_ref(),
            tenant_id: s.tenant.id,
            customer_phone: None,
            slot_minutes: 60,
        };
        let check = |at: &str| FunctionCall {
            name: "checkAvailability".into(),
            args: json!({ "dateTimeIso": at }),
        };
        assert_eq!(runner.run(&check("2025-06-02T11:30:00Z")).await, "occupied");
        assert_eq!(runner.run(&check("2025-06-02T12:30:00Z")).await, "occupied");
        assert_eq!(runner.run(&check("2025-06-02T13:00:00Z")).await, "available");
        assert_eq!(runner.run(&check("2025-06-02T09:00:00Z")).await, "available");
    }

    #[tokio::test]
    async fn availability_uses_window_overlap() {
        let s = setup(PlanTier::Gold).await;
        s.orchestrator
            .create_appointment(
                Caller::Agent {
                    tenant_id: s.tenant.id,
                },
                s.tenant.id,
                NewAppointment {
                    customer_name: "Existing".into(),
                    customer_phone: String::new(),
                    service_id: s.service.id,
                    service_name: None,
                    date_time: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
                    status: None,
                    value: None,
                },
            )
            .await
            .unwrap();

        let mut oracle = MockChatOracle::new();
        let mut seq = mockall::Sequence::new();
        oracle
            .expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(OracleReply {
                    text: String::new(),
                    function_calls: vec![
                        FunctionCall {
                            name: "checkAvailability".into(),
                            args: json!({ "dateTimeIso": "2025-06-02T10:30:00Z" }),
                        },
                        FunctionCall {
                            name: "checkAvailability".into(),
                            args: json!({ "dateTimeIso": "2025-06-02T11:00:00Z" }),
                        },
                    ],
                    tokens_used: 5,
                })
            });
        oracle
            .expect_generate()
            .withf(|req| {
                let last = req.contents.last().map(|t| t.text.as_str()).unwrap_or("");
                last == "The result of function checkAvailability was: occupied. Inform the customer.\n\
                         The result of function checkAvailability was: available. Inform the customer."
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(text("10:30 is taken, 11:00 is free.", 5)));

        let reply = agent(&s, oracle)
            .respond(s.tenant.id, ask("Is 10:30 or 11:00 free?"))
            .await
            .unwrap();
        assert_eq!(reply.response, "10:30 is taken, 11:00 is free.");
    }

    #[tokio::test]
    async fn promo_marker_is_stripped_and_gated_by_plan() {
        for (plan, expected) in [(PlanTier::Gold, true), (PlanTier::Bronze, false)] {
            let s = setup(plan).await;
            let mut oracle = MockChatOracle::new();
            oracle
                .expect_generate()
                .returning(|_| Ok(text("Here is our offer! [SEND_PROMO]", 3)));

            let reply = agent(&s, oracle)
                .respond(s.tenant.id, ask("any deals?"))
                .await
                .unwrap();
            assert_eq!(reply.response, "Here is our offer!");
            assert_eq!(reply.send_promo, expected);
        }
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let s = setup(PlanTier::Gold).await;
        let mut oracle = MockChatOracle::new();
        oracle.expect_generate().never();
        let err = agent(&s, oracle)
            .respond(Uuid::new_v4(), ask("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlotwiseError::NotFound(_)));
    }
}
