// --- File: crates/slotwise_chat/src/functions.rs ---
//! The functions the model may call, and their execution against live data.
//!
//! Every result is a plain string that is fed back to the model; nothing here
//! is shown to the customer directly.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::{json, Value};
use slotwise_booking::{BookingOrchestrator, Caller};
use slotwise_common::is_window_free;
use slotwise_common::models::{AppointmentStatus, NewAppointment};
use slotwise_db::Datastore;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::oracle::{FunctionCall, FunctionDeclaration};

pub const LIST_SERVICES: &str = "listServices";
pub const CHECK_AVAILABILITY: &str = "checkAvailability";
pub const CONFIRM_BOOKING: &str = "confirmBooking";

pub const AVAILABLE: &str = "available";
pub const OCCUPIED: &str = "occupied";
pub const CONFIRMED: &str = "confirmed";

pub fn declarations() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration {
            name: LIST_SERVICES.to_string(),
            description: "Lists the services offered by the business with their prices."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "confirm": { "type": "boolean", "description": "Always true." }
                },
                "required": ["confirm"]
            }),
        },
        FunctionDeclaration {
            name: CHECK_AVAILABILITY.to_string(),
            description: "Checks whether a date and time is free for a booking.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "dateTimeIso": { "type": "string", "description": "ISO 8601 date and time." }
                },
                "required": ["dateTimeIso"]
            }),
        },
        FunctionDeclaration {
            name: CONFIRM_BOOKING.to_string(),
            description: "Books an appointment once the customer has agreed to service and time."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customerName": { "type": "string" },
                    "serviceId": { "type": "string" },
                    "dateTimeIso": { "type": "string", "description": "ISO 8601 date and time." }
                },
                "required": ["customerName", "serviceId", "dateTimeIso"]
            }),
        },
    ]
}

/// Accepts RFC 3339, or a naive local timestamp read as UTC.
pub fn parse_date_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Runs function calls for one tenant's conversation.
pub struct FunctionRunner<'a> {
    pub store: &'a dyn Datastore,
    pub orchestrator: &'a BookingOrchestrator,
    pub tenant_id: Uuid,
    pub customer_phone: Option<&'a str>,
    pub slot_minutes: i64,
}

impl FunctionRunner<'_> {
    pub async fn run(&self, call: &FunctionCall) -> String {
        debug!(tenant_id = %self.tenant_id, function = %call.name, "Running function call");
        metrics::counter!("slotwise_chat_function_calls_total", "function" => call.name.clone())
            .increment(1);
        match call.name.as_str() {
            LIST_SERVICES => self.list_services().await,
            CHECK_AVAILABILITY => self.check_availability(&call.args).await,
            CONFIRM_BOOKING => self.confirm_booking(&call.args).await,
            other => {
                warn!(function = other, "Model called an undeclared function");
                format!("error: unknown function {other}")
            }
        }
    }

    async fn list_services(&self) -> String {
        match self.store.list_services(self.tenant_id).await {
            Ok(services) if services.is_empty() => "No services are configured.".to_string(),
            Ok(services) => services
                .iter()
                .map(|s| {
                    format!(
                        "{} (id: {}, price: {:.2}, {} min)",
                        s.name, s.id, s.price, s.duration_minutes
                    )
                })
                .collect::<Vec<_>>()
                .join("; "),
            Err(e) => {
                warn!(tenant_id = %self.tenant_id, "Service lookup failed: {}", e);
                "error: services are unavailable".to_string()
            }
        }
    }

    async fn check_availability(&self, args: &Value) -> String {
        let Some(start) = string_arg(args, "dateTimeIso").and_then(parse_date_time) else {
            return "error: invalid dateTimeIso".to_string();
        };
        let slot = Duration::minutes(self.slot_minutes.max(1));
        let lookup = match self.store.list_appointments(self.tenant_id).await {
            Ok(appointments) => self
                .store
                .list_services(self.tenant_id)
                .await
                .map(|services| (appointments, services)),
            Err(e) => Err(e),
        };
        let (appointments, services) = match lookup {
            Ok(found) => found,
            Err(e) => {
                warn!(tenant_id = %self.tenant_id, "Availability lookup failed: {}", e);
                return "error: availability is unavailable".to_string();
            }
        };
        // Booked appointments occupy their service's duration; unknown services a slot.
        let durations: HashMap<Uuid, Duration> = services
            .iter()
            .filter(|s| s.duration_minutes > 0)
            .map(|s| (s.id, Duration::minutes(s.duration_minutes)))
            .collect();
        let busy = appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .map(|a| {
                let length = durations.get(&a.service_id).copied().unwrap_or(slot);
                (a.date_time, a.date_time + length)
            });
        if is_window_free(start, start + slot, busy) {
            AVAILABLE.to_string()
        } else {
            OCCUPIED.to_string()
        }
    }

    async fn confirm_booking(&self, args: &Value) -> String {
        let Some(customer_name) = string_arg(args, "customerName") else {
            return "error: customerName is required".to_string();
        };
        let Some(service_id) = string_arg(args, "serviceId").and_then(|s| Uuid::parse_str(s).ok())
        else {
            return "error: invalid serviceId".to_string();
        };
        let Some(date_time) = string_arg(args, "dateTimeIso").and_then(parse_date_time) else {
            return "error: invalid dateTimeIso".to_string();
        };

        let input = NewAppointment {
            customer_name: customer_name.to_string(),
            customer_phone: self.customer_phone.unwrap_or_default().to_string(),
            service_id,
            service_name: None,
            date_time,
            status: None,
            value: None,
        };
        match self
            .orchestrator
            .create_appointment(
                Caller::Agent {
                    tenant_id: self.tenant_id,
                },
                self.tenant_id,
                input,
            )
            .await
        {
            Ok(_) => CONFIRMED.to_string(),
            Err(e) => format!("error: {e}"),
        }
    }
}
