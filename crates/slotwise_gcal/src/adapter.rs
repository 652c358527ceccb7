// --- File: crates/slotwise_gcal/src/adapter.rs ---
//! Google Calendar implementation of [`CalendarProvider`].
//!
//! Each call decrypts the tenant's token blob, refreshes it when expired and
//! builds a hub authenticated with the access token. A refreshed token is
//! re-encrypted and handed back for the caller to persist.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use google_calendar3::api::{Event, EventAttendee, EventDateTime, EventReminder, EventReminders};
use slotwise_common::services::{
    CalendarError, CalendarProvider, CreatedEvent, EventDetails, Rotated,
};
use slotwise_common::{is_window_free, HTTP_CLIENT};
use slotwise_config::GcalConfig;
use slotwise_vault::{OAuthToken, TokenVault};
use tracing::{debug, info, warn};

use crate::auth::{
    authorization_url, create_calendar_hub, create_http_client, exchange_code,
    refresh_access_token, HttpClient, HubType,
};

/// Reminder overrides put on every booked event: (method, minutes before).
pub const EVENT_REMINDERS: [(&str, i32); 2] = [("email", 24 * 60), ("popup", 30)];

const SEND_UPDATES: &str = "all";

pub struct GoogleCalendarAdapter {
    config: GcalConfig,
    vault: TokenVault,
    http: reqwest::Client,
    hub_client: HttpClient,
    time_zone: Tz,
}

impl std::fmt::Debug for GoogleCalendarAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarAdapter")
            .field("calendar_id", &self.config.calendar_id)
            .field("time_zone", &self.time_zone)
            .finish_non_exhaustive()
    }
}

impl GoogleCalendarAdapter {
    pub fn new(config: GcalConfig, vault: TokenVault) -> Result<Self, CalendarError> {
        let time_zone = config.time_zone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "Unknown time zone '{}' in gcal config, falling back to UTC",
                config.time_zone
            );
            Tz::UTC
        });
        Ok(Self {
            http: HTTP_CLIENT.clone(),
            hub_client: create_http_client()?,
            config,
            vault,
            time_zone,
        })
    }

    /// Opens the blob, refreshing the access token when it has expired.
    async fn authorize(&self, token_blob: &str) -> Result<(HubType, Option<String>), CalendarError> {
        let token = self
            .vault
            .open_token(token_blob)
            .await
            .map_err(|e| CalendarError::Decryption(e.to_string()))?;

        let (token, rotated) = if token.is_expired(Utc::now()) && token.can_refresh() {
            let fresh = refresh_access_token(&self.http, &self.config, &token).await?;
            let blob = self.seal(fresh.clone()).await?;
            info!("Calendar access token refreshed");
            (fresh, Some(blob))
        } else {
            (token, None)
        };

        let hub = create_calendar_hub(
            &self.hub_client,
            token.access_token,
            self.config.api_base_url.as_deref(),
        );
        Ok((hub, rotated))
    }

    async fn seal(&self, token: OAuthToken) -> Result<String, CalendarError> {
        self.vault
            .seal_token(token)
            .await
            .map_err(|e| CalendarError::Configuration(format!("could not encrypt token: {e}")))
    }

    fn event_time(&self, at: DateTime<Utc>) -> EventDateTime {
        EventDateTime {
            date_time: Some(at),
            time_zone: Some(self.time_zone.name().to_string()),
            ..Default::default()
        }
    }

    fn build_event(&self, details: &EventDetails) -> Event {
        Event {
            summary: Some(details.summary.clone()),
            description: details.description.clone(),
            start: Some(self.event_time(details.start)),
            end: Some(self.event_time(details.end)),
            attendees: (!details.attendees.is_empty()).then(|| {
                details
                    .attendees
                    .iter()
                    .map(|email| EventAttendee {
                        email: Some(email.clone()),
                        ..Default::default()
                    })
                    .collect()
            }),
            reminders: Some(EventReminders {
                use_default: Some(false),
                overrides: Some(
                    EVENT_REMINDERS
                        .iter()
                        .map(|(method, minutes)| EventReminder {
                            method: Some((*method).to_string()),
                            minutes: Some(*minutes),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn sync_error(e: google_calendar3::Error) -> CalendarError {
    CalendarError::Sync(e.to_string())
}

/// Google reports an already-removed event as 404 or 410.
fn is_gone(e: &google_calendar3::Error) -> bool {
    match e {
        google_calendar3::Error::BadRequest(body) => matches!(
            body.pointer("/error/code").and_then(|c| c.as_u64()),
            Some(404) | Some(410)
        ),
        google_calendar3::Error::Failure(response) => {
            matches!(response.status().as_u16(), 404 | 410)
        }
        _ => false,
    }
}

fn bound(at: Option<&EventDateTime>) -> Option<DateTime<Utc>> {
    let at = at?;
    at.date_time.or_else(|| {
        at.date
            .and_then(|d: NaiveDate| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

/// Busy windows of non-cancelled events.
pub fn busy_windows(events: &[Event]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    events
        .iter()
        .filter(|e| e.status.as_deref() != Some("cancelled"))
        .filter_map(|e| Some((bound(e.start.as_ref())?, bound(e.end.as_ref())?)))
        .collect()
}

#[async_trait]
impl CalendarProvider for GoogleCalendarAdapter {
    fn auth_url(&self) -> Result<String, CalendarError> {
        authorization_url(&self.config)
    }

    async fn tokens_from_code(&self, code: &str) -> Result<String, CalendarError> {
        let token = exchange_code(&self.http, &self.config, code).await?;
        if token.refresh_token.is_none() {
            warn!("Token response carried no refresh token; sync stops once it expires");
        }
        self.seal(token).await
    }

    async fn create_event(
        &self,
        token_blob: &str,
        event: &EventDetails,
        calendar_id: &str,
    ) -> Result<Rotated<CreatedEvent>, CalendarError> {
        let (hub, rotated_token) = self.authorize(token_blob).await?;
        let (_response, created) = hub
            .events()
            .insert(self.build_event(event), calendar_id)
            .send_updates(SEND_UPDATES)
            .doit()
            .await
            .map_err(sync_error)?;

        let id = created
            .id
            .ok_or_else(|| CalendarError::Sync("created event has no id".to_string()))?;
        debug!(event_id = %id, "Calendar event created");
        Ok(Rotated {
            value: CreatedEvent {
                id,
                link: created.html_link,
            },
            rotated_token,
        })
    }

    async fn check_availability(
        &self,
        token_blob: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        calendar_id: &str,
    ) -> Result<Rotated<bool>, CalendarError> {
        let (hub, rotated_token) = self.authorize(token_blob).await?;
        let (_response, events) = hub
            .events()
            .list(calendar_id)
            .time_min(time_min)
            .time_max(time_max)
            .single_events(true)
            .order_by("startTime")
            .doit()
            .await
            .map_err(sync_error)?;

        let items = events.items.unwrap_or_default();
        let free = is_window_free(time_min, time_max, busy_windows(&items));
        Ok(Rotated {
            value: free,
            rotated_token,
        })
    }

    async fn delete_event(
        &self,
        token_blob: &str,
        event_id: &str,
        calendar_id: &str,
    ) -> Result<Rotated<()>, CalendarError> {
        let (hub, rotated_token) = self.authorize(token_blob).await?;
        match hub
            .events()
            .delete(calendar_id, event_id)
            .send_updates(SEND_UPDATES)
            .doit()
            .await
        {
            Ok(_) => {}
            Err(e) if is_gone(&e) => {
                debug!(%event_id, "Calendar event already removed");
            }
            Err(e) => return Err(sync_error(e)),
        }
        Ok(Rotated {
            value: (),
            rotated_token,
        })
    }

    fn calendar_id(&self) -> &str {
        &self.config.calendar_id
    }
}
