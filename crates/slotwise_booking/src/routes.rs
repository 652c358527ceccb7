// --- File: crates/slotwise_booking/src/routes.rs ---

use crate::handlers::{
    create_appointment_handler, delete_appointment_handler, list_appointments_handler,
    BookingState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Appointment routes, relative to `/api`.
///
/// `GET /appointments/{id}` takes a tenant id, `DELETE` an appointment id.
pub fn routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/appointments", post(create_appointment_handler))
        .route(
            "/appointments/{id}",
            get(list_appointments_handler).delete(delete_appointment_handler),
        )
        .with_state(state)
}
