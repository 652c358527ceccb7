// File: crates/slotwise_booking/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{AppointmentList, CreateAppointmentRequest, DeleteResponse};
use crate::orchestrator::CreatedAppointment;
use slotwise_common::models::{Appointment, AppointmentStatus, NewAppointment};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_appointment_handler,
        crate::handlers::list_appointments_handler,
        crate::handlers::delete_appointment_handler
    ),
    components(
        schemas(
            NewAppointment,
            Appointment,
            AppointmentStatus,
            CreateAppointmentRequest,
            CreatedAppointment,
            AppointmentList,
            DeleteResponse
        )
    ),
    tags(
        (name = "Appointments", description = "Booking and calendar sync status")
    ),
    servers(
        (url = "/api", description = "Slotwise API server")
    )
)]
pub struct BookingApiDoc;
