// --- File: crates/services/slotwise_backend/src/lib.rs ---
pub mod app_state;
pub mod health;
pub mod telemetry;
pub mod rate_limit;

pub use app_state::{AppState, StartupError};
pub use telemetry::MetricsState;
pub use rate_limit::RateLimitState;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Assembles the HTTP surface: API routes under `/api`, health and metrics at the root.
pub fn build_app(state: &AppState, metrics: MetricsState, limits: RateLimitState) -> Router {
    let mut api = Router::new()
        .route("/", get(|| async { "Welcome to the Slotwise API!" }))
        .merge(slotwise_booking::routes::routes(state.booking_state()))
        .merge(slotwise_access::routes::routes(state.access_state()))
        .merge(slotwise_chat::routes::routes(state.chat_state()));

    if let Some(gcal_state) = state.gcal_state() {
        let callback = slotwise_gcal::routes::callback_routes(gcal_state.clone()).layer(
            middleware::from_fn_with_state(limits, rate_limit::rate_limit_middleware),
        );
        api = api
            .merge(slotwise_gcal::routes::routes(gcal_state))
            .merge(callback);
    } else {
        info!("Calendar routes not mounted");
    }

    #[allow(unused_mut)] // mutated only with the openapi feature
    let mut app = Router::new()
        .nest("/api", api)
        .merge(health::routes(state.store.clone()))
        .merge(telemetry::routes(metrics));

    #[cfg(feature = "openapi")]
    {
        app = app.merge(swagger_ui());
    }

    app.layer(middleware::from_fn(telemetry::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(feature = "openapi")]
fn swagger_ui() -> utoipa_swagger_ui::SwaggerUi {
    use slotwise_access::doc::AccessApiDoc;
    use slotwise_booking::doc::BookingApiDoc;
    use slotwise_chat::doc::ChatApiDoc;
    use slotwise_gcal::doc::GcalApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    #[derive(OpenApi)]
    #[openapi(
        info(
            title = "Slotwise API",
            version = "0.1.0",
            description = "Multi-tenant appointment scheduling API",
            license(name = "MIT", url = "https://opensource.org/licenses/MIT")
        ),
        tags((name = "Slotwise", description = "Core service endpoints")),
        servers((url = "/api", description = "Main API Prefix")),
    )]
    struct ApiDoc;

    let mut openapi_doc = ApiDoc::openapi();
    openapi_doc.merge(BookingApiDoc::openapi());
    openapi_doc.merge(AccessApiDoc::openapi());
    openapi_doc.merge(ChatApiDoc::openapi());
    openapi_doc.merge(GcalApiDoc::openapi());
    info!("Adding Swagger UI at /api/docs");

    SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc)
}
