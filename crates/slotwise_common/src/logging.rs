//! Logging setup for the Slotwise services.
//!
//! Every binary calls [`init`] or [`init_with_level`] once at startup. `RUST_LOG`
//! directives are honoured on top of the default level for the `slotwise` crates.

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
///
/// ```
/// use slotwise_common::logging;
///
/// logging::init();
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific level for the workspace crates.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_with_level(level: Level) {
    let mut filter = EnvFilter::from_default_env();
    for krate in [
        "slotwise_backend",
        "slotwise_booking",
        "slotwise_chat",
        "slotwise_gcal",
        "slotwise_access",
        "slotwise_db",
        "slotwise_vault",
        "slotwise_common",
        "slotwise_config",
    ] {
        if let Ok(directive) = format!("{}={}", krate, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}
