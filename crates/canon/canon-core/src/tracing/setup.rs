//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the Canon tracing/logging system.
///
/// Reads the `CANON_LOG` environment variable for per-subsystem log levels.
/// Format: `CANON_LOG=canon_analysis=debug,canon_storage=warn`
///
/// Falls back to `canon=info` if `CANON_LOG` is not set or is invalid.
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("CANON_LOG").unwrap_or_else(|_| EnvFilter::new("canon=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}
