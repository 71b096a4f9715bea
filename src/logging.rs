//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter, e.g.
/// `SPOT_LOG=nightspot=debug,nightspot_core=info`.
pub const LOG_ENV: &str = "SPOT_LOG";

const DEFAULT_FILTER: &str = "info";

static INIT: Once = Once::new();

/// Install the global subscriber, writing to stderr so command output on
/// stdout stays machine-readable.
///
/// Falls back to `info` if `SPOT_LOG` is unset or invalid. Safe to call
/// more than once.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}
