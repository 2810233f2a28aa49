//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the configuration supplies one.
pub const DEFAULT_LOG_FILTER: &str = "info,meridian=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `filter` when set. Returns `false` if a subscriber
/// was already installed (tests, repeated calls); that is not an error.
pub fn init(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
