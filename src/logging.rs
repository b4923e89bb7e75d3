//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; the binary (or a test) decides
//! where they go by calling [`init`] once.

use crate::constants::{DEFAULT_LOG_LEVEL, LOG_FORMAT_JSON};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise `default_level`
/// (falling back to `info`). `format` selects JSON output when it equals
/// `json`; anything else gives human-readable text.
///
/// Returns `false` if a subscriber was already installed, which is harmless
/// and common in tests.
pub fn init(format: &str, default_level: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.unwrap_or(DEFAULT_LOG_LEVEL)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if format == LOG_FORMAT_JSON {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init("text", Some("warn"));
        assert!(!init("json", Some("debug")));
    }
}
