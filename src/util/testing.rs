//! Logging setup shared by unit and integration tests

use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{fmt, fmt::format::FmtSpan, prelude::*, EnvFilter};

static TEST_SETUP: Once = Once::new();

/// Install a test subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `waldiez=debug`. Output goes through the
/// test writer so it is only shown for failing tests.
pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("waldiez=debug"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_test_writer()
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter),
        );

        if tracing::dispatcher::has_been_set() {
            debug!("tracing subscriber already set");
        } else if let Err(e) = subscriber.try_init() {
            eprintln!("failed to set up test logging: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_calls_when_init_test_setup_then_is_idempotent() {
        init_test_setup();
        init_test_setup();
    }
}
