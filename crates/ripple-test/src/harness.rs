//! Logging for tests.

use tracing_subscriber::EnvFilter;

/// Variable replacing the filter passed to [`setup_test_logging`], e.g.
/// `RIPPLE_TEST_LOG=ripple_events=trace cargo test`.
pub const TEST_LOG_ENV: &str = "RIPPLE_TEST_LOG";

/// Route `tracing` output to the captured output of the running test.
///
/// Only the first call in a test binary installs a subscriber; later calls
/// do nothing.
pub fn setup_test_logging(filter: &str) {
    let filter = std::env::var(TEST_LOG_ENV)
        .map_or_else(|_| EnvFilter::new(filter), EnvFilter::new);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .compact()
        .try_init();
}

/// Trace the event core crates, warnings elsewhere.
pub fn trace_event_core() {
    setup_test_logging("warn,ripple_supply=trace,ripple_events=trace");
}
