//! Shared logging setup for services and tests.

/// Install the tracing subscriber once per process.
///
/// Later calls are no-ops, so every integration test can call this freely.
pub fn init() {
    tracing::init();
}

/// Subscriber wiring (filter, format).
pub mod tracing;
