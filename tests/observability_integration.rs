//! Runs in its own test binary: installing the global tracing subscriber
//! would otherwise collide with `#[traced_test]` in the unit-test binary.

use qti_delivery::observability::{init_tracing, init_tracing_with};
use qti_delivery::types::ObservabilityConfig;

#[test]
fn init_tracing_is_idempotent() {
    init_tracing();
    init_tracing_with(&ObservabilityConfig::default());
    init_tracing();
}
