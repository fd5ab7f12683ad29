#![forbid(unsafe_code)]

//! Run:
//!   cargo test -p taskboard --features tracing-json --test telemetry_init

use taskboard::Error;

#[test]
fn second_install_is_reported_not_panicked() {
    taskboard::telemetry::init_with_filter("taskboard_reconcile=debug").unwrap();
    tracing::info!("telemetry installed");
    let err = taskboard::telemetry::init().unwrap_err();
    assert!(matches!(err, Error::Telemetry(_)));
}
