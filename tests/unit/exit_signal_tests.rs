//! Unit tests for `exit()` normalization.

use cgi_shim::exit::{exit, ExitSignal, Interrupt};
use cgi_shim::AppError;
use serde_json::json;

#[test]
fn numeric_code_is_carried() {
    assert!(matches!(
        exit(Some(&json!(5))),
        Interrupt::Exit(ExitSignal { code: 5 })
    ));
}

#[test]
fn string_code_becomes_zero() {
    assert!(matches!(
        exit(Some(&json!("x"))),
        Interrupt::Exit(ExitSignal { code: 0 })
    ));
}

#[test]
fn missing_code_becomes_zero() {
    assert_eq!(ExitSignal::from_value(None), ExitSignal::default());
}

#[test]
fn boolean_code_becomes_zero() {
    assert_eq!(ExitSignal::from_value(Some(&json!(true))).code, 0);
}

#[test]
fn app_error_converts_to_fatal_interrupt() {
    let interrupt: Interrupt = AppError::Session("gone".into()).into();
    assert!(matches!(interrupt, Interrupt::Fatal(AppError::Session(_))));
}
