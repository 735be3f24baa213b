//! Test assertion macros and helpers.

use crate::error::VistaError;
use crate::variable::{VariableStateMap, VariableValue};

/// Assert that a result is Ok.
///
/// ```ignore
/// assert_ok!(store.set_variable_value("env", Some("prod".into()), None));
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: {}: expected Ok, got Err({:?})", format_args!($($arg)+), e),
        }
    };
}

/// Assert that a result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match &$expr {
            Err(_) => (),
            Ok(v) => panic!("assertion failed: expected Err, got Ok({:?})", v),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match &$expr {
            Err(_) => (),
            Ok(v) => panic!("assertion failed: {}: expected Err, got Ok({:?})", format_args!($($arg)+), v),
        }
    };
}

/// Assert that an error matches a specific variant.
///
/// ```ignore
/// assert_err_variant!(store.state("missing", None), VistaError::VariableNotFound { .. });
/// ```
#[macro_export]
macro_rules! assert_err_variant {
    ($expr:expr, $variant:pat) => {
        match &$expr {
            Err($variant) => (),
            Err(e) => panic!(
                "assertion failed: expected {}, got {:?}",
                stringify!($variant),
                e
            ),
            Ok(v) => panic!(
                "assertion failed: expected Err({}), got Ok({:?})",
                stringify!($variant),
                v
            ),
        }
    };
}

/// Check if an error message contains a substring.
pub fn error_contains(error: &VistaError, substring: &str) -> bool {
    error.to_string().contains(substring)
}

/// Scalar value of `name` in a state map, if any.
pub fn single_value<'a>(states: &'a VariableStateMap, name: &str) -> Option<&'a str> {
    states
        .get(name)
        .and_then(|state| state.value.as_ref())
        .and_then(VariableValue::as_single)
}

/// Partial JSON match: objects in `pattern` only need a subset of the keys.
pub fn assert_json_matches(actual: &serde_json::Value, pattern: &serde_json::Value) -> bool {
    match (actual, pattern) {
        (serde_json::Value::Object(a), serde_json::Value::Object(p)) => p
            .iter()
            .all(|(key, expected)| a.get(key).is_some_and(|v| assert_json_matches(v, expected))),
        (serde_json::Value::Array(a), serde_json::Value::Array(p)) => {
            a.len() == p.len() && a.iter().zip(p.iter()).all(|(a, p)| assert_json_matches(a, p))
        }
        (a, p) => a == p,
    }
}
