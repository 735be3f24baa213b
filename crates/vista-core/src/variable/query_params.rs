//! Variable values carried in URL query parameters (`var-{name}`).

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use url::form_urlencoded;

use super::value::VariableValue;

/// Parse a raw query string (`a=1&var-env=prod`) into decoded pairs.
///
/// A leading `?` is ignored and `+` decodes to a space.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

/// Collect raw variable values from query parameters, keyed by variable name.
///
/// Later occurrences of the same parameter win.
pub fn initial_values_from_query_params<I, K, V>(prefix: &str, params: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .into_iter()
        .filter_map(|(key, value)| {
            key.as_ref()
                .strip_prefix(prefix)
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_string(), value.as_ref().to_string()))
        })
        .collect()
}

/// Encode a value for its query parameter; arrays are comma-joined.
///
/// `None` means the parameter should be removed.
pub fn encode_variable_query_value(value: Option<&VariableValue>) -> Option<String> {
    value.map(|value| match value {
        VariableValue::Single(v) => v.clone(),
        VariableValue::Multiple(vs) => vs.join(","),
    })
}

/// Destination of variable value changes, typically the browser history.
///
/// Writes are fire-and-forget: no acknowledgement, no retry.
pub trait QueryParamSink: Send + Sync {
    fn set_query_param(&self, name: &str, value: Option<String>);
}

/// In-memory [`QueryParamSink`] that keeps the latest value of each parameter.
#[derive(Debug, Default)]
pub struct RecordingQueryParams {
    writes: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write, in order.
    pub fn writes(&self) -> Vec<(String, Option<String>)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest value per parameter; removed parameters are absent.
    pub fn current(&self) -> HashMap<String, String> {
        let mut current = HashMap::new();
        for (name, value) in self.writes() {
            match value {
                Some(value) => {
                    current.insert(name, value);
                }
                None => {
                    current.remove(&name);
                }
            }
        }
        current
    }

    /// Render the current parameters as a query string, sorted by name.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = self.current().into_iter().collect();
        pairs.sort();
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }
}

impl QueryParamSink for RecordingQueryParams {
    fn set_query_param(&self, name: &str, value: Option<String>) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), value));
    }
}
