use serde::Deserialize;
use serde_json::Value;

use super::builtin::AbsoluteTimeRange;
use super::state::VariableStateMap;
use super::value::VariableOption;
use crate::error::{Result, VistaError};
use crate::plugin::BoxFuture;

/// What a variable plugin may consult while computing options.
#[derive(Debug, Clone, Default)]
pub struct VariableOptionsContext {
    /// Resolved values of the other variables.
    pub variables: VariableStateMap,
    pub time_range: Option<AbsoluteTimeRange>,
}

/// Produces the options of a list variable from its plugin spec.
pub trait VariablePlugin: Send + Sync {
    fn get_variable_options<'a>(
        &'a self,
        spec: &'a Value,
        ctx: &'a VariableOptionsContext,
    ) -> BoxFuture<'a, Result<Vec<VariableOption>>>;

    /// Names of the variables the options depend on.
    fn depends_on(&self, _spec: &Value) -> Vec<String> {
        Vec::new()
    }
}

impl std::fmt::Debug for dyn VariablePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariablePlugin").finish_non_exhaustive()
    }
}

pub const STATIC_LIST_VARIABLE_KIND: &str = "StaticListVariable";

/// Options listed inline in the plugin spec: `{ "values": ["a", {"label": "B", "value": "b"}] }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticListVariable;

#[derive(Deserialize)]
struct StaticListSpec {
    #[serde(default)]
    values: Vec<StaticListValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StaticListValue {
    Plain(String),
    Option(VariableOption),
}

impl StaticListVariable {
    pub fn options(spec: &Value) -> Result<Vec<VariableOption>> {
        let spec = StaticListSpec::deserialize(spec).map_err(|e| {
            VistaError::InvalidArgument(format!("invalid {} spec: {}", STATIC_LIST_VARIABLE_KIND, e))
        })?;

        Ok(spec
            .values
            .into_iter()
            .map(|value| match value {
                StaticListValue::Plain(v) => VariableOption::from(v.as_str()),
                StaticListValue::Option(option) => option,
            })
            .collect())
    }
}

impl VariablePlugin for StaticListVariable {
    fn get_variable_options<'a>(
        &'a self,
        spec: &'a Value,
        _ctx: &'a VariableOptionsContext,
    ) -> BoxFuture<'a, Result<Vec<VariableOption>>> {
        Box::pin(async move { Self::options(spec) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_list_options() {
        let spec = json!({ "values": ["1m", { "label": "Five minutes", "value": "5m" }] });
        let ctx = VariableOptionsContext::default();
        let options = tokio_test::block_on(StaticListVariable.get_variable_options(&spec, &ctx)).unwrap();

        assert_eq!(
            options,
            vec![VariableOption::from("1m"), VariableOption::new("Five minutes", "5m")]
        );
        assert!(StaticListVariable.depends_on(&spec).is_empty());
    }

    #[test]
    fn test_static_list_rejects_bad_spec() {
        let err = StaticListVariable::options(&json!({ "values": [1, 2] })).unwrap_err();
        assert!(matches!(err, VistaError::InvalidArgument(_)));
        assert_eq!(StaticListVariable::options(&json!({})).unwrap(), vec![]);
    }
}
