use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::value::{normalize_all_value, VariableValue, ALL_VALUE};

/// Definition of a dashboard template variable.
///
/// Serialized as `{ "kind": "...", "spec": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec")]
pub enum VariableDefinition {
    TextVariable(TextVariableSpec),
    ListVariable(ListVariableSpec),
}

impl VariableDefinition {
    pub fn name(&self) -> &str {
        match self {
            VariableDefinition::TextVariable(spec) => &spec.name,
            VariableDefinition::ListVariable(spec) => &spec.name,
        }
    }

    pub fn display(&self) -> Option<&VariableDisplay> {
        match self {
            VariableDefinition::TextVariable(spec) => spec.display.as_ref(),
            VariableDefinition::ListVariable(spec) => spec.display.as_ref(),
        }
    }

    pub fn as_list(&self) -> Option<&ListVariableSpec> {
        match self {
            VariableDefinition::ListVariable(spec) => Some(spec),
            VariableDefinition::TextVariable(_) => None,
        }
    }

    /// The value persisted with the definition.
    pub fn saved_value(&self) -> Option<VariableValue> {
        match self {
            VariableDefinition::TextVariable(spec) => Some(VariableValue::Single(spec.value.clone())),
            VariableDefinition::ListVariable(spec) => spec.default_value.clone(),
        }
    }

    /// Decode a raw query parameter into a value shaped for this definition.
    ///
    /// Multi-select list variables carry their selection comma-joined.
    pub fn decode_query_value(&self, raw: &str) -> VariableValue {
        match self {
            VariableDefinition::ListVariable(spec) if spec.allow_multiple => VariableValue::Multiple(
                raw.split(',').map(str::to_string).collect(),
            ),
            _ => VariableValue::Single(raw.to_string()),
        }
    }
}

/// Display settings shared by every variable kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDisplay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<VariableDisplay>,
    #[serde(default)]
    pub value: String,
    /// A constant text variable cannot be edited from the dashboard.
    #[serde(default)]
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<VariableDisplay>,
    #[serde(default, alias = "default_value", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<VariableValue>,
    #[serde(default, alias = "allow_all_value")]
    pub allow_all_value: bool,
    #[serde(default, alias = "allow_multiple")]
    pub allow_multiple: bool,
    /// Replaces the option expansion of the "All" sentinel when set.
    #[serde(default, alias = "custom_all_value", skip_serializing_if = "Option::is_none")]
    pub custom_all_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginSpec>,
}

impl ListVariableSpec {
    /// Bring a value in line with this variable's cardinality.
    ///
    /// Single-select variables hold a scalar or nothing. Multi-select
    /// variables hold an array or the bare "All" sentinel.
    pub fn coerce_value(&self, value: Option<VariableValue>) -> Option<VariableValue> {
        let value = normalize_all_value(value);
        match value {
            Some(VariableValue::Multiple(values)) if !self.allow_multiple => {
                values.into_iter().next().map(VariableValue::Single)
            }
            Some(VariableValue::Single(v)) if self.allow_multiple && v != ALL_VALUE => {
                Some(VariableValue::Multiple(vec![v]))
            }
            other => other,
        }
    }
}

/// Reference to the plugin producing a list variable's options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub kind: String,
    #[serde(default)]
    pub spec: serde_json::Value,
}

/// Variables supplied from outside the dashboard (project, global, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalVariableDefinition {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<ExternalVariableTooltip>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_link: Option<String>,
    #[serde(default)]
    pub definitions: Vec<VariableDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalVariableTooltip {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Local definitions first, then external ones in source order, each name once.
pub fn merge_variable_definitions(
    local: &[VariableDefinition],
    external: &[ExternalVariableDefinition],
) -> Vec<VariableDefinition> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();

    let externals = external.iter().flat_map(|e| e.definitions.iter());
    for definition in local.iter().chain(externals) {
        if seen.insert(definition.name()) {
            merged.push(definition.clone());
        }
    }
    merged
}

/// Find the definition a name resolves to, local definitions taking priority.
pub fn find_variable_definition_by_name<'a>(
    name: &str,
    local: &'a [VariableDefinition],
    external: &'a [ExternalVariableDefinition],
) -> Option<&'a VariableDefinition> {
    local
        .iter()
        .chain(external.iter().flat_map(|e| e.definitions.iter()))
        .find(|d| d.name() == name)
}
