//! Initial variable state from definitions and URL query parameters.
//!
//! Value priority: query parameter, then the definition's saved value, then
//! (once options are known) the first option.

use std::collections::{HashMap, HashSet};

use super::definition::{ExternalVariableDefinition, ListVariableSpec, VariableDefinition};
use super::state::{VariableState, VariableStateKey, VariableStoreStateMap};
use super::value::VariableValue;

/// Hydrate the state of a single variable.
///
/// `initial_value` is the raw, already percent-decoded query parameter.
/// An empty parameter counts as absent.
pub fn hydrate_variable_state(
    definition: &VariableDefinition,
    initial_value: Option<&str>,
) -> VariableState {
    let initial = initial_value
        .filter(|raw| !raw.is_empty())
        .map(|raw| definition.decode_query_value(raw));

    match definition {
        VariableDefinition::TextVariable(spec) => VariableState {
            value: initial.or_else(|| Some(VariableValue::Single(spec.value.clone()))),
            default_value: Some(VariableValue::Single(spec.value.clone())),
            ..Default::default()
        },
        VariableDefinition::ListVariable(spec) => {
            let mut state = VariableState {
                value: initial.or_else(|| spec.default_value.clone()),
                options: Some(Vec::new()),
                default_value: spec.default_value.clone(),
                ..Default::default()
            };
            select_first_option_if_unset(&mut state, spec);
            state.value = spec.coerce_value(state.value.take());
            state
        }
    }
}

/// Fall back to the first option when a list variable has no value yet.
///
/// Returns whether the value changed.
pub fn select_first_option_if_unset(state: &mut VariableState, spec: &ListVariableSpec) -> bool {
    let unset = state.value.as_ref().map_or(true, VariableValue::is_empty);
    if !unset {
        return false;
    }

    let Some(first) = state.options.as_ref().and_then(|options| options.first()) else {
        return false;
    };

    state.value = Some(if spec.allow_multiple {
        VariableValue::Multiple(vec![first.value.clone()])
    } else {
        VariableValue::Single(first.value.clone())
    });
    true
}

/// Build the state of every local and external variable.
///
/// External variables are hydrated first. A local variable sharing a name
/// with an external one is flagged `overriding` and the external one
/// `overridden`. Among external sources, earlier sources shadow later ones.
pub fn hydrate_variable_states(
    local: &[VariableDefinition],
    initial_values: &HashMap<String, String>,
    external: &[ExternalVariableDefinition],
) -> VariableStoreStateMap {
    let mut state = VariableStoreStateMap::new();

    let mut claimed: HashSet<&str> = local.iter().map(VariableDefinition::name).collect();
    let mut external_names: HashSet<&str> = HashSet::new();

    for external_def in external {
        for definition in &external_def.definitions {
            let name = definition.name();
            let initial = initial_values.get(name).map(String::as_str);
            state.set(
                &VariableStateKey::external(name, &external_def.source),
                VariableState {
                    overridden: claimed.contains(name),
                    ..hydrate_variable_state(definition, initial)
                },
            );
            claimed.insert(name);
            external_names.insert(name);
        }
    }

    for definition in local {
        let name = definition.name();
        let initial = initial_values.get(name).map(String::as_str);
        state.set(
            &VariableStateKey::local(name),
            VariableState {
                overriding: external_names.contains(name),
                ..hydrate_variable_state(definition, initial)
            },
        );
    }

    // Walk sources backwards so a source overriding a later one is flagged.
    let mut later: HashSet<&str> = HashSet::new();
    for external_def in external.iter().rev() {
        for definition in &external_def.definitions {
            let name = definition.name();
            let key = VariableStateKey::external(name, &external_def.source);
            if let Some(var_state) = state.get_mut(&key) {
                var_state.overriding = later.contains(name);
            }
            later.insert(name);
        }
    }

    state
}
