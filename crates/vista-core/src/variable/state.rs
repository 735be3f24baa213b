use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value::{VariableOption, VariableValue};

/// Runtime state of one variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableState {
    pub value: Option<VariableValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<VariableOption>>,
    #[serde(default)]
    pub loading: bool,
    /// Message of the last failed options fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set on a local variable that shadows an external one.
    #[serde(default)]
    pub overriding: bool,
    /// Set on an external variable shadowed by a local or earlier source.
    #[serde(default)]
    pub overridden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<VariableValue>,
}

impl VariableState {
    /// A loaded state holding `value`.
    pub fn with_value(value: impl Into<VariableValue>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Option values, in option order.
    pub fn option_values(&self) -> Option<Vec<String>> {
        self.options
            .as_ref()
            .map(|options| options.iter().map(|o| o.value.clone()).collect())
    }
}

/// Flat variable states keyed by name, as handed to interpolation.
pub type VariableStateMap = HashMap<String, VariableState>;

/// Key of a variable in the [`VariableStoreStateMap`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableStateKey {
    pub name: String,
    /// Defined only for external variables.
    pub source: Option<String>,
}

impl VariableStateKey {
    pub fn new(name: impl Into<String>, source: Option<&str>) -> Self {
        Self {
            name: name.into(),
            source: source.map(str::to_string),
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn external(name: impl Into<String>, source: &str) -> Self {
        Self::new(name, Some(source))
    }
}

const LOCAL_SOURCE: &str = "";

/// Variable states indexed by source, then name.
///
/// Local variables live under the empty source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStoreStateMap {
    sources: HashMap<String, HashMap<String, VariableState>>,
}

impl VariableStoreStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &VariableStateKey) -> Option<&VariableState> {
        self.sources
            .get(source_name(key))
            .and_then(|states| states.get(&key.name))
    }

    pub fn get_mut(&mut self, key: &VariableStateKey) -> Option<&mut VariableState> {
        self.sources
            .get_mut(source_name(key))
            .and_then(|states| states.get_mut(&key.name))
    }

    /// Insert or replace, returning the previous state.
    pub fn set(&mut self, key: &VariableStateKey, state: VariableState) -> Option<VariableState> {
        self.sources
            .entry(source_name(key).to_string())
            .or_default()
            .insert(key.name.clone(), state)
    }

    pub fn has(&self, key: &VariableStateKey) -> bool {
        self.get(key).is_some()
    }

    /// Remove a state; an emptied source bucket is removed too.
    pub fn delete(&mut self, key: &VariableStateKey) -> bool {
        let source = source_name(key);
        let Some(states) = self.sources.get_mut(source) else {
            return false;
        };

        let removed = states.remove(&key.name).is_some();
        if states.is_empty() {
            self.sources.remove(source);
        }
        removed
    }

    /// Number of sources holding at least one variable.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn len(&self) -> usize {
        self.sources.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = VariableStateKey> + '_ {
        self.sources.iter().flat_map(|(source, states)| {
            states.keys().map(move |name| VariableStateKey {
                name: name.clone(),
                source: (source != LOCAL_SOURCE).then(|| source.clone()),
            })
        })
    }
}

fn source_name(key: &VariableStateKey) -> &str {
    key.source.as_deref().unwrap_or(LOCAL_SOURCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_external_are_distinct() {
        let mut map = VariableStoreStateMap::new();
        map.set(&VariableStateKey::local("env"), VariableState::with_value("dev"));
        map.set(
            &VariableStateKey::external("env", "project"),
            VariableState::with_value("prod"),
        );

        assert_eq!(map.len(), 2);
        assert_eq!(map.source_count(), 2);
        assert_eq!(
            map.get(&VariableStateKey::local("env")).unwrap().value,
            Some(VariableValue::from("dev"))
        );
        assert_eq!(
            map.get(&VariableStateKey::external("env", "project")).unwrap().value,
            Some(VariableValue::from("prod"))
        );
        assert!(!map.has(&VariableStateKey::external("env", "global")));
    }

    #[test]
    fn test_delete_removes_empty_source() {
        let mut map = VariableStoreStateMap::new();
        let key = VariableStateKey::external("region", "global");
        map.set(&key, VariableState::default());

        assert!(map.delete(&key));
        assert_eq!(map.source_count(), 0);
        assert!(map.is_empty());
        assert!(!map.delete(&key));
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut map = VariableStoreStateMap::new();
        let key = VariableStateKey::local("pod");
        map.set(&key, VariableState::default());

        if let Some(state) = map.get_mut(&key) {
            state.loading = true;
        }
        assert!(map.get(&key).unwrap().loading);
    }

    #[test]
    fn test_keys_restore_sources() {
        let mut map = VariableStoreStateMap::new();
        map.set(&VariableStateKey::local("a"), VariableState::default());
        map.set(&VariableStateKey::external("b", "global"), VariableState::default());

        let mut keys: Vec<VariableStateKey> = map.keys().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![VariableStateKey::local("a"), VariableStateKey::external("b", "global")]
        );
    }

    #[test]
    fn test_option_values() {
        let state = VariableState {
            options: Some(vec![VariableOption::from("a"), VariableOption::new("B", "b")]),
            ..Default::default()
        };
        assert_eq!(state.option_values(), Some(vec!["a".to_string(), "b".to_string()]));
    }
}
