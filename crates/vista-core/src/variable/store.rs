//! Session-scoped container for variable definitions and their state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::builtin::{builtin_variables, AbsoluteTimeRange};
use super::definition::{ExternalVariableDefinition, VariableDefinition};
use super::hydration::{hydrate_variable_states, select_first_option_if_unset};
use super::query_params::{
    encode_variable_query_value, initial_values_from_query_params, parse_query_string,
    QueryParamSink,
};
use super::state::{VariableState, VariableStateKey, VariableStateMap, VariableStoreStateMap};
use super::value::{canonicalize_selection, normalize_all_value, VariableOption, VariableValue};
use crate::config::VariablesConfig;
use crate::error::{Result, VistaError};

/// Whether the current values drifted from the saved defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVariablesStatus {
    pub is_saved_variable_modified: bool,
    pub modified_variable_names: Vec<String>,
}

/// Compare the saved default of each local definition with its current value.
///
/// A null value and a missing default are equal.
pub fn check_saved_default_variable_status(
    definitions: &[VariableDefinition],
    states: &VariableStoreStateMap,
) -> SavedVariablesStatus {
    let modified_variable_names: Vec<String> = definitions
        .iter()
        .filter(|definition| {
            states
                .get(&VariableStateKey::local(definition.name()))
                .is_some_and(|state| state.value != definition.saved_value())
        })
        .map(|definition| definition.name().to_string())
        .collect();

    SavedVariablesStatus {
        is_saved_variable_modified: !modified_variable_names.is_empty(),
        modified_variable_names,
    }
}

/// Proof that an options fetch was started; hand it back with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsFetchTicket {
    key: VariableStateKey,
    epoch: u64,
    sequence: u64,
}

impl OptionsFetchTicket {
    pub fn key(&self) -> &VariableStateKey {
        &self.key
    }
}

struct StoreInner {
    definitions: Vec<VariableDefinition>,
    states: VariableStoreStateMap,
    /// Bumped whenever the definitions are replaced.
    epoch: u64,
    fetch_sequences: HashMap<VariableStateKey, u64>,
}

/// Variable definitions and state for one dashboard session.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
pub struct TemplateVariableStore {
    inner: RwLock<StoreInner>,
    external: Vec<ExternalVariableDefinition>,
    initial_values: HashMap<String, String>,
    config: VariablesConfig,
    query_params: Option<Arc<dyn QueryParamSink>>,
    revision: watch::Sender<u64>,
}

impl std::fmt::Debug for TemplateVariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateVariableStore")
            .field("external_sources", &self.external.len())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl TemplateVariableStore {
    /// Hydrate a store from definitions and the raw URL query parameters.
    pub fn new<I, K, V>(
        definitions: Vec<VariableDefinition>,
        external: Vec<ExternalVariableDefinition>,
        query_params: I,
        config: VariablesConfig,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let initial_values =
            initial_values_from_query_params(&config.query_param_prefix, query_params);
        Self::hydrate(definitions, external, initial_values, config, None)
    }

    pub fn builder() -> TemplateVariableStoreBuilder {
        TemplateVariableStoreBuilder::default()
    }

    fn hydrate(
        definitions: Vec<VariableDefinition>,
        external: Vec<ExternalVariableDefinition>,
        initial_values: HashMap<String, String>,
        config: VariablesConfig,
        query_params: Option<Arc<dyn QueryParamSink>>,
    ) -> Self {
        let states = hydrate_variable_states(&definitions, &initial_values, &external);
        tracing::debug!(
            local = definitions.len(),
            external_sources = external.len(),
            "Hydrated template variables"
        );
        let (revision, _) = watch::channel(0);

        Self {
            inner: RwLock::new(StoreInner {
                definitions,
                states,
                epoch: 0,
                fetch_sequences: HashMap::new(),
            }),
            external,
            initial_values,
            config,
            query_params,
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Current revision; advances on every effective change.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch the revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn config(&self) -> &VariablesConfig {
        &self.config
    }

    /// Local definitions.
    pub fn definitions(&self) -> Vec<VariableDefinition> {
        self.read().definitions.clone()
    }

    pub fn external_definitions(&self) -> &[ExternalVariableDefinition] {
        &self.external
    }

    /// Copy of every variable state.
    pub fn snapshot(&self) -> VariableStoreStateMap {
        self.read().states.clone()
    }

    pub fn state(&self, name: &str, source: Option<&str>) -> Result<VariableState> {
        self.read()
            .states
            .get(&VariableStateKey::new(name, source))
            .cloned()
            .ok_or_else(|| VistaError::variable_not_found(name, source))
    }

    pub fn definition(&self, name: &str, source: Option<&str>) -> Option<VariableDefinition> {
        let inner = self.read();
        let key = VariableStateKey::new(name, source);
        let definition = self.find_definition(&inner, &key).cloned();
        definition
    }

    fn find_definition<'a>(
        &'a self,
        inner: &'a StoreInner,
        key: &VariableStateKey,
    ) -> Option<&'a VariableDefinition> {
        let definitions = match &key.source {
            None => inner.definitions.as_slice(),
            Some(source) => self
                .external
                .iter()
                .find(|e| &e.source == source)
                .map(|e| e.definitions.as_slice())?,
        };
        definitions.iter().find(|d| d.name() == key.name)
    }

    /// Apply `mutate` to the state under `key`, notifying on change.
    fn update<F, T>(&self, key: &VariableStateKey, mutate: F) -> Result<(T, bool)>
    where
        F: FnOnce(&mut VariableState, Option<&VariableDefinition>) -> T,
    {
        let mut guard = self.write();
        let inner = &mut *guard;
        let definition = self.find_definition_owned(inner, key);
        let state = inner
            .states
            .get_mut(key)
            .ok_or_else(|| VistaError::variable_not_found(&key.name, key.source.as_deref()))?;

        let before = state.clone();
        let output = mutate(state, definition.as_ref());
        let changed = *state != before;
        drop(guard);

        if changed {
            self.notify();
        }
        Ok((output, changed))
    }

    fn find_definition_owned(
        &self,
        inner: &StoreInner,
        key: &VariableStateKey,
    ) -> Option<VariableDefinition> {
        self.find_definition(inner, key).cloned()
    }

    /// Set a variable's value.
    ///
    /// A multi-selection ending with "All" collapses to "All"; otherwise "All"
    /// is dropped from it. The value is then shaped to the variable's
    /// cardinality and written to the URL query parameters. Text variables
    /// hold a single string, so an array is comma-joined.
    pub fn set_variable_value(
        &self,
        name: &str,
        value: Option<VariableValue>,
        source: Option<&str>,
    ) -> Result<()> {
        let key = VariableStateKey::new(name, source);
        let value = normalize_all_value(canonicalize_selection(value));

        let (stored, changed) = self.update(&key, |state, definition| {
            state.value = match definition {
                Some(VariableDefinition::ListVariable(spec)) => spec.coerce_value(value),
                Some(VariableDefinition::TextVariable(_)) => value.map(join_text_value),
                None => value,
            };
            state.value.clone()
        })?;

        if changed {
            tracing::debug!(variable = name, source = ?source, "Variable value changed");
            self.write_query_param(name, stored.as_ref());
        }
        Ok(())
    }

    fn write_query_param(&self, name: &str, value: Option<&VariableValue>) {
        if !self.config.sync_query_params {
            return;
        }
        if let Some(sink) = &self.query_params {
            sink.set_query_param(
                &self.config.query_param_name(name),
                encode_variable_query_value(value),
            );
        }
    }

    /// Store a list variable's options.
    ///
    /// An unset value falls back to the first option.
    pub fn set_variable_options(
        &self,
        name: &str,
        options: Vec<VariableOption>,
        source: Option<&str>,
    ) -> Result<()> {
        let key = VariableStateKey::new(name, source);
        self.update(&key, |state, definition| apply_options(state, definition, options))?;
        Ok(())
    }

    pub fn set_variable_loading(
        &self,
        name: &str,
        loading: bool,
        source: Option<&str>,
    ) -> Result<()> {
        let key = VariableStateKey::new(name, source);
        self.update(&key, |state, _| state.loading = loading)?;
        Ok(())
    }

    /// Mark a variable as loading and hand out a ticket for the fetch result.
    ///
    /// Starting another fetch of the same variable, or replacing the
    /// definitions, invalidates earlier tickets.
    pub fn begin_options_fetch(
        &self,
        name: &str,
        source: Option<&str>,
    ) -> Result<OptionsFetchTicket> {
        let key = VariableStateKey::new(name, source);
        let ticket = {
            let mut inner = self.write();
            if !inner.states.has(&key) {
                return Err(VistaError::variable_not_found(name, source));
            }
            let epoch = inner.epoch;
            let sequence = inner.fetch_sequences.entry(key.clone()).or_insert(0);
            *sequence += 1;
            OptionsFetchTicket {
                key: key.clone(),
                epoch,
                sequence: *sequence,
            }
        };

        self.update(&key, |state, _| state.loading = true)?;
        Ok(ticket)
    }

    /// Apply the result of an options fetch.
    ///
    /// Returns `false` when the ticket was superseded and the result dropped.
    pub fn complete_options_fetch(
        &self,
        ticket: OptionsFetchTicket,
        result: Result<Vec<VariableOption>>,
    ) -> bool {
        {
            let inner = self.read();
            let current = inner.fetch_sequences.get(&ticket.key).copied();
            if ticket.epoch != inner.epoch || current != Some(ticket.sequence) {
                tracing::debug!(
                    variable = %ticket.key.name,
                    source = ?ticket.key.source,
                    "Discarding stale variable options"
                );
                return false;
            }
        }

        let applied = self.update(&ticket.key, |state, definition| {
            state.loading = false;
            match result {
                Ok(options) => {
                    apply_options(state, definition, options);
                }
                Err(e) => {
                    tracing::warn!(
                        variable = %ticket.key.name,
                        error = %e,
                        "Failed to load variable options"
                    );
                    state.error = Some(e.to_string());
                }
            }
        });
        applied.is_ok()
    }

    /// Replace the local definitions and rehydrate every state.
    pub fn set_variable_definitions(&self, definitions: Vec<VariableDefinition>) {
        {
            let mut inner = self.write();
            inner.states = hydrate_variable_states(&definitions, &self.initial_values, &self.external);
            inner.definitions = definitions;
            inner.epoch += 1;
            inner.fetch_sequences.clear();
        }
        self.notify();
    }

    /// Save the current values as the definitions' defaults.
    pub fn set_variable_default_values(&self) -> Vec<VariableDefinition> {
        let updated = {
            let mut inner = self.write();
            let states = &inner.states;
            let updated: Vec<VariableDefinition> = inner
                .definitions
                .iter()
                .map(|definition| {
                    let key = VariableStateKey::local(definition.name());
                    match states.get(&key) {
                        Some(state) => with_saved_value(definition, state.value.as_ref()),
                        None => definition.clone(),
                    }
                })
                .collect();
            inner.definitions = updated.clone();
            updated
        };
        self.notify();
        updated
    }

    pub fn saved_variables_status(&self) -> SavedVariablesStatus {
        let inner = self.read();
        check_saved_default_variable_status(&inner.definitions, &inner.states)
    }

    /// Effective states by name: locals, then externals, skipping overridden
    /// ones. `names`, when given, restricts both locals and externals.
    fn effective_states(
        &self,
        names: Option<&[&str]>,
    ) -> Vec<(VariableStateKey, VariableState, Option<VariableDefinition>)> {
        let inner = self.read();
        let mut keys: Vec<VariableStateKey> = match names {
            Some(names) => names.iter().map(|n| VariableStateKey::local(*n)).collect(),
            None => inner
                .definitions
                .iter()
                .map(|d| VariableStateKey::local(d.name()))
                .collect(),
        };
        for external in &self.external {
            keys.extend(
                external
                    .definitions
                    .iter()
                    .filter(|d| names.map_or(true, |names| names.contains(&d.name())))
                    .map(|d| VariableStateKey::external(d.name(), &external.source)),
            );
        }

        keys.into_iter()
            .filter_map(|key| {
                let state = inner.states.get(&key)?;
                if state.overridden {
                    return None;
                }
                let definition = self.find_definition_owned(&inner, &key);
                Some((key, state.clone(), definition))
            })
            .collect()
    }

    /// Non-overridden states keyed by variable name.
    pub fn values(&self, names: Option<&[&str]>) -> VariableStateMap {
        let mut values = VariableStateMap::new();
        for (key, state, _) in self.effective_states(names) {
            values.entry(key.name).or_insert(state);
        }
        values
    }

    /// As [`values`](Self::values), with the "All" sentinel expanded to the
    /// custom all value or to every option value.
    pub fn resolved_values(&self, names: Option<&[&str]>) -> VariableStateMap {
        let mut values = VariableStateMap::new();
        for (key, mut state, definition) in self.effective_states(names) {
            let spec = definition.as_ref().and_then(VariableDefinition::as_list);
            if let (Some(spec), Some(true)) = (spec, state.value.as_ref().map(VariableValue::is_all)) {
                state.value = Some(match &spec.custom_all_value {
                    Some(custom) => VariableValue::Single(custom.clone()),
                    None => VariableValue::Multiple(state.option_values().unwrap_or_default()),
                });
            }
            values.entry(key.name).or_insert(state);
        }
        values
    }

    /// Resolved values plus the builtin time range variables, builtins winning.
    pub fn all_values(&self, range: &AbsoluteTimeRange) -> VariableStateMap {
        let mut values = self.resolved_values(None);
        values.extend(builtin_variables(range));
        values
    }
}

fn apply_options(
    state: &mut VariableState,
    definition: Option<&VariableDefinition>,
    options: Vec<VariableOption>,
) {
    state.options = Some(options);
    state.error = None;
    if let Some(spec) = definition.and_then(VariableDefinition::as_list) {
        select_first_option_if_unset(state, spec);
        state.value = spec.coerce_value(state.value.take());
    }
}

fn join_text_value(value: VariableValue) -> VariableValue {
    match value {
        VariableValue::Multiple(values) => VariableValue::Single(values.join(",")),
        single => single,
    }
}

fn with_saved_value(
    definition: &VariableDefinition,
    value: Option<&VariableValue>,
) -> VariableDefinition {
    match definition {
        VariableDefinition::ListVariable(spec) => {
            let mut spec = spec.clone();
            spec.default_value = value.cloned();
            VariableDefinition::ListVariable(spec)
        }
        VariableDefinition::TextVariable(spec) => {
            let mut spec = spec.clone();
            spec.value = value
                .and_then(VariableValue::as_single)
                .unwrap_or_default()
                .to_string();
            VariableDefinition::TextVariable(spec)
        }
    }
}

/// Builder for [`TemplateVariableStore`].
#[derive(Default)]
pub struct TemplateVariableStoreBuilder {
    definitions: Vec<VariableDefinition>,
    external: Vec<ExternalVariableDefinition>,
    query_params: Vec<(String, String)>,
    config: Option<VariablesConfig>,
    sink: Option<Arc<dyn QueryParamSink>>,
}

impl TemplateVariableStoreBuilder {
    pub fn definitions(mut self, definitions: Vec<VariableDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    /// Add one source of external variables; earlier sources take precedence.
    pub fn external(mut self, external: ExternalVariableDefinition) -> Self {
        self.external.push(external);
        self
    }

    /// Initial values from a raw query string such as `?var-env=prod`.
    pub fn query_string(mut self, query: &str) -> Self {
        self.query_params.extend(parse_query_string(query));
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    pub fn config(mut self, config: VariablesConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Where value changes are written back as query parameters.
    pub fn query_param_sink(mut self, sink: Arc<dyn QueryParamSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> TemplateVariableStore {
        let config = self.config.unwrap_or_default();
        let initial_values =
            initial_values_from_query_params(&config.query_param_prefix, self.query_params);
        TemplateVariableStore::hydrate(
            self.definitions,
            self.external,
            initial_values,
            config,
            self.sink,
        )
    }
}
