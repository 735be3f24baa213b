//! Template variables: definitions, runtime state, hydration and the store.

mod builtin;
mod definition;
mod hydration;
mod plugin;
mod query_params;
mod state;
mod store;
mod value;

pub use builtin::{
    builtin_variables, format_prometheus_duration, AbsoluteTimeRange, BUILTIN_FROM, BUILTIN_RANGE,
    BUILTIN_RANGE_MS, BUILTIN_RANGE_S, BUILTIN_TO,
};
pub use definition::{
    find_variable_definition_by_name, merge_variable_definitions, ExternalVariableDefinition,
    ExternalVariableTooltip, ListVariableSpec, PluginSpec, TextVariableSpec, VariableDefinition,
    VariableDisplay,
};
pub use hydration::{hydrate_variable_state, hydrate_variable_states, select_first_option_if_unset};
pub use plugin::{
    StaticListVariable, VariableOptionsContext, VariablePlugin, STATIC_LIST_VARIABLE_KIND,
};
pub use query_params::{
    encode_variable_query_value, initial_values_from_query_params, parse_query_string,
    QueryParamSink, RecordingQueryParams,
};
pub use state::{VariableState, VariableStateKey, VariableStateMap, VariableStoreStateMap};
pub use store::{
    check_saved_default_variable_status, OptionsFetchTicket, SavedVariablesStatus,
    TemplateVariableStore, TemplateVariableStoreBuilder,
};
pub use value::{
    canonicalize_selection, normalize_all_value, VariableOption, VariableValue, ALL_VALUE,
};
