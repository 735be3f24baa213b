pub mod calculations;
pub mod config;
pub mod error;
pub mod interpolation;
pub mod observability;
pub mod plugin;
pub mod variable;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use calculations::{get_calculation, get_calculations, CalculationType, TimeSeriesValueTuple};
pub use config::{PluginConfig, VariablesConfig, VistaConfig};
pub use error::{Result, VistaError};
pub use interpolation::{
    interpolate, parse_variables, parse_variables_and_format, replace_variable, replace_variables,
    InterpolationFormat,
};
pub use plugin::{
    HttpFetch, PluginImplementation, PluginLoader, PluginMetadata, PluginModuleResource,
    RemoteModule, RemoteModuleHost, RemotePluginModule,
};
pub use variable::{
    TemplateVariableStore, VariableDefinition, VariableOption, VariableState, VariableStateMap,
    VariableValue, ALL_VALUE,
};
