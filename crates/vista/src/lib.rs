//! vista - dashboard template variables and remote plugins
//!
//! Variable definitions are hydrated into a per-dashboard store, referenced
//! from query text as `$name` / `${name:format}` and interpolated with one of
//! the supported escaping formats. Plugins not bundled with the host are
//! discovered through the server's plugin catalog and loaded on demand.

mod session;

pub use vista_core;
pub use vista_runtime;

#[cfg(feature = "testing")]
pub use vista_core::{assert_err, assert_err_variant, assert_ok};

pub use session::{DashboardSession, DashboardSessionBuilder};

/// Prelude module for common imports.
pub mod prelude {
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;

    pub use vista_core::calculations::{get_calculation, get_calculations, CalculationType};
    pub use vista_core::config::{LoggingConfig, PluginConfig, VariablesConfig, VistaConfig};
    pub use vista_core::error::{Result, VistaError};
    pub use vista_core::interpolation::{
        interpolate, parse_variables, replace_variable, replace_variables, InterpolationFormat,
    };
    pub use vista_core::plugin::{
        PluginImplementation, PluginLoader, PluginMetadata, PluginModuleResource,
        RemoteModuleHost,
    };
    pub use vista_core::variable::{
        AbsoluteTimeRange, ExternalVariableDefinition, QueryParamSink, TemplateVariableStore,
        VariableDefinition, VariableOption, VariableOptionsContext, VariablePlugin, VariableState,
        VariableStateMap, VariableValue, ALL_VALUE,
    };
    pub use vista_runtime::{
        init_tracing, FederationHost, ModuleLinker, PluginRegistry, RemotePluginLoader,
        StaticLinker,
    };

    pub use crate::{DashboardSession, DashboardSessionBuilder};
}
