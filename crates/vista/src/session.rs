use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vista_core::config::VistaConfig;
use vista_core::error::Result;
use vista_core::interpolation::replace_variables;
use vista_core::plugin::{PluginLoader, PluginModuleResource};
use vista_core::variable::{
    AbsoluteTimeRange, ExternalVariableDefinition, QueryParamSink, TemplateVariableStore,
    VariableDefinition, VariableOptionsContext, VariableStateMap,
};
use vista_runtime::federation::{ModuleLinker, StaticLinker};
use vista_runtime::loader::RemotePluginLoader;
use vista_runtime::registry::PluginRegistry;
use vista_runtime::variable::load_variable_options_with;

/// Variables and plugins of one open dashboard.
///
/// Created when a dashboard is opened and dropped when it is closed; nothing
/// is shared between sessions.
pub struct DashboardSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: VistaConfig,
    store: Arc<TemplateVariableStore>,
    registry: Arc<PluginRegistry>,
}

impl DashboardSession {
    pub fn builder() -> DashboardSessionBuilder {
        DashboardSessionBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &VistaConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<TemplateVariableStore> {
        self.store.clone()
    }

    pub fn registry(&self) -> Arc<PluginRegistry> {
        self.registry.clone()
    }

    /// Installed plugin modules from the catalog.
    pub async fn installed_plugins(&self) -> Result<Vec<PluginModuleResource>> {
        self.registry.installed().await
    }

    /// Values handed to interpolation; builtins are included when a time range is given.
    pub fn variable_values(&self, time_range: Option<&AbsoluteTimeRange>) -> VariableStateMap {
        match time_range {
            Some(range) => self.store.all_values(range),
            None => self.store.resolved_values(None),
        }
    }

    /// Substitute every resolvable variable reference in `text`.
    pub fn interpolate(&self, text: &str, time_range: Option<&AbsoluteTimeRange>) -> String {
        replace_variables(text, &self.variable_values(time_range))
    }

    /// Fetch the options of one list variable through its plugin.
    pub async fn load_variable_options(
        &self,
        name: &str,
        source: Option<&str>,
        time_range: Option<AbsoluteTimeRange>,
    ) -> Result<bool> {
        let ctx = self.options_context(time_range);
        load_variable_options_with(&self.store, &self.registry, name, source, &ctx).await
    }

    /// Fetch the options of every list variable with a plugin, in definition
    /// order, so later variables see the values selected for earlier ones.
    ///
    /// Returns how many results were applied.
    pub async fn load_all_variable_options(
        &self,
        time_range: Option<AbsoluteTimeRange>,
    ) -> Result<usize> {
        let mut targets: Vec<(String, Option<String>)> = plugin_variables(&self.store.definitions())
            .map(|name| (name, None))
            .collect();
        for external in self.store.external_definitions() {
            targets.extend(
                plugin_variables(&external.definitions).map(|name| (name, Some(external.source.clone()))),
            );
        }

        let mut applied = 0;
        for (name, source) in targets {
            if self.store.state(&name, source.as_deref())?.overridden {
                continue;
            }
            let ctx = self.options_context(time_range);
            if load_variable_options_with(&self.store, &self.registry, &name, source.as_deref(), &ctx)
                .await?
            {
                applied += 1;
            }
        }

        tracing::debug!(session = %self.id, applied, "Variable options loaded");
        Ok(applied)
    }

    fn options_context(&self, time_range: Option<AbsoluteTimeRange>) -> VariableOptionsContext {
        VariableOptionsContext {
            variables: self.variable_values(time_range.as_ref()),
            time_range,
        }
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        tracing::debug!(session = %self.id, "Dashboard session closed");
    }
}

fn plugin_variables(definitions: &[VariableDefinition]) -> impl Iterator<Item = String> + '_ {
    definitions
        .iter()
        .filter_map(VariableDefinition::as_list)
        .filter(|spec| spec.plugin.is_some())
        .map(|spec| spec.name.clone())
}

/// Builder for [`DashboardSession`].
#[derive(Default)]
pub struct DashboardSessionBuilder {
    config: Option<VistaConfig>,
    definitions: Vec<VariableDefinition>,
    external: Vec<ExternalVariableDefinition>,
    query_string: Option<String>,
    query_param_sink: Option<Arc<dyn QueryParamSink>>,
    loader: Option<Arc<dyn PluginLoader>>,
    linker: Option<Arc<dyn ModuleLinker>>,
}

impl DashboardSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: VistaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// The dashboard's own variable definitions.
    pub fn variables(mut self, definitions: Vec<VariableDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    /// Add a source of external variables; earlier sources take precedence.
    pub fn external_variables(mut self, external: ExternalVariableDefinition) -> Self {
        self.external.push(external);
        self
    }

    /// Query string of the dashboard URL, for initial variable values.
    pub fn query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    pub fn query_param_sink(mut self, sink: Arc<dyn QueryParamSink>) -> Self {
        self.query_param_sink = Some(sink);
        self
    }

    /// Use `loader` instead of the catalog-backed [`RemotePluginLoader`].
    pub fn plugin_loader(mut self, loader: Arc<dyn PluginLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Linker resolving remote exports when the default loader is used.
    pub fn module_linker(mut self, linker: Arc<dyn ModuleLinker>) -> Self {
        self.linker = Some(linker);
        self
    }

    pub fn build(self) -> Result<DashboardSession> {
        let config = self.config.unwrap_or_default();

        let loader = match self.loader {
            Some(loader) => loader,
            None => {
                let linker = self
                    .linker
                    .unwrap_or_else(|| Arc::new(StaticLinker::new()));
                Arc::new(RemotePluginLoader::from_config(config.plugins.clone(), linker)?)
            }
        };

        let mut store = TemplateVariableStore::builder()
            .definitions(self.definitions)
            .config(config.variables.clone());
        for external in self.external {
            store = store.external(external);
        }
        if let Some(query) = &self.query_string {
            store = store.query_string(query);
        }
        if let Some(sink) = self.query_param_sink {
            store = store.query_param_sink(sink);
        }

        let session = DashboardSession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            store: Arc::new(store.build()),
            registry: Arc::new(PluginRegistry::with_builtins(loader)),
            config,
        };
        tracing::debug!(session = %session.id, "Dashboard session opened");
        Ok(session)
    }
}
