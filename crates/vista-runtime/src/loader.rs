//! Loads plugin modules listed by the server's plugin catalog.

use std::sync::Arc;

use serde_json::Value;
use vista_core::config::PluginConfig;
use vista_core::plugin::{
    BoxFuture, HttpFetch, PluginLoader, PluginModuleResource, RemoteModuleHost, RemotePluginModule,
};
use vista_core::Result;

use crate::federation::{FederationHost, ModuleLinker};
use crate::http::ReqwestFetcher;

/// [`PluginLoader`] backed by the catalog API and a remote module host.
///
/// Malformed catalog entries and plugins that fail to resolve are logged and
/// skipped. Transport failures and host failures are returned to the caller.
pub struct RemotePluginLoader {
    http: Arc<dyn HttpFetch>,
    host: Arc<dyn RemoteModuleHost>,
    config: PluginConfig,
}

impl RemotePluginLoader {
    pub fn new(
        config: PluginConfig,
        http: Arc<dyn HttpFetch>,
        host: Arc<dyn RemoteModuleHost>,
    ) -> Self {
        Self { http, host, config }
    }

    /// Loader over reqwest and a [`FederationHost`] resolving exports with `linker`.
    pub fn from_config(config: PluginConfig, linker: Arc<dyn ModuleLinker>) -> Result<Self> {
        let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::from_config(&config)?);
        let host = Arc::new(FederationHost::from_config(&config, http.clone(), linker));
        Ok(Self::new(config, http, host))
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    async fn fetch_installed(&self) -> Result<Vec<PluginModuleResource>> {
        let url = self.config.catalog_url();
        let body = self.http.get_json(&url).await?;

        let Value::Array(entries) = body else {
            tracing::error!(url = %url, "RemotePluginLoader: Error loading plugins, response is not an array");
            return Ok(Vec::new());
        };

        let mut resources = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match PluginModuleResource::from_value(entry) {
                Some(resource) => resources.push(resource),
                None => tracing::warn!(
                    index,
                    "RemotePluginLoader: Dropping invalid plugin module at index {}",
                    index
                ),
            }
        }

        if resources.is_empty() {
            tracing::error!(url = %url, "RemotePluginLoader: No valid plugins found");
        } else {
            tracing::debug!(count = resources.len(), "Installed plugin modules fetched");
        }
        Ok(resources)
    }

    async fn import(&self, resource: &PluginModuleResource) -> Result<RemotePluginModule> {
        let mut loaded = RemotePluginModule::new();
        if resource.plugins().is_empty() {
            return Ok(loaded);
        }

        let module = resource.name();
        let base_url = self.config.base_url.as_deref();

        for plugin in resource.plugins() {
            let name = plugin.name();
            let remote = self.host.load_remote_module(module, name, base_url).await?;

            match remote.and_then(|mut exports| exports.remove(name)) {
                Some(implementation) => {
                    loaded.insert(name.to_string(), implementation);
                }
                None => tracing::error!(
                    module,
                    plugin = name,
                    "RemotePluginLoader: Error loading plugin {}",
                    name
                ),
            }
        }

        Ok(loaded)
    }
}

impl PluginLoader for RemotePluginLoader {
    fn get_installed_plugins(&self) -> BoxFuture<'_, Result<Vec<PluginModuleResource>>> {
        Box::pin(self.fetch_installed())
    }

    fn import_plugin_module<'a>(
        &'a self,
        resource: &'a PluginModuleResource,
    ) -> BoxFuture<'a, Result<RemotePluginModule>> {
        Box::pin(self.import(resource))
    }
}
