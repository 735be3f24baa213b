//! Index of installed plugins with lazy, per-module imports.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, OnceCell};
use vista_core::plugin::{
    PluginImplementation, PluginLoader, PluginMetadata, PluginModuleResource, RemotePluginModule,
};
use vista_core::variable::{StaticListVariable, VariablePlugin, STATIC_LIST_VARIABLE_KIND};
use vista_core::{Result, VistaError};

/// Plugin type of variable plugins.
pub const VARIABLE_PLUGIN_KIND: &str = "Variable";

type PluginKey = (String, String);

fn key(kind: &str, name: &str) -> PluginKey {
    (kind.to_string(), name.to_string())
}

/// Installed modules and where each `(kind, name)` is declared.
#[derive(Debug, Default)]
struct PluginIndex {
    resources: Vec<PluginModuleResource>,
    /// `(kind, name)` to `(resource index, plugin index)`.
    declared: HashMap<PluginKey, (usize, usize)>,
}

impl PluginIndex {
    fn build(resources: Vec<PluginModuleResource>) -> Self {
        let mut declared: HashMap<PluginKey, (usize, usize)> = HashMap::new();
        for (r, resource) in resources.iter().enumerate() {
            for (p, plugin) in resource.plugins().iter().enumerate() {
                let key = key(&plugin.kind, plugin.name());
                if let Some(&(first, _)) = declared.get(&key) {
                    tracing::warn!(
                        kind = %plugin.kind,
                        plugin = plugin.name(),
                        module = resource.name(),
                        registered_by = resources[first].name(),
                        "Plugin already registered by another module"
                    );
                    continue;
                }
                declared.insert(key, (r, p));
            }
        }
        Self { resources, declared }
    }

    fn lookup(&self, kind: &str, name: &str) -> Option<(&PluginModuleResource, &PluginMetadata)> {
        let &(r, p) = self.declared.get(&key(kind, name))?;
        let resource = self.resources.get(r)?;
        Some((resource, resource.plugins().get(p)?))
    }

    /// Declarations that won their `(kind, name)` slot, in catalog order.
    fn metadata(&self) -> Vec<&PluginMetadata> {
        let mut slots: Vec<_> = self.declared.values().copied().collect();
        slots.sort_unstable();
        slots
            .into_iter()
            .filter_map(|(r, p)| self.resources.get(r)?.plugins().get(p))
            .collect()
    }
}

/// Resolves plugin implementations by `(kind, name)`.
///
/// The catalog is fetched on first use. A module is imported the first time
/// one of its plugins is requested and kept for its siblings. Builtin
/// implementations shadow catalog entries.
pub struct PluginRegistry {
    loader: Arc<dyn PluginLoader>,
    builtins: RwLock<HashMap<PluginKey, PluginImplementation>>,
    index: RwLock<Option<Arc<PluginIndex>>>,
    modules: Mutex<HashMap<String, Arc<OnceCell<RemotePluginModule>>>>,
}

impl PluginRegistry {
    pub fn new(loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            loader,
            builtins: RwLock::new(HashMap::new()),
            index: RwLock::new(None),
            modules: Mutex::new(HashMap::new()),
        }
    }

    /// Registry with the builtin variable plugins registered.
    pub fn with_builtins(loader: Arc<dyn PluginLoader>) -> Self {
        let registry = Self::new(loader);
        registry.register_builtin(
            VARIABLE_PLUGIN_KIND,
            STATIC_LIST_VARIABLE_KIND,
            PluginImplementation::variable(Arc::new(StaticListVariable)),
        );
        registry
    }

    pub fn register_builtin(&self, kind: &str, name: &str, implementation: PluginImplementation) {
        self.builtins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(kind, name), implementation);
    }

    /// Re-read the catalog, dropping every imported module.
    pub async fn refresh(&self) -> Result<usize> {
        let resources = self.loader.get_installed_plugins().await?;
        let index = Arc::new(PluginIndex::build(resources));
        let count = index.resources.len();

        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(index);
        self.modules.lock().await.clear();

        tracing::debug!(modules = count, "Plugin registry refreshed");
        Ok(count)
    }

    async fn index(&self) -> Result<Arc<PluginIndex>> {
        let cached = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(index) = cached {
            return Ok(index);
        }

        self.refresh().await?;
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| VistaError::Internal("plugin index missing after refresh".to_string()))
    }

    /// Installed plugin modules, fetching the catalog if needed.
    pub async fn installed(&self) -> Result<Vec<PluginModuleResource>> {
        Ok(self.index().await?.resources.clone())
    }

    /// Metadata of catalog plugins whose kind is in `kinds`; all when empty.
    pub async fn list_plugin_metadata(&self, kinds: &[&str]) -> Result<Vec<PluginMetadata>> {
        let index = self.index().await?;
        Ok(index
            .metadata()
            .into_iter()
            .filter(|m| kinds.is_empty() || kinds.contains(&m.kind.as_str()))
            .cloned()
            .collect())
    }

    /// Implementation of the `kind` plugin `name`.
    pub async fn get_plugin(&self, kind: &str, name: &str) -> Result<PluginImplementation> {
        let builtin = self
            .builtins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(kind, name))
            .cloned();
        if let Some(builtin) = builtin {
            return Ok(builtin);
        }

        let not_found = || VistaError::PluginNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        };

        let index = self.index().await?;
        let (resource, _) = index.lookup(kind, name).ok_or_else(not_found)?;
        let module = self.load_module(resource).await?;

        module.get(name).cloned().ok_or_else(not_found)
    }

    /// Variable plugin `name`, failing when it does not implement [`VariablePlugin`].
    pub async fn get_variable_plugin(&self, name: &str) -> Result<Arc<dyn VariablePlugin>> {
        self.get_plugin(VARIABLE_PLUGIN_KIND, name)
            .await?
            .as_variable()
            .ok_or_else(|| {
                VistaError::PluginLoad(format!("plugin '{}' is not a variable plugin", name))
            })
    }

    /// Names of the modules imported so far.
    pub async fn loaded_modules(&self) -> Vec<String> {
        let modules = self.modules.lock().await;
        let mut names: Vec<_> = modules
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    async fn load_module(&self, resource: &PluginModuleResource) -> Result<RemotePluginModule> {
        let cell = self
            .modules
            .lock()
            .await
            .entry(resource.name().to_string())
            .or_default()
            .clone();

        let module = cell
            .get_or_try_init(|| async {
                tracing::debug!(module = resource.name(), "Importing plugin module");
                self.loader.import_plugin_module(resource).await
            })
            .await?;
        Ok(module.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RemotePluginLoader;
    use crate::observability::capture_diagnostics;
    use serde_json::json;
    use vista_core::config::PluginConfig;
    use vista_core::testing::*;
    use vista_core::assert_err_variant;

    fn registry(catalog: serde_json::Value, host: MockModuleHost) -> (PluginRegistry, Arc<MockModuleHost>, MockHttp) {
        let http = MockHttp::builder().mock_json("/api/v1/plugins", catalog).build();
        let host = Arc::new(host);
        let loader = RemotePluginLoader::new(PluginConfig::default(), Arc::new(http.clone()), host.clone());
        (PluginRegistry::new(Arc::new(loader)), host, http)
    }

    fn two_panel_catalog() -> serde_json::Value {
        json!([plugin_module_value(
            "panels",
            "1.0.0",
            vec![plugin_metadata("Panel", "a"), plugin_metadata("Panel", "b")]
        )])
    }

    #[tokio::test]
    async fn test_imports_module_once_for_siblings() {
        let (registry, host, http) = registry(
            two_panel_catalog(),
            MockModuleHost::new()
                .then(MockLoad::exporting(&["a"]))
                .then(MockLoad::exporting(&["b"])),
        );

        let a = registry.get_plugin("Panel", "a").await.unwrap();
        let b = registry.get_plugin("Panel", "b").await.unwrap();

        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("a"));
        assert_eq!(b.downcast_ref::<String>().map(String::as_str), Some("b"));
        // one import loads both exports
        host.assert_called_times(2);
        http.assert_called_times("/api/v1/plugins", 1);
        assert_eq!(registry.loaded_modules().await, vec!["panels"]);

        registry.get_plugin("Panel", "a").await.unwrap();
        host.assert_called_times(2);
    }

    #[tokio::test]
    async fn test_unknown_or_unloaded_plugin_is_not_found() {
        let (registry, _, _) = registry(
            two_panel_catalog(),
            MockModuleHost::new().then(MockLoad::exporting(&["a"])),
        );

        assert_err_variant!(
            registry.get_plugin("Panel", "missing").await,
            VistaError::PluginNotFound { .. }
        );
        assert_err_variant!(
            registry.get_plugin("Variable", "a").await,
            VistaError::PluginNotFound { .. }
        );
        // b was declared but failed to load
        let err = registry.get_plugin("Panel", "b").await.unwrap_err();
        assert_eq!(err.to_string(), "Plugin not found: Panel plugin 'b'");
    }

    #[tokio::test]
    async fn test_failed_import_is_retried() {
        let (registry, host, _) = registry(
            two_panel_catalog(),
            MockModuleHost::new()
                .then(MockLoad::Fail("remote down".to_string()))
                .then(MockLoad::exporting(&["a"])),
        );

        assert_err_variant!(registry.get_plugin("Panel", "a").await, VistaError::PluginLoad(_));
        assert!(registry.loaded_modules().await.is_empty());

        registry.get_plugin("Panel", "a").await.unwrap();
        host.assert_called_times(3);
    }

    #[tokio::test]
    async fn test_duplicate_declaration_keeps_first() {
        let (collector, _guard) = capture_diagnostics();
        let catalog = json!([
            plugin_module_value("first", "1.0.0", vec![plugin_metadata("Panel", "shared")]),
            plugin_module_value("second", "1.0.0", vec![plugin_metadata("Panel", "shared")]),
        ]);
        let (registry, host, _) = registry(catalog, MockModuleHost::always(MockLoad::exporting(&["shared"])));

        registry.get_plugin("Panel", "shared").await.unwrap();

        assert_eq!(host.calls()[0].module, "first");
        let warnings = collector.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field_str("module"), Some("second"));
        assert_eq!(warnings[0].field_str("registered_by"), Some("first"));
    }

    #[tokio::test]
    async fn test_list_plugin_metadata_by_kind() {
        let (registry, _, _) = registry(mixed_validity_catalog(), MockModuleHost::new());

        let all: Vec<_> = registry
            .list_plugin_metadata(&[])
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.spec.name)
            .collect();
        assert_eq!(all, vec!["testPlugin", "anotherPlugin"]);

        let variables = registry.list_plugin_metadata(&["Variable"]).await.unwrap();
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].name(), "anotherPlugin");
    }

    #[tokio::test]
    async fn test_builtin_variable_plugin() {
        let http = MockHttp::new();
        let loader = RemotePluginLoader::new(
            PluginConfig::default(),
            Arc::new(http.clone()),
            Arc::new(MockModuleHost::new()),
        );
        let registry = PluginRegistry::with_builtins(Arc::new(loader));

        let plugin = registry.get_variable_plugin(STATIC_LIST_VARIABLE_KIND).await.unwrap();
        let options = plugin
            .get_variable_options(&json!({ "values": ["a", "b"] }), &Default::default())
            .await
            .unwrap();

        assert_eq!(options.len(), 2);
        // builtins never touch the catalog
        http.assert_not_called("*");
    }

    #[tokio::test]
    async fn test_non_variable_implementation() {
        let catalog = json!([plugin_module_value("vars", "1.0.0", vec![plugin_metadata("Variable", "v")])]);
        let (registry, _, _) = registry(catalog, MockModuleHost::always(MockLoad::exporting(&["v"])));

        assert_err_variant!(registry.get_variable_plugin("v").await, VistaError::PluginLoad(_));
    }

    #[tokio::test]
    async fn test_refresh_drops_imported_modules() {
        let (registry, host, http) = registry(
            two_panel_catalog(),
            MockModuleHost::always(MockLoad::exporting(&["a", "b"])),
        );

        registry.get_plugin("Panel", "a").await.unwrap();
        assert_eq!(registry.refresh().await.unwrap(), 1);
        assert!(registry.loaded_modules().await.is_empty());

        registry.get_plugin("Panel", "b").await.unwrap();
        http.assert_called_times("/api/v1/plugins", 2);
        host.assert_called_times(4);
    }
}
