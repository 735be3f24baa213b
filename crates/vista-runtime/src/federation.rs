//! Remote module host: registers remotes, reads their manifests and links
//! exposed exports to implementations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use vista_core::config::PluginConfig;
use vista_core::plugin::{BoxFuture, HttpFetch, PluginImplementation, RemoteModule, RemoteModuleHost};
use vista_core::Result;

/// `mf-manifest.json` of a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteManifest {
    pub name: String,
    #[serde(default)]
    pub exposes: Vec<ExposedModule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedModule {
    pub name: String,
    /// Source path inside the remote, usually `./{name}`.
    #[serde(default)]
    pub path: String,
}

impl RemoteManifest {
    pub fn exposes(&self, export: &str) -> bool {
        let dotted = format!("./{}", export);
        self.exposes
            .iter()
            .any(|e| e.name == export || e.name == dotted || e.path == dotted)
    }
}

/// Turns an exposed export into an implementation.
pub trait ModuleLinker: Send + Sync {
    fn link(&self, module: &str, export: &str, manifest: &RemoteManifest) -> Option<RemoteModule>;
}

/// [`ModuleLinker`] over implementations registered in-process.
#[derive(Default)]
pub struct StaticLinker {
    modules: RwLock<HashMap<(String, String), PluginImplementation>>,
}

impl StaticLinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `implementation` the `export` of `module`.
    pub fn register(&self, module: &str, export: &str, implementation: PluginImplementation) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((module.to_string(), export.to_string()), implementation);
    }

    pub fn with(self, module: &str, export: &str, implementation: PluginImplementation) -> Self {
        self.register(module, export, implementation);
        self
    }
}

impl ModuleLinker for StaticLinker {
    fn link(&self, module: &str, export: &str, _manifest: &RemoteManifest) -> Option<RemoteModule> {
        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        let implementation = modules.get(&(module.to_string(), export.to_string()))?;
        Some(RemoteModule::from([(export.to_string(), implementation.clone())]))
    }
}

/// A remote known to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRegistration {
    pub name: String,
    pub entry: String,
}

/// Manifest URL of `module`: `{base_url}{assets_path}/{module}/mf-manifest.json`.
pub fn remote_entry_url(module: &str, base_url: Option<&str>, assets_path: &str) -> String {
    format!(
        "{}{}/{}/mf-manifest.json",
        base_url.unwrap_or_default(),
        assets_path,
        module
    )
}

/// [`RemoteModuleHost`] resolving modules through their manifests.
pub struct FederationHost {
    http: Arc<dyn HttpFetch>,
    linker: Arc<dyn ModuleLinker>,
    assets_path: String,
    remotes: RwLock<Vec<RemoteRegistration>>,
    manifests: RwLock<HashMap<String, Arc<RemoteManifest>>>,
}

impl FederationHost {
    pub fn new(http: Arc<dyn HttpFetch>, linker: Arc<dyn ModuleLinker>) -> Self {
        Self::with_assets_path(http, linker, PluginConfig::default().assets_path)
    }

    pub fn with_assets_path(
        http: Arc<dyn HttpFetch>,
        linker: Arc<dyn ModuleLinker>,
        assets_path: impl Into<String>,
    ) -> Self {
        Self {
            http,
            linker,
            assets_path: assets_path.into(),
            remotes: RwLock::new(Vec::new()),
            manifests: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(
        config: &PluginConfig,
        http: Arc<dyn HttpFetch>,
        linker: Arc<dyn ModuleLinker>,
    ) -> Self {
        Self::with_assets_path(http, linker, config.assets_path.clone())
    }

    /// Register `module` unless a remote of that name exists; returns its entry URL.
    pub fn register_remote(&self, module: &str, base_url: Option<&str>) -> String {
        let mut remotes = self.remotes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = remotes.iter().find(|r| r.name == module) {
            return existing.entry.clone();
        }

        let entry = remote_entry_url(module, base_url, &self.assets_path);
        tracing::debug!(module, entry = %entry, "Registering remote");
        remotes.push(RemoteRegistration {
            name: module.to_string(),
            entry: entry.clone(),
        });
        entry
    }

    pub fn remotes(&self) -> Vec<RemoteRegistration> {
        self.remotes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn manifest(&self, module: &str, entry: &str) -> Result<Arc<RemoteManifest>> {
        let cached = self
            .manifests
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module)
            .cloned();
        if let Some(manifest) = cached {
            return Ok(manifest);
        }

        let body = self.http.get_json(entry).await?;
        let manifest: Arc<RemoteManifest> = Arc::new(serde_json::from_value(body)?);

        let mut manifests = self.manifests.write().unwrap_or_else(PoisonError::into_inner);
        Ok(manifests
            .entry(module.to_string())
            .or_insert(manifest)
            .clone())
    }
}

impl RemoteModuleHost for FederationHost {
    fn load_remote_module<'a>(
        &'a self,
        module: &'a str,
        export: &'a str,
        base_url: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<RemoteModule>>> {
        Box::pin(async move {
            let entry = self.register_remote(module, base_url);
            let manifest = self.manifest(module, &entry).await?;

            if !manifest.exposes(export) {
                tracing::debug!(module, export, "Export not exposed by remote");
                return Ok(None);
            }
            Ok(self.linker.link(module, export, &manifest))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vista_core::testing::{MockHttp, MockResponse};
    use vista_core::VistaError;

    fn manifest_json(name: &str, exposes: &[&str]) -> serde_json::Value {
        json!({
            "name": name,
            "exposes": exposes
                .iter()
                .map(|e| json!({ "name": e, "path": format!("./{}", e) }))
                .collect::<Vec<_>>()
        })
    }

    fn host(http: MockHttp, linker: StaticLinker) -> FederationHost {
        FederationHost::new(Arc::new(http), Arc::new(linker))
    }

    #[test]
    fn test_entry_url() {
        assert_eq!(
            remote_entry_url("test-module", None, "/plugins"),
            "/plugins/test-module/mf-manifest.json"
        );
        assert_eq!(
            remote_entry_url("test-module", Some("https://example.com"), "/plugins"),
            "https://example.com/plugins/test-module/mf-manifest.json"
        );
    }

    #[tokio::test]
    async fn test_loads_exposed_and_linked_export() {
        let http = MockHttp::builder()
            .mock_json("/plugins/test-module/mf-manifest.json", manifest_json("test-module", &["testPlugin"]))
            .build();
        let linker = StaticLinker::new().with("test-module", "testPlugin", PluginImplementation::new(7u8));
        let host = host(http.clone(), linker);

        let module = host
            .load_remote_module("test-module", "testPlugin", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(module["testPlugin"].downcast_ref::<u8>(), Some(&7));

        // Unlinked and unexposed exports resolve to nothing.
        assert!(host.load_remote_module("test-module", "other", None).await.unwrap().is_none());

        http.assert_called_times("*mf-manifest.json", 1);
    }

    #[tokio::test]
    async fn test_exposed_but_unlinked() {
        let http = MockHttp::builder()
            .mock_json("*", manifest_json("m", &["a"]))
            .build();
        let host = host(http, StaticLinker::new());
        assert!(host.load_remote_module("m", "a", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_registers_remote_once() {
        let http = MockHttp::builder()
            .mock_json("*", manifest_json("m", &[]))
            .build();
        let host = host(http.clone(), StaticLinker::new());

        host.load_remote_module("m", "a", Some("https://one.example.com")).await.unwrap();
        host.load_remote_module("m", "b", Some("https://two.example.com")).await.unwrap();

        assert_eq!(
            host.remotes(),
            vec![RemoteRegistration {
                name: "m".to_string(),
                entry: "https://one.example.com/plugins/m/mf-manifest.json".to_string(),
            }]
        );
        assert_eq!(http.urls(), vec!["https://one.example.com/plugins/m/mf-manifest.json"]);
    }

    #[tokio::test]
    async fn test_manifest_errors_propagate() {
        let http = MockHttp::builder()
            .mock("/plugins/down/*", |_| MockResponse::transport_error("connection refused"))
            .mock_json("/plugins/bad/*", json!({ "exposes": "nope" }))
            .build();
        let host = host(http, StaticLinker::new());

        assert!(matches!(
            host.load_remote_module("down", "a", None).await,
            Err(VistaError::Transport(_))
        ));
        assert!(matches!(
            host.load_remote_module("bad", "a", None).await,
            Err(VistaError::Deserialization(_))
        ));
    }
}
