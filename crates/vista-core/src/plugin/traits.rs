use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::module::{RemoteModule, RemotePluginModule};
use super::resource::PluginModuleResource;
use crate::error::Result;

/// Boxed, sendable future returned by the async traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal HTTP client used for the plugin catalog and module manifests.
///
/// Connection failures map to `Transport`, undecodable bodies to
/// `Deserialization`.
pub trait HttpFetch: Send + Sync {
    fn get_json<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Value>>;
}

/// Runtime able to load code that is not known at build time.
///
/// `Ok(None)` means the module or export is unavailable. `Err` means the
/// host itself failed.
pub trait RemoteModuleHost: Send + Sync {
    fn load_remote_module<'a>(
        &'a self,
        module: &'a str,
        export: &'a str,
        base_url: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<RemoteModule>>>;
}

/// Discovers installed plugin modules and imports their implementations.
pub trait PluginLoader: Send + Sync {
    fn get_installed_plugins(&self) -> BoxFuture<'_, Result<Vec<PluginModuleResource>>>;

    fn import_plugin_module<'a>(
        &'a self,
        resource: &'a PluginModuleResource,
    ) -> BoxFuture<'a, Result<RemotePluginModule>>;
}
