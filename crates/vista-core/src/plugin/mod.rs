//! Plugin module model, validation and loading seams.

mod module;
mod resource;
mod traits;

pub use module::{PluginImplementation, RemoteModule, RemotePluginModule};
pub use resource::{
    is_plugin_metadata, is_plugin_module_resource, PluginDisplay, PluginMetadata,
    PluginMetadataSpec, PluginModuleMetadata, PluginModuleResource, PluginModuleSpec,
    PLUGIN_MODULE_KIND,
};
pub use traits::{BoxFuture, HttpFetch, PluginLoader, RemoteModuleHost};
