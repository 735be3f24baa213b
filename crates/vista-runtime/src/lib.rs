pub mod federation;
pub mod http;
pub mod loader;
pub mod observability;
pub mod registry;
pub mod variable;

pub use federation::{FederationHost, ModuleLinker, RemoteManifest, StaticLinker};
pub use http::ReqwestFetcher;
pub use loader::RemotePluginLoader;
pub use observability::{capture_diagnostics, init_tracing, DiagnosticsCollector, DiagnosticsLayer};
pub use registry::{PluginRegistry, VARIABLE_PLUGIN_KIND};
pub use variable::{load_variable_options, load_variable_options_with};
