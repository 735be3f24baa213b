mod collector;
mod tracing_layer;

pub use collector::DiagnosticsCollector;
pub use tracing_layer::DiagnosticsLayer;

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use vista_core::config::LoggingConfig;
use vista_core::observability::LogLevel;
use vista_core::{Result, VistaError};

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level. Returns the collector when
/// `capture_diagnostics` is enabled.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<Arc<DiagnosticsCollector>>> {
    let filter = EnvFilter::try_new(config.filter_directive())
        .map_err(|e| VistaError::Config(format!("invalid log filter: {}", e)))?;

    let collector = config
        .capture_diagnostics
        .then(|| Arc::new(DiagnosticsCollector::new(config.level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(config.json_format.then(|| fmt::layer().json()))
        .with((!config.json_format).then(|| fmt::layer()))
        .with(collector.clone().map(DiagnosticsLayer::new))
        .try_init()
        .map_err(|e| VistaError::Internal(format!("failed to install tracing subscriber: {}", e)))?;

    tracing::debug!(level = %config.level, json = config.json_format, "Tracing initialised");
    Ok(collector)
}

/// Capture diagnostics emitted on the current thread until the guard drops.
pub fn capture_diagnostics() -> (Arc<DiagnosticsCollector>, tracing::subscriber::DefaultGuard) {
    let collector = Arc::new(DiagnosticsCollector::new(LogLevel::Debug));
    let subscriber = tracing_subscriber::registry().with(DiagnosticsLayer::new(collector.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (collector, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_is_scoped_to_guard() {
        let (collector, guard) = capture_diagnostics();
        tracing::error!("RemotePluginLoader: No valid plugins found");
        drop(guard);
        tracing::error!("after the guard");

        assert!(collector.contains("No valid plugins found"));
        assert!(!collector.contains("after the guard"));
    }
}
