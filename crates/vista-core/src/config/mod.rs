mod observability;

pub use observability::LoggingConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VistaError};

/// Root configuration for a vista host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VistaConfig {
    /// Remote plugin catalog and asset locations.
    #[serde(default)]
    pub plugins: PluginConfig,

    /// Template variable behaviour.
    #[serde(default)]
    pub variables: VariablesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VistaConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VistaError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        toml::from_str(&content)
            .map_err(|e| VistaError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Configuration pointing every plugin request at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            plugins: PluginConfig {
                base_url: Some(base_url.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Where installed plugins are listed and where their assets are served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Optional prefix for both the catalog API and the plugin assets.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path of the installed plugins catalog.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Path under which plugin modules are served when no base URL is set.
    #[serde(default = "default_assets_path")]
    pub assets_path: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PluginConfig {
    /// Full URL of the installed plugins catalog.
    ///
    /// The base URL is prefixed verbatim, a trailing slash is kept.
    pub fn catalog_url(&self) -> String {
        format!("{}{}", self.base_url.as_deref().unwrap_or(""), self.api_path)
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_path: default_api_path(),
            assets_path: default_assets_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_path() -> String {
    "/api/v1/plugins".to_string()
}

fn default_assets_path() -> String {
    "/plugins".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Template variable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariablesConfig {
    /// Prefix of the URL query parameters carrying variable values.
    #[serde(default = "default_query_param_prefix")]
    pub query_param_prefix: String,

    /// Whether value changes are written back to the URL query parameters.
    #[serde(default = "default_true")]
    pub sync_query_params: bool,
}

impl VariablesConfig {
    /// Query parameter name for a variable.
    pub fn query_param_name(&self, name: &str) -> String {
        format!("{}{}", self.query_param_prefix, name)
    }
}

impl Default for VariablesConfig {
    fn default() -> Self {
        Self {
            query_param_prefix: default_query_param_prefix(),
            sync_query_params: true,
        }
    }
}

fn default_query_param_prefix() -> String {
    "var-".to_string()
}

fn default_true() -> bool {
    true
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    static ENV_VAR: once_cell::sync::Lazy<regex_lite::Regex> = once_cell::sync::Lazy::new(|| {
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern")
    });

    let mut result = content.to_string();
    for cap in ENV_VAR.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LogLevel;

    #[test]
    fn test_default_config() {
        let config = VistaConfig::default();
        assert_eq!(config.plugins.api_path, "/api/v1/plugins");
        assert_eq!(config.plugins.assets_path, "/plugins");
        assert_eq!(config.plugins.catalog_url(), "/api/v1/plugins");
        assert_eq!(config.variables.query_param_prefix, "var-");
        assert!(config.variables.sync_query_params);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = VistaConfig::parse_toml("").unwrap();
        assert!(config.plugins.base_url.is_none());
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [plugins]
            base_url = "https://dashboards.example.com"
            assets_path = "/static/plugins"
            request_timeout_secs = 5

            [variables]
            query_param_prefix = "v-"
            sync_query_params = false

            [logging]
            level = "debug"
            json_format = true
        "#;

        let config = VistaConfig::parse_toml(toml).unwrap();
        assert_eq!(
            config.plugins.catalog_url(),
            "https://dashboards.example.com/api/v1/plugins"
        );
        assert_eq!(config.plugins.assets_path, "/static/plugins");
        assert_eq!(config.plugins.request_timeout_secs, 5);
        assert_eq!(config.variables.query_param_name("env"), "v-env");
        assert!(!config.variables.sync_query_params);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_catalog_url_keeps_trailing_slash() {
        let config = VistaConfig::with_base_url("https://example.com/");
        assert_eq!(
            config.plugins.catalog_url(),
            "https://example.com//api/v1/plugins"
        );
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let result = VistaConfig::parse_toml("[plugins]\nrequest_timeout_secs = \"soon\"");
        assert!(matches!(result, Err(VistaError::Config(_))));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("VISTA_TEST_PLUGIN_HOST", "https://plugins.internal");

        let toml = r#"
            [plugins]
            base_url = "${VISTA_TEST_PLUGIN_HOST}"
        "#;

        let config = VistaConfig::parse_toml(toml).unwrap();
        assert_eq!(
            config.plugins.base_url.as_deref(),
            Some("https://plugins.internal")
        );

        std::env::remove_var("VISTA_TEST_PLUGIN_HOST");
    }
}
