//! Installable plugin modules as described by the plugin catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PLUGIN_MODULE_KIND: &str = "PluginModule";

/// An installable unit exporting one or more plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginModuleResource {
    pub kind: String,
    pub metadata: PluginModuleMetadata,
    pub spec: PluginModuleSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginModuleMetadata {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginModuleSpec {
    pub plugins: Vec<PluginMetadata>,
}

/// One plugin declared by a module; `kind` is the plugin type (`Panel`,
/// `Variable`, ...) and `spec.name` the export name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub kind: String,
    pub spec: PluginMetadataSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadataSpec {
    pub name: String,
    pub display: PluginDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDisplay {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PluginModuleResource {
    /// Validate and convert a raw catalog entry; `None` when malformed.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !is_plugin_module_resource(value) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn plugins(&self) -> &[PluginMetadata] {
        &self.spec.plugins
    }
}

impl PluginMetadata {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

fn is_str(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(_)))
}

/// Structural check of a single plugin declaration.
pub fn is_plugin_metadata(value: &Value) -> bool {
    let Some(spec) = value.get("spec").filter(|s| s.is_object()) else {
        return false;
    };
    let display_ok = spec
        .get("display")
        .filter(|d| d.is_object())
        .is_some_and(|d| is_str(d.get("name")));

    is_str(value.get("kind")) && is_str(spec.get("name")) && display_ok
}

/// Structural check of a catalog entry, including every declared plugin.
pub fn is_plugin_module_resource(value: &Value) -> bool {
    let kind_ok = value.get("kind").and_then(Value::as_str) == Some(PLUGIN_MODULE_KIND);
    let metadata_ok = value
        .get("metadata")
        .is_some_and(|m| is_str(m.get("name")) && is_str(m.get("version")));
    let plugins_ok = value
        .get("spec")
        .and_then(|s| s.get("plugins"))
        .and_then(Value::as_array)
        .is_some_and(|plugins| plugins.iter().all(is_plugin_metadata));

    kind_ok && metadata_ok && plugins_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_metadata() -> Value {
        json!({
            "kind": "Panel",
            "spec": {
                "name": "testPlugin",
                "display": { "name": "Test Plugin", "description": "A test plugin" }
            }
        })
    }

    #[test]
    fn test_valid_resource() {
        let value = json!({
            "kind": "PluginModule",
            "metadata": { "name": "test-module", "version": "1.0.0" },
            "spec": { "plugins": [valid_metadata()] }
        });

        assert!(is_plugin_module_resource(&value));
        let resource = PluginModuleResource::from_value(&value).unwrap();
        assert_eq!(resource.name(), "test-module");
        assert_eq!(resource.plugins()[0].name(), "testPlugin");
        assert_eq!(
            resource.plugins()[0].spec.display.description.as_deref(),
            Some("A test plugin")
        );
    }

    #[test]
    fn test_invalid_metadata() {
        assert!(is_plugin_metadata(&valid_metadata()));
        assert!(!is_plugin_metadata(&json!({ "kind": "Panel" })));
        assert!(!is_plugin_metadata(&json!({ "invalid": "plugin" })));
        assert!(!is_plugin_metadata(&json!({
            "kind": "Panel",
            "spec": { "name": "p" }
        })));
        assert!(!is_plugin_metadata(&json!({
            "kind": 1,
            "spec": { "name": "p", "display": { "name": "P" } }
        })));
    }

    #[test]
    fn test_invalid_resources() {
        let cases = [
            json!(null),
            json!({ "invalid": "object" }),
            json!({
                "metadata": { "name": "invalid-module" },
                "spec": { "plugins": [{ "kind": "Panel" }] }
            }),
            json!({
                "kind": "Dashboard",
                "metadata": { "name": "m", "version": "1" },
                "spec": { "plugins": [] }
            }),
            json!({
                "kind": "PluginModule",
                "metadata": { "name": "partial-module", "version": "1.0.0" },
                "spec": { "plugins": [valid_metadata(), { "invalid": "plugin" }] }
            }),
        ];
        for case in cases {
            assert!(!is_plugin_module_resource(&case), "{}", case);
            assert!(PluginModuleResource::from_value(&case).is_none());
        }
    }

    #[test]
    fn test_empty_plugin_list_is_valid() {
        let value = json!({
            "kind": "PluginModule",
            "metadata": { "name": "empty", "version": "0.1.0" },
            "spec": { "plugins": [] }
        });
        assert!(is_plugin_module_resource(&value));
    }
}
