//! Plugin catalog fixtures.

use serde_json::{json, Value};

use crate::plugin::PluginModuleResource;

/// Plugin declaration `{kind, spec: {name, display}}`.
pub fn plugin_metadata(kind: &str, name: &str) -> Value {
    json!({
        "kind": kind,
        "spec": {
            "name": name,
            "display": { "name": name, "description": format!("{} plugin", name) }
        }
    })
}

/// Catalog entry for a module declaring `plugins`.
pub fn plugin_module_value(name: &str, version: &str, plugins: Vec<Value>) -> Value {
    json!({
        "kind": "PluginModule",
        "metadata": { "name": name, "version": version },
        "spec": { "plugins": plugins }
    })
}

/// Typed counterpart of [`plugin_module_value`]. Panics on malformed input.
pub fn plugin_module(name: &str, version: &str, plugins: Vec<Value>) -> PluginModuleResource {
    let value = plugin_module_value(name, version, plugins);
    PluginModuleResource::from_value(&value)
        .unwrap_or_else(|| panic!("fixture {} is not a valid plugin module", value))
}

/// `test-module` 1.0.0 with a single `Panel` plugin `testPlugin`.
pub fn valid_plugin_module_value() -> Value {
    plugin_module_value("test-module", "1.0.0", vec![plugin_metadata("Panel", "testPlugin")])
}

pub fn valid_plugin_module() -> PluginModuleResource {
    plugin_module("test-module", "1.0.0", vec![plugin_metadata("Panel", "testPlugin")])
}

/// Entry missing `kind` and `version`, whose plugin lacks a spec.
pub fn invalid_plugin_module_value() -> Value {
    json!({
        "metadata": { "name": "invalid-module" },
        "spec": { "plugins": [{ "kind": "Panel" }] }
    })
}

/// Valid, invalid, valid.
pub fn mixed_validity_catalog() -> Value {
    json!([
        valid_plugin_module_value(),
        invalid_plugin_module_value(),
        plugin_module_value(
            "another-valid-module",
            "2.0.0",
            vec![plugin_metadata("Variable", "anotherPlugin")]
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::is_plugin_module_resource;

    #[test]
    fn test_fixtures_validity() {
        assert!(is_plugin_module_resource(&valid_plugin_module_value()));
        assert!(!is_plugin_module_resource(&invalid_plugin_module_value()));
        assert_eq!(valid_plugin_module().plugins()[0].name(), "testPlugin");

        let catalog = mixed_validity_catalog();
        let valid = catalog
            .as_array()
            .unwrap()
            .iter()
            .filter(|v| is_plugin_module_resource(v))
            .count();
        assert_eq!(valid, 2);
    }
}
