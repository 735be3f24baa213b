//! Fetching list variable options through variable plugins.

use vista_core::variable::{
    TemplateVariableStore, VariableDefinition, VariableOptionsContext, VariablePlugin,
};
use vista_core::{Result, VistaError};

use crate::registry::PluginRegistry;

/// Load the options of list variable `name` with `plugin` and store them.
///
/// Plugin failures end up in the variable's `error`. Returns `false` when a
/// newer fetch or a definitions change superseded this one.
pub async fn load_variable_options(
    store: &TemplateVariableStore,
    name: &str,
    source: Option<&str>,
    plugin: &dyn VariablePlugin,
    ctx: &VariableOptionsContext,
) -> Result<bool> {
    let spec = plugin_spec(store, name, source)?;

    let ticket = store.begin_options_fetch(name, source)?;
    let result = plugin.get_variable_options(&spec.spec, ctx).await;
    Ok(store.complete_options_fetch(ticket, result))
}

/// As [`load_variable_options`], resolving the plugin through `registry`.
///
/// A plugin that cannot be resolved is reported on the variable like any
/// other options failure.
pub async fn load_variable_options_with(
    store: &TemplateVariableStore,
    registry: &PluginRegistry,
    name: &str,
    source: Option<&str>,
    ctx: &VariableOptionsContext,
) -> Result<bool> {
    let spec = plugin_spec(store, name, source)?;

    let ticket = store.begin_options_fetch(name, source)?;
    let result = match registry.get_variable_plugin(&spec.kind).await {
        Ok(plugin) => plugin.get_variable_options(&spec.spec, ctx).await,
        Err(e) => Err(e),
    };
    Ok(store.complete_options_fetch(ticket, result))
}

fn plugin_spec(
    store: &TemplateVariableStore,
    name: &str,
    source: Option<&str>,
) -> Result<vista_core::variable::PluginSpec> {
    let definition = store
        .definition(name, source)
        .ok_or_else(|| VistaError::variable_not_found(name, source))?;

    match definition {
        VariableDefinition::ListVariable(spec) => spec.plugin.ok_or_else(|| {
            VistaError::InvalidArgument(format!("list variable '{}' has no plugin", name))
        }),
        VariableDefinition::TextVariable(_) => Err(VistaError::InvalidArgument(format!(
            "variable '{}' is not a list variable",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{json, Value};
    use vista_core::plugin::BoxFuture;
    use vista_core::testing::single_value;
    use vista_core::variable::{StaticListVariable, VariableOption, VariableValue};
    use vista_core::assert_err_variant;

    fn store() -> TemplateVariableStore {
        let definitions = serde_json::from_value(json!([
            {
                "kind": "ListVariable",
                "spec": {
                    "name": "env",
                    "plugin": { "kind": "StaticListVariable", "spec": { "values": ["prod", "dev"] } }
                }
            },
            { "kind": "ListVariable", "spec": { "name": "bare" } },
            { "kind": "TextVariable", "spec": { "name": "greeting", "value": "hi" } }
        ]))
        .unwrap();
        TemplateVariableStore::builder().definitions(definitions).build()
    }

    struct FailingPlugin;

    impl VariablePlugin for FailingPlugin {
        fn get_variable_options<'a>(
            &'a self,
            _spec: &'a Value,
            _ctx: &'a VariableOptionsContext,
        ) -> BoxFuture<'a, Result<Vec<VariableOption>>> {
            Box::pin(async { Err(VistaError::Transport("datasource unreachable".to_string())) })
        }
    }

    /// Starts a newer fetch of the same variable while it runs.
    struct SupersededPlugin(Arc<TemplateVariableStore>);

    impl VariablePlugin for SupersededPlugin {
        fn get_variable_options<'a>(
            &'a self,
            spec: &'a Value,
            _ctx: &'a VariableOptionsContext,
        ) -> BoxFuture<'a, Result<Vec<VariableOption>>> {
            Box::pin(async move {
                self.0.begin_options_fetch("env", None)?;
                StaticListVariable::options(spec)
            })
        }
    }

    #[tokio::test]
    async fn test_loads_and_selects_first_option() {
        let store = store();
        let ctx = VariableOptionsContext::default();

        let applied = load_variable_options(&store, "env", None, &StaticListVariable, &ctx)
            .await
            .unwrap();

        assert!(applied);
        let state = store.state("env", None).unwrap();
        assert!(!state.loading);
        assert_eq!(state.option_values(), Some(vec!["prod".to_string(), "dev".to_string()]));
        assert_eq!(single_value(&store.values(None), "env"), Some("prod"));
    }

    #[tokio::test]
    async fn test_plugin_failure_is_recorded_on_state() {
        let store = store();

        let applied = load_variable_options(&store, "env", None, &FailingPlugin, &Default::default())
            .await
            .unwrap();

        assert!(applied);
        let state = store.state("env", None).unwrap();
        assert!(!state.loading);
        assert!(state.error.unwrap().contains("datasource unreachable"));
        assert_eq!(state.value, None::<VariableValue>);
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let store = Arc::new(store());
        let plugin = SupersededPlugin(store.clone());

        let applied = load_variable_options(&store, "env", None, &plugin, &Default::default())
            .await
            .unwrap();

        assert!(!applied);
        let state = store.state("env", None).unwrap();
        assert_eq!(state.option_values(), Some(Vec::new()));
        assert_eq!(state.value, None);
        // the newer fetch is still in flight
        assert!(state.loading);
    }

    #[tokio::test]
    async fn test_rejects_variables_without_plugin() {
        let store = store();
        let ctx = VariableOptionsContext::default();

        assert_err_variant!(
            load_variable_options(&store, "bare", None, &StaticListVariable, &ctx).await,
            VistaError::InvalidArgument(_)
        );
        assert_err_variant!(
            load_variable_options(&store, "greeting", None, &StaticListVariable, &ctx).await,
            VistaError::InvalidArgument(_)
        );
        assert_err_variant!(
            load_variable_options(&store, "missing", None, &StaticListVariable, &ctx).await,
            VistaError::VariableNotFound { .. }
        );
        assert!(!store.state("bare", None).unwrap().loading);
    }
}
