use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::variable::VariablePlugin;

/// A loaded plugin, opaque apart from the capabilities it was registered with.
#[derive(Clone)]
pub struct PluginImplementation {
    inner: Arc<dyn Any + Send + Sync>,
}

impl PluginImplementation {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Wrap a variable plugin so it can be recovered with [`as_variable`](Self::as_variable).
    pub fn variable(plugin: Arc<dyn VariablePlugin>) -> Self {
        Self::new(plugin)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn as_variable(&self) -> Option<Arc<dyn VariablePlugin>> {
        self.downcast_ref::<Arc<dyn VariablePlugin>>().cloned()
    }

    /// Whether both handles point to the same implementation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for PluginImplementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginImplementation").finish_non_exhaustive()
    }
}

/// Exports of one remote module, by export name.
pub type RemoteModule = HashMap<String, PluginImplementation>;

/// Plugins successfully imported from a plugin module, by plugin name.
pub type RemotePluginModule = HashMap<String, PluginImplementation>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::StaticListVariable;

    #[test]
    fn test_downcast() {
        let implementation = PluginImplementation::new(42u32);
        assert_eq!(implementation.downcast_ref::<u32>(), Some(&42));
        assert!(implementation.downcast_ref::<String>().is_none());
        assert!(implementation.as_variable().is_none());
    }

    #[test]
    fn test_variable_capability() {
        let implementation = PluginImplementation::variable(Arc::new(StaticListVariable));
        assert!(implementation.as_variable().is_some());
        assert!(implementation.ptr_eq(&implementation.clone()));
        assert!(!implementation.ptr_eq(&PluginImplementation::new(())));
    }
}
