//! Remote module host double with scripted results.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::error::{Result, VistaError};
use crate::plugin::{BoxFuture, PluginImplementation, RemoteModule, RemoteModuleHost};

/// Scripted outcome of one `load_remote_module` call.
#[derive(Debug, Clone)]
pub enum MockLoad {
    Module(RemoteModule),
    /// The host resolves to nothing.
    Missing,
    /// The host itself fails with [`VistaError::PluginLoad`].
    Fail(String),
}

impl MockLoad {
    /// A module exporting each name with a placeholder implementation.
    pub fn exporting(names: &[&str]) -> Self {
        MockLoad::Module(
            names
                .iter()
                .map(|name| (name.to_string(), PluginImplementation::new(name.to_string())))
                .collect(),
        )
    }
}

/// A recorded `load_remote_module` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCall {
    pub module: String,
    pub export: String,
    pub base_url: Option<String>,
}

impl HostCall {
    pub fn new(module: &str, export: &str, base_url: Option<&str>) -> Self {
        Self {
            module: module.to_string(),
            export: export.to_string(),
            base_url: base_url.map(str::to_string),
        }
    }
}

/// [`RemoteModuleHost`] answering from a queue, then from a fallback.
pub struct MockModuleHost {
    queue: Mutex<VecDeque<MockLoad>>,
    fallback: MockLoad,
    calls: Mutex<Vec<HostCall>>,
}

impl Default for MockModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModuleHost {
    /// A host where every load resolves to nothing.
    pub fn new() -> Self {
        Self::always(MockLoad::Missing)
    }

    /// A host answering every call with `result`.
    pub fn always(result: MockLoad) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: result,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer the next call with `result`.
    pub fn then(self, result: MockLoad) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn assert_called_times(&self, expected: usize) {
        let calls = self.calls();
        assert_eq!(
            calls.len(),
            expected,
            "Expected {} remote module loads, got {:?}",
            expected,
            calls
        );
    }

    fn next_result(&self) -> MockLoad {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl RemoteModuleHost for MockModuleHost {
    fn load_remote_module<'a>(
        &'a self,
        module: &'a str,
        export: &'a str,
        base_url: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<RemoteModule>>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(HostCall::new(module, export, base_url));

            match self.next_result() {
                MockLoad::Module(module) => Ok(Some(module)),
                MockLoad::Missing => Ok(None),
                MockLoad::Fail(message) => Err(VistaError::PluginLoad(message)),
            }
        })
    }
}
