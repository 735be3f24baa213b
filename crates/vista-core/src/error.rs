use thiserror::Error;

/// Core error type for vista operations.
#[derive(Error, Debug)]
pub enum VistaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Variable not found: {}", describe_variable(.name, .scope.as_deref()))]
    VariableNotFound {
        name: String,
        /// Source of an external variable; `None` for local variables.
        scope: Option<String>,
    },

    #[error("Plugin not found: {kind} plugin '{name}'")]
    PluginNotFound { kind: String, name: String },

    #[error("Plugin load error: {0}")]
    PluginLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VistaError {
    /// Shorthand for a [`VistaError::VariableNotFound`].
    pub fn variable_not_found(name: impl Into<String>, source: Option<&str>) -> Self {
        VistaError::VariableNotFound {
            name: name.into(),
            scope: source.map(str::to_string),
        }
    }
}

fn describe_variable(name: &str, source: Option<&str>) -> String {
    match source {
        Some(source) => format!("'{}' (source '{}')", name, source),
        None => format!("'{}'", name),
    }
}

impl From<serde_json::Error> for VistaError {
    fn from(e: serde_json::Error) -> Self {
        VistaError::Deserialization(e.to_string())
    }
}

/// Result type alias using VistaError.
pub type Result<T> = std::result::Result<T, VistaError>;
