//! Engine error type.

use ocelint_parser::ParseError;
use thiserror::Error;

/// Errors produced while loading plugins or inspecting sources.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A plugin name resolved to no known module. Carries both parts
    /// of the identity so the message points at the misspelled half.
    #[error("couldn't load plugin '{plugin}' from `{namespace}` namespace")]
    PluginLoad { plugin: String, namespace: String },

    /// A plugin name that cannot be split into namespace and name.
    #[error("invalid plugin identifier `{0}`, expected `namespace.name`")]
    InvalidPlugin(String),

    /// The source unit failed to parse.
    #[error("invalid syntax in {unit}")]
    Syntax {
        unit: String,
        #[source]
        source: ParseError,
    },

    /// A worker pool could not be created.
    #[error("couldn't start the worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn plugin_load(plugin: &str, namespace: &str) -> Self {
        Self::PluginLoad {
            plugin: plugin.to_owned(),
            namespace: namespace.to_owned(),
        }
    }

    pub(crate) fn syntax(unit: impl Into<String>, source: ParseError) -> Self {
        Self::Syntax {
            unit: unit.into(),
            source,
        }
    }
}
