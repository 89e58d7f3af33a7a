//! Dispatcher error types

use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning sink configs into running sinks
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("sink '{name}' requires parameter '{param}'")]
    MissingParam { name: String, param: &'static str },

    #[error("sink '{name}' could not open {}", path.display())]
    SinkOpen {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DispatcherError {
    pub fn sink_open(name: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SinkOpen {
            name: name.into(),
            path: path.into(),
            source,
        }
    }

    /// Name of the sink the error belongs to
    pub fn sink_name(&self) -> &str {
        match self {
            Self::MissingParam { name, .. } | Self::SinkOpen { name, .. } => name,
        }
    }
}
