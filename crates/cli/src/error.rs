//! Error types for CLI operations.

use dispatcher::DispatcherError;
use providers::ProviderError;
use stability_engine::EngineError;
use thiserror::Error;

/// Failures while setting up or running a session
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Fix provider could not be built
    #[error("Failed to build fix provider: {0}")]
    Provider(#[from] ProviderError),

    /// Engine refused the configuration or could not start
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Sinks could not be created
    #[error("Failed to set up output sinks: {0}")]
    Dispatcher(#[from] DispatcherError),

    /// Prometheus endpoint could not be installed
    #[error("Failed to start metrics endpoint: {0}")]
    Metrics(#[source] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: &std::path::Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
