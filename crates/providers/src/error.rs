//! Provider error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Provider construction error
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Replay recording could not be opened or read
    #[error("failed to read replay file '{}': {source}", path.display())]
    ReplayRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Replay line is not a valid fix
    #[error("invalid fix at line {line}: {message}")]
    ReplayParse { line: usize, message: String },

    /// Replay provider configured without a recording
    #[error("replay provider requires 'replay_path'")]
    MissingReplayPath,

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<ProviderError> for ContractError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ReplayParse { line, message } => {
                ContractError::ReplayParse { line, message }
            }
            ProviderError::ReplayRead { source, .. } => ContractError::Io(source),
            ProviderError::Contract(inner) => inner,
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ProviderError>;
