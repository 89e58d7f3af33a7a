//! Errors shared across crate boundaries
//!
//! Grouped by where they originate: configuration, positioning providers,
//! and output sinks.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ContractError {
    /// Blueprint text is not valid TOML/JSON or does not match the schema
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Blueprint parsed but a value is out of range; `field` is a dotted path
    #[error("invalid config value at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// The provider refused to serve fixes (permission revoked, no hardware)
    #[error("provider '{provider}' unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("replay parse error at line {line}: {message}")]
    ReplayParse { line: usize, message: String },

    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ContractError {
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Parse error carrying the underlying decoder error
    pub fn config_parse_with(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider_unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// True for errors caused by the blueprint rather than the runtime
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigParse { .. } | Self::ConfigValidation { .. })
    }
}
