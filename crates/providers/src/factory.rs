//! Build providers from a blueprint

use std::sync::Arc;

use contracts::{FixProvider, ProviderConfig, ProviderKind};
use tracing::info;

use crate::error::Result;
use crate::mock::{MockFixConfig, MockFixProvider};
use crate::replay::{ReplayConfig, ReplayFixProvider};

/// Construct the configured fix provider
pub fn build_fix_provider(config: &ProviderConfig) -> Result<Arc<dyn FixProvider>> {
    let provider: Arc<dyn FixProvider> = match config.kind {
        ProviderKind::Mock => Arc::new(MockFixProvider::new(MockFixConfig::from(config))),
        ProviderKind::Replay => Arc::new(ReplayFixProvider::load(
            ReplayConfig::from_provider_config(config)?,
        )?),
    };
    info!(provider = provider.name(), "fix provider ready");
    Ok(provider)
}
