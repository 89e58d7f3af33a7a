//! Consumer side of the engine: where published estimates end up

use crate::{ContractError, EngineOutput};

/// A destination for published location estimates
///
/// Each sink runs on its own worker; a slow or failing sink never holds up
/// the engine or its siblings.
#[trait_variant::make(OutputSink: Send)]
pub trait LocalOutputSink {
    /// Label used in logs and per-sink metrics
    fn name(&self) -> &str;

    async fn write(&mut self, output: &EngineOutput) -> Result<(), ContractError>;

    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Called once after the last write; implementations release resources here
    async fn close(&mut self) -> Result<(), ContractError>;
}
