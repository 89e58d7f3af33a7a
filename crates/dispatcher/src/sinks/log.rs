//! LogSink - logs each output via tracing

use contracts::{ContractError, EngineOutput, OutputSink};
use tracing::{info, instrument};

/// Sink that logs every published estimate
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl OutputSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, output),
        fields(sink = %self.name, update_count = output.update_count)
    )]
    async fn write(&mut self, output: &EngineOutput) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            update_count = output.update_count,
            lat = output.centroid.latitude,
            lon = output.centroid.longitude,
            average_accuracy = output.average_accuracy,
            "Location estimate"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
