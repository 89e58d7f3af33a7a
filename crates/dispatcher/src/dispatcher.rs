//! Dispatcher - fans engine outputs out to sinks

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{EngineOutput, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink};

/// Engine output stream as handed out by the engine
pub type OutputReceiver = watch::Receiver<Option<EngineOutput>>;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: OutputReceiver,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: OutputReceiver) -> Self {
        Self { config, input_rx }
    }

    /// Build the dispatcher, spawning one worker per sink
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(sink_count = self.config.sinks.len())
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = self
            .config
            .sinks
            .iter()
            .map(create_sink_handle)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok(SinkHandle::spawn(
            LogSink::new(&config.name),
            config.queue_capacity,
        )),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Fans each new engine output out to all sinks
///
/// The input is a latest-value channel: if the engine publishes faster than
/// the dispatcher is scheduled, intermediate outputs are skipped and the
/// newest one is delivered.
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: OutputReceiver,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: OutputReceiver) -> Self {
        Self { handles, input_rx }
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run until the engine side of the channel is dropped
    pub async fn run(self) -> Vec<(String, MetricsSnapshot)> {
        self.run_until(std::future::pending()).await
    }

    /// Run until the engine is dropped or `shutdown` resolves, then drain
    /// every sink. Returns final per-sink metrics.
    #[instrument(name = "dispatcher_run", skip_all, fields(sinks = self.handles.len()))]
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Vec<(String, MetricsSnapshot)> {
        info!("Dispatcher started");
        tokio::pin!(shutdown);

        let mut dispatched: u64 = 0;
        loop {
            tokio::select! {
                changed = self.input_rx.changed() => {
                    if changed.is_err() {
                        debug!("engine output channel closed");
                        break;
                    }
                    // `None` marks a stopped engine, nothing to forward
                    let latest = *self.input_rx.borrow_and_update();
                    if let Some(output) = latest {
                        self.dispatch(output);
                        dispatched += 1;
                        if dispatched.is_multiple_of(100) {
                            debug!(outputs = dispatched, "Dispatcher progress");
                        }
                    }
                }
                _ = &mut shutdown => {
                    debug!("shutdown requested");
                    break;
                }
            }
        }

        info!(outputs = dispatched, "Dispatcher input closed, shutting down");
        let handles = self.handles;
        let metrics: Vec<_> = handles
            .iter()
            .map(|h| (h.name().to_string(), std::sync::Arc::clone(h.metrics())))
            .collect();
        for handle in handles {
            handle.shutdown().await;
        }
        info!("Dispatcher shutdown complete");

        metrics
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect()
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    /// Spawn with an explicit shutdown signal
    pub fn spawn_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run_until(shutdown))
    }

    fn dispatch(&self, output: EngineOutput) {
        for handle in &self.handles {
            handle.try_send(output);
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: OutputReceiver,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build()
}
