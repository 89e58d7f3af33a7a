//! Session orchestrator - wires provider, engine and sinks together.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{EngineOutput, StabilityBlueprint};
use providers::ScriptedMovementSource;
use stability_engine::StabilityEngine;
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

use super::{RunStats, StopReason};
use crate::error::{CliError, Result};

/// Time allowed for sinks to drain after the engine stops
const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: StabilityBlueprint,

    /// Stop after this long (None = until shutdown)
    pub duration: Option<Duration>,

    /// Stop after this many published estimates (None = unlimited)
    pub max_updates: Option<u64>,

    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One engine session driven from a blueprint
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run a session until a stop condition or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port).map_err(CliError::Metrics)?;
            info!(port, "Metrics endpoint available");
        }

        let provider = providers::build_fix_provider(&blueprint.provider)?;
        let movement = Arc::new(ScriptedMovementSource::new("scripted-movement"));
        let engine = StabilityEngine::new(blueprint.engine.clone(), provider, movement.clone())?;

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - estimates are only kept in memory");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), engine.subscribe())?;
        // Dropping `stop_tx` on an early return also ends the dispatcher
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let dispatcher_task = dispatcher.spawn_until(async move {
            let _ = stop_rx.await;
        });

        engine.start()?;
        let script = movement.play_config(&blueprint.movement);
        info!(
            stable_capacity = blueprint.engine.stable_capacity,
            candidate_capacity = blueprint.engine.candidate_capacity,
            drift_threshold_m = blueprint.engine.drift_threshold_m,
            script_steps = blueprint.movement.script.len(),
            "Engine session running"
        );

        let mut updates = engine.subscribe();
        let stop_reason = self.wait_for_stop(&mut updates, shutdown).await;
        info!(reason = %stop_reason, "Stopping engine session");

        script.abort();
        let final_estimate = engine.latest();
        let final_policy = engine.current_policy();
        engine.stop();

        let _ = stop_tx.send(());
        let sinks = match tokio::time::timeout(SINK_DRAIN_TIMEOUT, dispatcher_task).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    timeout_secs = SINK_DRAIN_TIMEOUT.as_secs(),
                    "Sinks did not drain in time"
                );
                Vec::new()
            }
        };

        let stats = RunStats {
            duration: start_time.elapsed(),
            stop_reason,
            final_estimate,
            final_policy,
            engine: engine.metrics_summary(),
            sinks,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fixes = stats.engine.total_fixes,
            updates = stats.updates_published(),
            "Session complete"
        );

        Ok(stats)
    }

    async fn wait_for_stop(
        &self,
        updates: &mut watch::Receiver<Option<EngineOutput>>,
        shutdown: impl Future<Output = ()>,
    ) -> StopReason {
        let duration = self.config.duration;
        let deadline = async move {
            match duration {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => return StopReason::Signal,
                _ = &mut deadline => return StopReason::Duration,
                changed = updates.changed() => {
                    if changed.is_err() {
                        // Engine side gone; nothing more will arrive
                        return StopReason::Signal;
                    }
                    let count = updates.borrow_and_update().map_or(0, |o| o.update_count);
                    if self.config.max_updates.is_some_and(|max| count >= max) {
                        info!(updates = count, "Reached update limit");
                        return StopReason::MaxUpdates;
                    }
                }
            }
        }
    }
}
