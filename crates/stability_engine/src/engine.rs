//! Engine facade: session lifecycle, event worker and output publishing.
//!
//! Both external streams push events into one unbounded mailbox per session.
//! A single worker drains it in order, so classification, publishing and
//! policy changes never interleave. Session state sits behind a mutex; the
//! worker re-checks the session's active flag under that lock before every
//! mutation, so an event still in flight when `stop` runs is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    ContractError, EngineOutput, EngineSnapshot, Fix, FixCallback, FixProvider, GeoPoint,
    MovementCallback, MovementSource, MovementState, SamplingPolicy, StabilityConfig,
    SubscriptionHandle,
};
use observability::{EngineMetricsAggregator, MetricsSummary};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::classifier::{AcceptKind, Classification, Classifier, RejectReason};
use crate::geometry::distance;
use crate::sampling::{trigger_for, PolicyTrigger, SamplingController};

/// Engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fix provider refused the subscription
    #[error("fix provider '{provider}' unavailable: {source}")]
    ProviderUnavailable {
        provider: String,
        #[source]
        source: ContractError,
    },

    /// Movement source refused the listener
    #[error("movement source '{name}' unavailable: {source}")]
    MovementUnavailable {
        name: String,
        #[source]
        source: ContractError,
    },

    /// Engine tuning rejected
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// `start` called outside a Tokio runtime
    #[error("no tokio runtime to run the engine worker: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Event delivered to the session worker
#[derive(Debug, Clone, Copy)]
enum EngineEvent {
    Fix(Fix),
    Movement(MovementState),
}

/// Mutable per-session state
#[derive(Debug)]
struct EngineCore {
    classifier: Classifier,
    sampling: SamplingController,
    movement: MovementState,
    update_count: u64,
    fix_subscription: Option<SubscriptionHandle>,
    last_centroid: Option<GeoPoint>,
    /// Run statistics; reset on start, kept after stop for reporting
    stats: EngineMetricsAggregator,
}

impl EngineCore {
    fn new(config: &StabilityConfig) -> Self {
        Self {
            classifier: Classifier::new(config),
            sampling: SamplingController::new(config.policies),
            movement: MovementState::Unknown,
            update_count: 0,
            fix_subscription: None,
            last_centroid: None,
            stats: EngineMetricsAggregator::new(),
        }
    }

    /// Drop all session state
    fn clear(&mut self) {
        self.classifier.clear();
        self.sampling.reset();
        self.movement = MovementState::Unknown;
        self.update_count = 0;
        self.fix_subscription = None;
        self.last_centroid = None;
    }
}

struct Session {
    active: Arc<AtomicBool>,
    worker: JoinHandle<()>,
    movement_handle: SubscriptionHandle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fix_callback(mailbox: mpsc::UnboundedSender<EngineEvent>) -> FixCallback {
    Arc::new(move |fix| {
        // Closed mailbox: the session is gone
        let _ = mailbox.send(EngineEvent::Fix(fix));
    })
}

fn movement_callback(mailbox: mpsc::UnboundedSender<EngineEvent>) -> MovementCallback {
    Arc::new(move |state| {
        let _ = mailbox.send(EngineEvent::Movement(state));
    })
}

/// Location stability engine
///
/// Turns a noisy stream of fixes into a stable location estimate, adapting
/// the provider's sampling policy as it goes. One engine runs at most one
/// session at a time.
pub struct StabilityEngine {
    config: StabilityConfig,
    provider: Arc<dyn FixProvider>,
    movement: Arc<dyn MovementSource>,
    core: Arc<Mutex<EngineCore>>,
    output_tx: Arc<watch::Sender<Option<EngineOutput>>>,
    session: Mutex<Option<Session>>,
}

impl StabilityEngine {
    /// Create an inactive engine
    pub fn new(
        config: StabilityConfig,
        provider: Arc<dyn FixProvider>,
        movement: Arc<dyn MovementSource>,
    ) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let (output_tx, _) = watch::channel(None);
        Ok(Self {
            core: Arc::new(Mutex::new(EngineCore::new(&config))),
            config,
            provider,
            movement,
            output_tx: Arc::new(output_tx),
            session: Mutex::new(None),
        })
    }

    /// Start a session. No-op when already active.
    ///
    /// # Errors
    /// `NoRuntime` outside a Tokio runtime. `ProviderUnavailable` /
    /// `MovementUnavailable` when a subscription is refused. The engine stays
    /// inactive and nothing is retried.
    #[instrument(name = "engine_start", skip(self), fields(provider = %self.provider.name()))]
    pub fn start(&self) -> Result<(), EngineError> {
        let mut session = lock(&self.session);
        if session.is_some() {
            debug!("engine already active");
            return Ok(());
        }
        // checked before any subscription exists
        let runtime = tokio::runtime::Handle::try_current()?;

        let (mailbox, inbox) = mpsc::unbounded_channel();
        let policy = {
            let mut core = lock(&self.core);
            core.clear();
            core.stats.reset();
            core.sampling.current()
        };

        let movement_handle = self
            .movement
            .listen(movement_callback(mailbox.clone()))
            .map_err(|source| EngineError::MovementUnavailable {
                name: self.movement.name().to_string(),
                source,
            })?;

        let fix_handle = match self.provider.subscribe(policy, fix_callback(mailbox.clone())) {
            Ok(handle) => handle,
            Err(source) => {
                self.movement.cancel(movement_handle);
                warn!(error = %source, "fix provider refused subscription");
                return Err(EngineError::ProviderUnavailable {
                    provider: self.provider.name().to_string(),
                    source,
                });
            }
        };
        lock(&self.core).fix_subscription = Some(fix_handle);
        observability::record_policy_applied(&policy, PolicyTrigger::Start.as_str());

        let active = Arc::new(AtomicBool::new(true));
        let worker = Worker {
            core: Arc::clone(&self.core),
            provider: Arc::clone(&self.provider),
            output_tx: Arc::clone(&self.output_tx),
            active: Arc::clone(&active),
            mailbox,
        };
        let worker = runtime.spawn(worker.run(inbox));

        *session = Some(Session {
            active,
            worker,
            movement_handle,
        });
        info!(%policy, "stability engine started");
        Ok(())
    }

    /// Stop the session and clear all state. No-op when inactive.
    #[instrument(name = "engine_stop", skip(self))]
    pub fn stop(&self) {
        let Some(session) = lock(&self.session).take() else {
            return;
        };

        session.active.store(false, Ordering::SeqCst);
        self.movement.cancel(session.movement_handle);
        let fix_handle = lock(&self.core).fix_subscription.take();
        if let Some(handle) = fix_handle {
            self.provider.unsubscribe(handle);
        }
        session.worker.abort();

        let update_count = {
            let mut core = lock(&self.core);
            let count = core.update_count;
            core.clear();
            count
        };
        self.output_tx.send_replace(None);
        info!(update_count, "stability engine stopped");
    }

    /// Output stream; replays the latest value to new subscribers
    pub fn subscribe(&self) -> watch::Receiver<Option<EngineOutput>> {
        self.output_tx.subscribe()
    }

    /// Latest published output
    pub fn latest(&self) -> Option<EngineOutput> {
        *self.output_tx.borrow()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.session).is_some()
    }

    /// Policy currently requested from the provider
    pub fn current_policy(&self) -> SamplingPolicy {
        lock(&self.core).sampling.current()
    }

    /// Read-only copy of the session state
    pub fn snapshot(&self) -> EngineSnapshot {
        let active = self.is_active();
        let core = lock(&self.core);
        EngineSnapshot {
            active,
            stable: core.classifier.stable().all(),
            candidates: core.classifier.candidates().all(),
            movement: core.movement,
            policy: core.sampling.current(),
            update_count: core.update_count,
        }
    }

    /// Statistics of the current or last session
    pub fn metrics_summary(&self) -> MetricsSummary {
        lock(&self.core).stats.summary()
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }
}

impl Drop for StabilityEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Session worker: sole consumer of the mailbox
struct Worker {
    core: Arc<Mutex<EngineCore>>,
    provider: Arc<dyn FixProvider>,
    output_tx: Arc<watch::Sender<Option<EngineOutput>>>,
    active: Arc<AtomicBool>,
    mailbox: mpsc::UnboundedSender<EngineEvent>,
}

impl Worker {
    #[instrument(name = "engine_worker", skip_all)]
    async fn run(self, mut inbox: mpsc::UnboundedReceiver<EngineEvent>) {
        debug!("worker started");
        while let Some(event) = inbox.recv().await {
            self.handle(event);
        }
    }

    fn handle(&self, event: EngineEvent) {
        let mut core = lock(&self.core);
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        match event {
            EngineEvent::Fix(fix) => self.on_fix(&mut core, fix),
            EngineEvent::Movement(state) => self.on_movement(&mut core, state),
        }
    }

    fn on_fix(&self, core: &mut EngineCore, fix: Fix) {
        observability::record_fix_received(&fix);

        let movement = core.movement;
        let classification = core.classifier.classify(fix, movement);
        let (outcome, detail) = describe(&classification);
        observability::record_classification(outcome, detail);
        core.stats.observe_classification(outcome, detail);
        debug!(outcome, detail, %movement, accuracy = fix.accuracy, "fix classified");

        if classification.updates_estimate() {
            self.publish(core);
        }
        observability::record_buffer_sizes(
            core.classifier.stable().len(),
            core.classifier.candidates().len(),
        );

        if let Some(policy) = core.sampling.on_classification(&classification) {
            if let Some(trigger) = trigger_for(&classification) {
                self.apply_policy(core, policy, trigger);
            }
        }
    }

    fn on_movement(&self, core: &mut EngineCore, state: MovementState) {
        let previous = std::mem::replace(&mut core.movement, state);
        observability::record_movement_update(state);
        debug!(%previous, current = %state, "movement updated");

        if let Some(policy) = core.sampling.on_movement(previous, state) {
            self.apply_policy(core, policy, PolicyTrigger::MovementResumed);
        }
    }

    fn publish(&self, core: &mut EngineCore) {
        let Some((centroid, average_accuracy)) = core.classifier.estimate() else {
            return;
        };
        core.update_count += 1;
        let output = EngineOutput {
            centroid,
            average_accuracy,
            update_count: core.update_count,
        };

        let shift = core.last_centroid.map(|prev| distance(prev, centroid));
        core.last_centroid = Some(centroid);
        observability::record_engine_output(&output, shift);
        core.stats.observe_output(&output, shift);

        self.output_tx.send_replace(Some(output));
        debug!(
            update_count = output.update_count,
            lat = centroid.latitude,
            lon = centroid.longitude,
            average_accuracy,
            "estimate published"
        );
    }

    /// Resubscribe with `policy`: previous subscription first, then the new one
    fn apply_policy(&self, core: &mut EngineCore, policy: SamplingPolicy, trigger: PolicyTrigger) {
        if let Some(handle) = core.fix_subscription.take() {
            self.provider.unsubscribe(handle);
        }

        match self
            .provider
            .subscribe(policy, fix_callback(self.mailbox.clone()))
        {
            Ok(handle) => {
                core.fix_subscription = Some(handle);
                core.stats.observe_policy_change();
                observability::record_policy_applied(&policy, trigger.as_str());
                info!(%policy, trigger = trigger.as_str(), "sampling policy applied");
            }
            Err(err) => {
                observability::record_resubscribe_failure(self.provider.name());
                error!(
                    %policy,
                    trigger = trigger.as_str(),
                    error = %err,
                    "resubscribe failed, no fix subscription until the next policy change"
                );
            }
        }
    }
}

/// Metric labels for a classification
fn describe(classification: &Classification) -> (&'static str, &'static str) {
    let detail = match classification {
        Classification::Accepted { kind, .. } => match kind {
            AcceptKind::Filling => "filling",
            AcceptKind::WithinDrift => "within_drift",
            AcceptKind::Travel => "travel",
        },
        Classification::Buffered { .. } => "candidate",
        Classification::Promoted { .. } => "cluster",
        Classification::Rejected(reason) => match reason {
            RejectReason::LowInformation => "low_information",
            RejectReason::ClusterIncoherent => "cluster_incoherent",
            RejectReason::OutsideClusterAccuracy => "outside_cluster_accuracy",
        },
    };
    (classification.label(), detail)
}
