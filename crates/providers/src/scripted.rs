//! Deterministic fix provider and movement source.
//!
//! Nothing is emitted on its own: the owner pushes fixes and movement states
//! explicitly, and each push is delivered synchronously to every live
//! subscription. Used by tests and by the CLI movement script.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    ContractError, Fix, FixCallback, FixProvider, MovementCallback, MovementConfig,
    MovementSource, MovementState, MovementStep, SamplingPolicy, SubscriptionHandle,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, trace};

use crate::metrics::{ProviderMetrics, ProviderMetricsSnapshot};
use crate::subscriptions::Subscriptions;

#[derive(Clone)]
struct FixSubscription {
    policy: SamplingPolicy,
    callback: FixCallback,
}

/// Fix provider driven by explicit [`emit`](ScriptedFixProvider::emit) calls
pub struct ScriptedFixProvider {
    name: String,
    available: AtomicBool,
    subscriptions: Subscriptions<FixSubscription>,
    policy_history: Mutex<Vec<SamplingPolicy>>,
    metrics: ProviderMetrics,
}

impl Default for ScriptedFixProvider {
    fn default() -> Self {
        Self::new("scripted")
    }
}

impl ScriptedFixProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: AtomicBool::new(true),
            subscriptions: Subscriptions::default(),
            policy_history: Mutex::new(Vec::new()),
            metrics: ProviderMetrics::new(),
        }
    }

    /// Deliver `fix` to every live subscription, returns the number reached
    pub fn emit(&self, fix: Fix) -> usize {
        let targets = self.subscriptions.snapshot();
        for sub in &targets {
            self.metrics.record_fix();
            (sub.callback)(fix);
        }
        trace!(provider = %self.name, delivered = targets.len(), "scripted fix");
        targets.len()
    }

    /// Availability toggle; `false` makes every subscribe fail (permission revoked)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.len() > 0
    }

    /// Policy of the most recent live subscription
    pub fn current_policy(&self) -> Option<SamplingPolicy> {
        self.subscriptions.snapshot().last().map(|sub| sub.policy)
    }

    /// Every policy ever subscribed with, in order
    pub fn policy_history(&self) -> Vec<SamplingPolicy> {
        self.policy_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metrics(&self) -> ProviderMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl FixProvider for ScriptedFixProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(
        &self,
        policy: SamplingPolicy,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ContractError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(ContractError::provider_unavailable(
                &self.name,
                "location permission revoked",
            ));
        }

        self.policy_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(policy);
        self.metrics.record_subscribe();
        let handle = self.subscriptions.insert(FixSubscription { policy, callback });
        debug!(provider = %self.name, %handle, %policy, "subscribed");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscriptions.remove(handle).is_some() {
            self.metrics.record_unsubscribe();
            debug!(provider = %self.name, %handle, "unsubscribed");
        }
    }
}

/// Movement source driven by explicit [`emit`](ScriptedMovementSource::emit)
/// calls or a timed script
pub struct ScriptedMovementSource {
    name: String,
    available: AtomicBool,
    listeners: Subscriptions<MovementCallback>,
}

impl Default for ScriptedMovementSource {
    fn default() -> Self {
        Self::new("scripted_movement")
    }
}

impl ScriptedMovementSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: AtomicBool::new(true),
            listeners: Subscriptions::default(),
        }
    }

    /// Deliver `state` to every listener, returns the number reached
    pub fn emit(&self, state: MovementState) -> usize {
        let targets = self.listeners.snapshot();
        for callback in &targets {
            callback(state);
        }
        debug!(source = %self.name, %state, delivered = targets.len(), "movement update");
        targets.len()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Play `script` on a Tokio task; offsets are relative to this call
    pub fn play(self: &Arc<Self>, script: Vec<MovementStep>) -> JoinHandle<()> {
        let source = Arc::clone(self);
        let start = Instant::now();
        tokio::spawn(async move {
            for step in script {
                sleep_until(start + Duration::from_millis(step.after_ms)).await;
                source.emit(step.state);
            }
            debug!(source = %source.name, "movement script finished");
        })
    }

    /// Emit the configured initial state, then play the script
    pub fn play_config(self: &Arc<Self>, config: &MovementConfig) -> JoinHandle<()> {
        let mut script = Vec::with_capacity(config.script.len() + 1);
        script.push(MovementStep {
            after_ms: 0,
            state: config.initial,
        });
        script.extend(config.script.iter().copied());
        self.play(script)
    }
}

impl MovementSource for ScriptedMovementSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(&self, callback: MovementCallback) -> Result<SubscriptionHandle, ContractError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(ContractError::provider_unavailable(
                &self.name,
                "activity recognition unavailable",
            ));
        }
        Ok(self.listeners.insert(callback))
    }

    fn cancel(&self, handle: SubscriptionHandle) {
        self.listeners.remove(handle);
    }
}
