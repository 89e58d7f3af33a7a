//! Mock fix provider
//!
//! Emits fixes jittered around a movable anchor, one per policy interval, on
//! a Tokio task per subscription. Used for development runs without a real
//! positioning stack.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::{
    ContractError, Fix, FixCallback, FixProvider, GeoPoint, Priority, ProviderConfig,
    SamplingPolicy, SubscriptionHandle,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, trace};

use crate::metrics::{ProviderMetrics, ProviderMetricsSnapshot};
use crate::subscriptions::Subscriptions;

/// Mock provider configuration
#[derive(Debug, Clone)]
pub struct MockFixConfig {
    /// Initial anchor
    pub origin: GeoPoint,
    /// Max offset per axis (metres)
    pub jitter_m: f64,
    /// Reported accuracy in high-accuracy mode (metres)
    pub accuracy_m: f64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for MockFixConfig {
    fn default() -> Self {
        Self {
            origin: GeoPoint::default(),
            jitter_m: 2.0,
            accuracy_m: 5.0,
            seed: None,
        }
    }
}

impl From<&ProviderConfig> for MockFixConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            origin: config.origin,
            jitter_m: config.jitter_m,
            accuracy_m: config.accuracy_m,
            seed: None,
        }
    }
}

/// Mock fix provider
pub struct MockFixProvider {
    config: MockFixConfig,
    anchor: Arc<Mutex<GeoPoint>>,
    tasks: Subscriptions<JoinHandle<()>>,
    metrics: Arc<ProviderMetrics>,
}

impl MockFixProvider {
    pub fn new(config: MockFixConfig) -> Self {
        Self {
            anchor: Arc::new(Mutex::new(config.origin)),
            config,
            tasks: Subscriptions::default(),
            metrics: Arc::new(ProviderMetrics::new()),
        }
    }

    /// Relocate the anchor; subsequent fixes are generated around `anchor`
    pub fn move_anchor_to(&self, anchor: GeoPoint) {
        *self.anchor.lock().unwrap_or_else(PoisonError::into_inner) = anchor;
        debug!(lat = anchor.latitude, lon = anchor.longitude, "mock anchor moved");
    }

    pub fn anchor(&self) -> GeoPoint {
        *self.anchor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn metrics(&self) -> ProviderMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Accuracy reported for `priority`; balanced power is twice as coarse
    pub fn accuracy_for(&self, priority: Priority) -> f64 {
        match priority {
            Priority::HighAccuracy => self.config.accuracy_m,
            Priority::BalancedPower => self.config.accuracy_m * 2.0,
        }
    }

    fn rng(&self, subscription: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(subscription)),
            None => StdRng::from_os_rng(),
        }
    }
}

/// One fix around `anchor` with uniform per-axis jitter
fn jittered_fix(rng: &mut impl Rng, anchor: GeoPoint, jitter_m: f64, accuracy: f64) -> Fix {
    let (north, east) = if jitter_m > 0.0 {
        (
            rng.random_range(-jitter_m..=jitter_m),
            rng.random_range(-jitter_m..=jitter_m),
        )
    } else {
        (0.0, 0.0)
    };
    let point = anchor.offset_m(north, east);
    Fix::new(point.latitude, point.longitude, accuracy).with_timestamp(unix_seconds())
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

impl FixProvider for MockFixProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn subscribe(
        &self,
        policy: SamplingPolicy,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ContractError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ContractError::provider_unavailable("mock", e.to_string()))?;

        let anchor = Arc::clone(&self.anchor);
        let metrics = Arc::clone(&self.metrics);
        let jitter_m = self.config.jitter_m;
        let accuracy = self.accuracy_for(policy.priority);
        let mut rng = self.rng(self.metrics.snapshot().subscriptions);
        let period = Duration::from_millis(policy.interval_ms.max(1));

        let task = runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let center = *anchor.lock().unwrap_or_else(PoisonError::into_inner);
                let fix = jittered_fix(&mut rng, center, jitter_m, accuracy);
                metrics.record_fix();
                trace!(lat = fix.latitude, lon = fix.longitude, "mock fix");
                callback(fix);
            }
        });

        self.metrics.record_subscribe();
        let handle = self.tasks.insert(task);
        debug!(%handle, %policy, "mock provider subscribed");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(task) = self.tasks.remove(handle) {
            task.abort();
            self.metrics.record_unsubscribe();
            debug!(%handle, "mock provider unsubscribed");
        }
    }
}

impl Drop for MockFixProvider {
    fn drop(&mut self) {
        for task in self.tasks.drain() {
            task.abort();
        }
    }
}
