//! Provider traits - external data source abstraction
//!
//! The engine never talks to positioning hardware or the activity recognizer
//! directly. Both are reached through these traits so mock, scripted, replay
//! and platform-backed implementations are interchangeable.

use std::fmt;
use std::sync::Arc;

use crate::{ContractError, Fix, MovementState, SamplingPolicy};

/// Fix delivery callback
///
/// Called by the provider for every fix while the subscription is live.
/// Uses `Arc` so the callback can be shared with provider worker threads.
pub type FixCallback = Arc<dyn Fn(Fix) + Send + Sync>;

/// Movement state delivery callback
pub type MovementCallback = Arc<dyn Fn(MovementState) + Send + Sync>;

/// Opaque, cancellable subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Positioning provider
///
/// # Contract
///
/// 1. `subscribe` starts delivering fixes to `callback` at roughly the
///    policy's interval and precision, until `unsubscribe` is called.
/// 2. `subscribe` fails when the provider cannot serve fixes at all
///    (permission revoked, hardware unavailable). Retrying is the caller's
///    business.
/// 3. `unsubscribe` is idempotent; unknown handles are ignored.
/// 4. Callbacks must not block; they may be invoked from any thread.
pub trait FixProvider: Send + Sync {
    /// Provider name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Start delivering fixes with the given policy
    fn subscribe(
        &self,
        policy: SamplingPolicy,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ContractError>;

    /// Stop a subscription
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Movement classifier service
///
/// Delivers a continuous stream of coarse movement states. Same contract as
/// [`FixProvider`] regarding idempotent cancellation and non-blocking callbacks.
pub trait MovementSource: Send + Sync {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Register a listener
    fn listen(&self, callback: MovementCallback) -> Result<SubscriptionHandle, ContractError>;

    /// Remove a listener
    fn cancel(&self, handle: SubscriptionHandle);
}

impl<T: FixProvider + ?Sized> FixProvider for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn subscribe(
        &self,
        policy: SamplingPolicy,
        callback: FixCallback,
    ) -> Result<SubscriptionHandle, ContractError> {
        (**self).subscribe(policy, callback)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        (**self).unsubscribe(handle)
    }
}

impl<T: MovementSource + ?Sized> MovementSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn listen(&self, callback: MovementCallback) -> Result<SubscriptionHandle, ContractError> {
        (**self).listen(callback)
    }

    fn cancel(&self, handle: SubscriptionHandle) {
        (**self).cancel(handle)
    }
}
