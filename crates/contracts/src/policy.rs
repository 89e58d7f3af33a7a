//! SamplingPolicy - the only state shared with the positioning provider.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Precision/power trade-off requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    HighAccuracy,
    BalancedPower,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::HighAccuracy => "high_accuracy",
            Priority::BalancedPower => "balanced_power",
        }
    }
}

/// How often and how precisely fixes are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct SamplingPolicy {
    /// Requested fix interval (milliseconds)
    #[validate(range(min = 1, message = "interval_ms must be > 0"))]
    pub interval_ms: u64,

    /// Requested precision priority
    pub priority: Priority,
}

impl SamplingPolicy {
    /// Policy applied when a session starts
    pub const STARTUP: SamplingPolicy = SamplingPolicy {
        interval_ms: 500,
        priority: Priority::HighAccuracy,
    };

    /// Policy while a candidate relocation is gathering evidence
    pub const GATHERING: SamplingPolicy = SamplingPolicy {
        interval_ms: 100,
        priority: Priority::HighAccuracy,
    };

    /// Policy right after a candidate cluster was promoted
    pub const SETTLED: SamplingPolicy = SamplingPolicy {
        interval_ms: 5000,
        priority: Priority::BalancedPower,
    };

    /// Policy when the device starts moving again
    pub const REACQUIRE: SamplingPolicy = SamplingPolicy {
        interval_ms: 100,
        priority: Priority::HighAccuracy,
    };

    pub fn new(interval_ms: u64, priority: Priority) -> Self {
        Self {
            interval_ms,
            priority,
        }
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::STARTUP
    }
}

impl std::fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms/{}", self.interval_ms, self.priority.as_str())
    }
}
