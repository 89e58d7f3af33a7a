//! Stability engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::SamplingPolicy;

/// Stability engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StabilityConfig {
    /// Capacity N of the stable set
    #[validate(range(min = 1, message = "stable_capacity must be >= 1"))]
    pub stable_capacity: usize,

    /// Capacity M of the candidate set
    #[validate(range(min = 1, message = "candidate_capacity must be >= 1"))]
    pub candidate_capacity: usize,

    /// Max distance (metres) from the centroid still treated as the same place
    #[validate(range(exclusive_min = 0.0, message = "drift_threshold_m must be > 0"))]
    pub drift_threshold_m: f64,

    /// Reject fixes reporting exactly zero speed and altitude before classification
    pub drop_low_information_fixes: bool,

    /// Sampling policies per controller trigger
    #[validate(nested)]
    pub policies: PolicyTable,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            stable_capacity: 10,
            candidate_capacity: 5,
            drift_threshold_m: 3.0,
            drop_low_information_fixes: false,
            policies: PolicyTable::default(),
        }
    }
}

/// Sampling policies applied by the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PolicyTable {
    /// Applied on session start
    #[validate(nested)]
    pub startup: SamplingPolicy,

    /// Applied while a candidate cluster gathers evidence
    #[validate(nested)]
    pub gathering: SamplingPolicy,

    /// Applied after promotion
    #[validate(nested)]
    pub settled: SamplingPolicy,

    /// Applied when movement leaves still/tilting
    #[validate(nested)]
    pub reacquire: SamplingPolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            startup: SamplingPolicy::STARTUP,
            gathering: SamplingPolicy::GATHERING,
            settled: SamplingPolicy::SETTLED,
            reacquire: SamplingPolicy::REACQUIRE,
        }
    }
}
