//! Per-fix classification: accept, buffer, promote or reject.
//!
//! The classifier has no explicit state enum; its phase follows from the
//! buffers:
//!
//! - **Filling**: stable set not full, every fix is accepted
//! - **Steady**: stable set full, fixes are judged by their distance to the
//!   stable centroid and by the latest movement state
//!
//! A fix that drifts while the device claims to be still is kept in the
//! candidate set. Once the candidate set is full and forms a tight cluster
//! it replaces the stable set wholesale (promotion).

use contracts::{Fix, GeoPoint, MovementState, StabilityConfig};
use tracing::trace;

use crate::buffer::{CandidateSet, EvictionStrategy, StableSet};
use crate::geometry::distance;

/// How an accepted fix entered the stable set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptKind {
    /// Stable set was not full yet
    Filling,
    /// Within the drift threshold of the centroid
    WithinDrift,
    /// Beyond the drift threshold while the device is moving
    Travel,
}

/// Why a fix was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Zero speed and zero altitude reported (opt-in pre-filter)
    LowInformation,
    /// Full candidate set is not a tight cluster
    ClusterIncoherent,
    /// Fix lies outside the candidate centroid +/- mean candidate accuracy
    OutsideClusterAccuracy,
}

/// Classifier decision for one fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Inserted into the stable set
    Accepted {
        kind: AcceptKind,
        /// Member given up to make room
        evicted: Option<Fix>,
        /// Distance to the previous centroid (steady phase only)
        distance_m: Option<f64>,
    },
    /// Held in the candidate set, stable set untouched
    Buffered { pending: usize, distance_m: f64 },
    /// Candidate cluster replaced the stable set
    Promoted { cluster_size: usize },
    /// Dropped from both sets
    Rejected(RejectReason),
}

impl Classification {
    /// Whether the published estimate changed
    pub fn updates_estimate(&self) -> bool {
        matches!(
            self,
            Classification::Accepted { .. } | Classification::Promoted { .. }
        )
    }

    /// Stable label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Accepted { .. } => "accepted",
            Classification::Buffered { .. } => "buffered",
            Classification::Promoted { .. } => "promoted",
            Classification::Rejected(_) => "rejected",
        }
    }
}

/// Buffer-and-threshold classifier
#[derive(Debug)]
pub struct Classifier {
    stable: StableSet,
    candidates: CandidateSet,
    drift_threshold_m: f64,
    drop_low_information: bool,
}

impl Classifier {
    pub fn new(config: &StabilityConfig) -> Self {
        Self {
            stable: StableSet::new(config.stable_capacity),
            candidates: CandidateSet::new(config.candidate_capacity),
            drift_threshold_m: config.drift_threshold_m,
            drop_low_information: config.drop_low_information_fixes,
        }
    }

    /// Classify `fix` given the latest known movement state
    pub fn classify(&mut self, fix: Fix, movement: MovementState) -> Classification {
        if self.drop_low_information && is_low_information(&fix) {
            return Classification::Rejected(RejectReason::LowInformation);
        }

        let center = match self.stable.centroid() {
            Some(center) if self.stable.is_full() => center,
            _ => return self.accept(fix, AcceptKind::Filling, EvictionStrategy::LowestAccuracy, None),
        };

        let d = distance(fix.point(), center);
        trace!(distance_m = d, movement = %movement, "steady phase fix");

        if d < self.drift_threshold_m {
            self.accept(
                fix,
                AcceptKind::WithinDrift,
                EvictionStrategy::LowestAccuracy,
                Some(d),
            )
        } else if !movement.is_stationary() {
            self.accept(fix, AcceptKind::Travel, EvictionStrategy::Farthest, Some(d))
        } else {
            self.consider_relocation(fix, d)
        }
    }

    fn accept(
        &mut self,
        fix: Fix,
        kind: AcceptKind,
        strategy: EvictionStrategy,
        distance_m: Option<f64>,
    ) -> Classification {
        let evicted = self.stable.insert_or_evict_worst(fix, strategy);
        self.candidates.clear();
        Classification::Accepted {
            kind,
            evicted,
            distance_m,
        }
    }

    /// Drift while stationary: gather evidence for a new settled location
    fn consider_relocation(&mut self, fix: Fix, distance_m: f64) -> Classification {
        if !self.candidates.is_full() {
            self.candidates.insert_evicting(fix);
            if self.candidates.is_full() && self.cluster_supports(&fix).is_ok() {
                return self.promote();
            }
            return Classification::Buffered {
                pending: self.candidates.len(),
                distance_m,
            };
        }

        match self.cluster_supports(&fix) {
            Ok(()) => {
                self.candidates.insert_evicting(fix);
                self.promote()
            }
            Err(reason) => Classification::Rejected(reason),
        }
    }

    /// Promotion test: candidates form a tight cluster and `fix` lies within
    /// their centroid +/- mean accuracy.
    fn cluster_supports(&self, fix: &Fix) -> Result<(), RejectReason> {
        if !self.candidates.is_clustered_within(self.drift_threshold_m) {
            return Err(RejectReason::ClusterIncoherent);
        }
        let (Some(center), Some(accuracy)) = (
            self.candidates.centroid(),
            self.candidates.average_accuracy(),
        ) else {
            return Err(RejectReason::ClusterIncoherent);
        };
        if distance(fix.point(), center) <= accuracy {
            Ok(())
        } else {
            Err(RejectReason::OutsideClusterAccuracy)
        }
    }

    fn promote(&mut self) -> Classification {
        let cluster = self.candidates.drain();
        let cluster_size = cluster.len();
        self.stable.replace_with(cluster);
        Classification::Promoted { cluster_size }
    }

    /// Current centroid and mean accuracy, `None` while the stable set is empty
    pub fn estimate(&self) -> Option<(GeoPoint, f64)> {
        Some((self.stable.centroid()?, self.stable.average_accuracy()?))
    }

    pub fn stable(&self) -> &StableSet {
        &self.stable
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    /// Empty both sets
    pub fn clear(&mut self) {
        self.stable.clear();
        self.candidates.clear();
    }
}

/// Fix reporting exactly zero speed and altitude
fn is_low_information(fix: &Fix) -> bool {
    fix.speed == Some(0.0) && fix.altitude == Some(0.0)
}
