//! Adaptive sampling controller.
//!
//! Fix precision is raised while evidence is gathered and lowered once a
//! location settles. The mapping from trigger to policy is pure; the
//! controller only remembers the policy in force so that re-applying the
//! same policy is a no-op.

use contracts::{MovementState, PolicyTable, SamplingPolicy};

use crate::classifier::Classification;

/// Event that may change the sampling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTrigger {
    /// Session started
    Start,
    /// A fix was buffered as a relocation candidate
    CandidateGathering,
    /// A candidate cluster was promoted
    Promotion,
    /// Movement left {Still, Tilting}
    MovementResumed,
}

impl PolicyTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyTrigger::Start => "start",
            PolicyTrigger::CandidateGathering => "candidate_gathering",
            PolicyTrigger::Promotion => "promotion",
            PolicyTrigger::MovementResumed => "movement_resumed",
        }
    }
}

/// Policy requested for `trigger`
pub fn policy_for(trigger: PolicyTrigger, table: &PolicyTable) -> SamplingPolicy {
    match trigger {
        PolicyTrigger::Start => table.startup,
        PolicyTrigger::CandidateGathering => table.gathering,
        PolicyTrigger::Promotion => table.settled,
        PolicyTrigger::MovementResumed => table.reacquire,
    }
}

/// Policy requested by a classification, if any
pub fn trigger_for(classification: &Classification) -> Option<PolicyTrigger> {
    match classification {
        Classification::Buffered { .. } => Some(PolicyTrigger::CandidateGathering),
        Classification::Promoted { .. } => Some(PolicyTrigger::Promotion),
        Classification::Accepted { .. } | Classification::Rejected(_) => None,
    }
}

/// Tracks the policy in force
#[derive(Debug, Clone)]
pub struct SamplingController {
    table: PolicyTable,
    current: SamplingPolicy,
}

impl SamplingController {
    pub fn new(table: PolicyTable) -> Self {
        Self {
            current: table.startup,
            table,
        }
    }

    #[inline]
    pub fn current(&self) -> SamplingPolicy {
        self.current
    }

    /// Apply `trigger`; returns the new policy only when it differs from the
    /// one in force.
    pub fn apply(&mut self, trigger: PolicyTrigger) -> Option<SamplingPolicy> {
        let next = policy_for(trigger, &self.table);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }

    pub fn on_classification(&mut self, classification: &Classification) -> Option<SamplingPolicy> {
        trigger_for(classification).and_then(|trigger| self.apply(trigger))
    }

    /// Movement transition; only leaving a stationary state matters
    pub fn on_movement(
        &mut self,
        previous: MovementState,
        next: MovementState,
    ) -> Option<SamplingPolicy> {
        if previous.is_stationary() && !next.is_stationary() {
            self.apply(PolicyTrigger::MovementResumed)
        } else {
            None
        }
    }

    /// Back to the start-up policy
    pub fn reset(&mut self) {
        self.current = self.table.startup;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{AcceptKind, RejectReason};
    use contracts::Priority;

    #[test]
    fn test_default_policy_table() {
        let table = PolicyTable::default();
        assert_eq!(
            policy_for(PolicyTrigger::Start, &table),
            SamplingPolicy::new(500, Priority::HighAccuracy)
        );
        assert_eq!(
            policy_for(PolicyTrigger::CandidateGathering, &table),
            SamplingPolicy::new(100, Priority::HighAccuracy)
        );
        assert_eq!(
            policy_for(PolicyTrigger::Promotion, &table),
            SamplingPolicy::new(5000, Priority::BalancedPower)
        );
        assert_eq!(
            policy_for(PolicyTrigger::MovementResumed, &table),
            SamplingPolicy::new(100, Priority::HighAccuracy)
        );
    }

    #[test]
    fn test_reapplying_same_policy_is_noop() {
        let mut controller = SamplingController::new(PolicyTable::default());
        assert_eq!(controller.apply(PolicyTrigger::Start), None);

        let buffered = Classification::Buffered {
            pending: 1,
            distance_m: 10.0,
        };
        assert_eq!(
            controller.on_classification(&buffered),
            Some(SamplingPolicy::GATHERING)
        );
        assert_eq!(controller.on_classification(&buffered), None);
        // Gathering and reacquire share the same default policy
        assert_eq!(controller.apply(PolicyTrigger::MovementResumed), None);
    }

    #[test]
    fn test_promotion_lowers_precision() {
        let mut controller = SamplingController::new(PolicyTable::default());
        let changed = controller.on_classification(&Classification::Promoted { cluster_size: 5 });
        assert_eq!(changed, Some(SamplingPolicy::SETTLED));
        assert_eq!(controller.current().priority, Priority::BalancedPower);
    }

    #[test]
    fn test_accept_and_reject_keep_policy() {
        let mut controller = SamplingController::new(PolicyTable::default());
        let accepted = Classification::Accepted {
            kind: AcceptKind::Travel,
            evicted: None,
            distance_m: Some(100.0),
        };
        assert_eq!(controller.on_classification(&accepted), None);
        assert_eq!(
            controller.on_classification(&Classification::Rejected(
                RejectReason::ClusterIncoherent
            )),
            None
        );
        assert_eq!(controller.current(), SamplingPolicy::STARTUP);
    }

    #[test]
    fn test_movement_resumed_only_when_leaving_stationary() {
        let mut controller = SamplingController::new(PolicyTable::default());
        controller.on_classification(&Classification::Promoted { cluster_size: 5 });

        assert_eq!(
            controller.on_movement(MovementState::Unknown, MovementState::Walking),
            None
        );
        assert_eq!(
            controller.on_movement(MovementState::Still, MovementState::Tilting),
            None
        );
        assert_eq!(
            controller.on_movement(MovementState::Tilting, MovementState::OnBicycle),
            Some(SamplingPolicy::REACQUIRE)
        );
    }

    #[test]
    fn test_custom_table_and_reset() {
        let table = PolicyTable {
            settled: SamplingPolicy::new(60_000, Priority::BalancedPower),
            ..Default::default()
        };
        let mut controller = SamplingController::new(table);
        assert_eq!(
            controller.apply(PolicyTrigger::Promotion),
            Some(SamplingPolicy::new(60_000, Priority::BalancedPower))
        );
        controller.reset();
        assert_eq!(controller.current(), SamplingPolicy::STARTUP);
    }
}
