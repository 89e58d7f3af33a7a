//! EngineOutput - stability engine output
//!
//! Published estimate and diagnostic snapshot.

use serde::{Deserialize, Serialize};

use crate::{Fix, GeoPoint, MovementState, SamplingPolicy};

/// Settled location estimate
///
/// Published after every fix that changes the stable set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Mean coordinate of the stable set
    pub centroid: GeoPoint,

    /// Mean accuracy of the stable set (metres)
    pub average_accuracy: f64,

    /// Number of published updates in the current session (strictly increasing)
    pub update_count: u64,
}

/// Read-only view of a session (for diagnostics)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineSnapshot {
    /// Whether a session is running
    pub active: bool,

    /// Stable set contents, insertion order
    pub stable: Vec<Fix>,

    /// Candidate set contents, oldest first
    pub candidates: Vec<Fix>,

    /// Latest movement state seen
    pub movement: MovementState,

    /// Currently applied sampling policy
    pub policy: SamplingPolicy,

    /// Updates published in this session
    pub update_count: u64,
}
