//! Stable and candidate sample buffers.
//!
//! - `StableSet` is a small Vec scanned linearly on eviction (N <= a few dozen)
//! - `CandidateSet` is a FIFO ring (HeapRb): inserting into a full ring drops
//!   the oldest entry

use std::fmt;

use contracts::{Fix, GeoPoint};
use ringbuf::{traits::*, HeapRb};

use crate::geometry::{self, distance};

/// Which member a full stable set gives up for a new fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionStrategy {
    /// Remove the member with the largest accuracy value
    LowestAccuracy,
    /// Remove the member farthest from the current centroid
    Farthest,
}

impl EvictionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionStrategy::LowestAccuracy => "lowest_accuracy",
            EvictionStrategy::Farthest => "farthest",
        }
    }
}

/// Trusted samples that define the settled location
#[derive(Debug, Clone)]
pub struct StableSet {
    fixes: Vec<Fix>,
    capacity: usize,
}

impl StableSet {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            fixes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `fix`, evicting one member first when full.
    ///
    /// Returns the evicted member, if any. Ties evict the oldest member.
    pub fn insert_or_evict_worst(&mut self, fix: Fix, strategy: EvictionStrategy) -> Option<Fix> {
        let evicted = if self.is_full() {
            self.worst_index(strategy).map(|idx| self.fixes.remove(idx))
        } else {
            None
        };
        self.fixes.push(fix);
        evicted
    }

    /// Replace the whole set (promotion). When more than `capacity` fixes are
    /// given only the newest ones are kept.
    pub fn replace_with(&mut self, fixes: Vec<Fix>) {
        let skip = fixes.len().saturating_sub(self.capacity);
        self.fixes.clear();
        self.fixes.extend(fixes.into_iter().skip(skip));
    }

    fn worst_index(&self, strategy: EvictionStrategy) -> Option<usize> {
        let scores: Vec<f64> = match strategy {
            EvictionStrategy::LowestAccuracy => self.fixes.iter().map(|f| f.accuracy).collect(),
            EvictionStrategy::Farthest => {
                let center = self.centroid()?;
                self.fixes
                    .iter()
                    .map(|f| distance(f.point(), center))
                    .collect()
            }
        };

        let mut worst: Option<(usize, f64)> = None;
        for (idx, s) in scores.into_iter().enumerate() {
            match worst {
                Some((_, best)) if s <= best => {}
                _ => worst = Some((idx, s)),
            }
        }
        worst.map(|(idx, _)| idx)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.fixes.len() >= self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.fixes.clear();
    }

    /// Members in insertion order
    pub fn all(&self) -> Vec<Fix> {
        self.fixes.clone()
    }

    pub fn as_slice(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn centroid(&self) -> Option<GeoPoint> {
        geometry::centroid(&self.fixes)
    }

    pub fn average_accuracy(&self) -> Option<f64> {
        geometry::mean_accuracy(&self.fixes)
    }

    pub fn is_clustered_within(&self, radius_m: f64) -> bool {
        geometry::is_clustered_within(&self.fixes, radius_m)
    }
}

/// Provisionally rejected samples awaiting corroboration
pub struct CandidateSet {
    ring: HeapRb<Fix>,
    capacity: usize,
    dropped_count: u64,
}

impl fmt::Debug for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSet")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl CandidateSet {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity),
            capacity,
            dropped_count: 0,
        }
    }

    /// Push `fix`, dropping the oldest entry when full.
    ///
    /// Returns the dropped entry, if any.
    pub fn insert_evicting(&mut self, fix: Fix) -> Option<Fix> {
        let dropped = if self.ring.is_full() {
            self.dropped_count += 1;
            self.ring.try_pop()
        } else {
            None
        };
        let _ = self.ring.try_push(fix);
        dropped
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest entries dropped by FIFO eviction since creation
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    pub fn clear(&mut self) {
        let _ = self.ring.pop_iter().count();
    }

    /// Members oldest first
    pub fn all(&self) -> Vec<Fix> {
        self.ring.iter().copied().collect()
    }

    /// Remove and return all members, oldest first
    pub fn drain(&mut self) -> Vec<Fix> {
        self.ring.pop_iter().collect()
    }

    pub fn centroid(&self) -> Option<GeoPoint> {
        geometry::centroid(&self.all())
    }

    pub fn average_accuracy(&self) -> Option<f64> {
        geometry::mean_accuracy(&self.all())
    }

    pub fn is_clustered_within(&self, radius_m: f64) -> bool {
        geometry::is_clustered_within(&self.all(), radius_m)
    }
}
