//! Fix - provider output
//!
//! Raw position readings and the coarse movement signal that accompanies them.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance math (metres)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Position fix
///
/// One raw reading delivered by a positioning provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude (degrees)
    pub latitude: f64,

    /// Longitude (degrees)
    pub longitude: f64,

    /// Horizontal accuracy radius (metres, >= 0). Larger is worse.
    pub accuracy: f64,

    /// Ground speed (m/s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Altitude (metres)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    /// Provider timestamp (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Fix {
    /// Create a fix with only coordinates and accuracy
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            speed: None,
            altitude: None,
            timestamp: None,
        }
    }

    /// Attach a provider timestamp
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach speed and altitude
    pub fn with_motion(mut self, speed: f64, altitude: f64) -> Self {
        self.speed = Some(speed);
        self.altitude = Some(altitude);
        self
    }

    /// Coordinates of this fix
    #[inline]
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Geographic coordinate pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude (degrees)
    pub latitude: f64,

    /// Longitude (degrees)
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Point `north_m` north and `east_m` east of this one.
    ///
    /// Flat-earth approximation, good to well under a centimetre at the
    /// distances used for jitter and test fixtures.
    pub fn offset_m(&self, north_m: f64, east_m: f64) -> GeoPoint {
        let dlat = (north_m / EARTH_RADIUS_M).to_degrees();
        let dlon = (east_m / (EARTH_RADIUS_M * self.latitude.to_radians().cos())).to_degrees();
        GeoPoint::new(self.latitude + dlat, self.longitude + dlon)
    }
}

/// Coarse movement classification from the activity recognizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    Still,
    Tilting,
    Walking,
    Running,
    OnBicycle,
    InVehicle,
    #[default]
    Unknown,
}

impl MovementState {
    /// All states, in declaration order
    pub const ALL: [MovementState; 7] = [
        MovementState::Still,
        MovementState::Tilting,
        MovementState::Walking,
        MovementState::Running,
        MovementState::OnBicycle,
        MovementState::InVehicle,
        MovementState::Unknown,
    ];

    /// Device is presumed to stay in place
    pub fn is_stationary(&self) -> bool {
        matches!(self, MovementState::Still | MovementState::Tilting)
    }

    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementState::Still => "still",
            MovementState::Tilting => "tilting",
            MovementState::Walking => "walking",
            MovementState::Running => "running",
            MovementState::OnBicycle => "on_bicycle",
            MovementState::InVehicle => "in_vehicle",
            MovementState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MovementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_states() {
        let stationary: Vec<_> = MovementState::ALL
            .iter()
            .filter(|s| s.is_stationary())
            .collect();
        assert_eq!(
            stationary,
            vec![&MovementState::Still, &MovementState::Tilting]
        );
        assert_eq!(MovementState::default(), MovementState::Unknown);
    }

    #[test]
    fn test_fix_json_optional_fields() {
        let fix: Fix =
            serde_json::from_str(r#"{"latitude":1.0,"longitude":2.0,"accuracy":4.5}"#).unwrap();
        assert_eq!(fix, Fix::new(1.0, 2.0, 4.5));

        let json = serde_json::to_string(&fix).unwrap();
        assert!(!json.contains("speed"));
    }

    #[test]
    fn test_movement_state_serde_names() {
        let state: MovementState = serde_json::from_str("\"in_vehicle\"").unwrap();
        assert_eq!(state, MovementState::InVehicle);
        assert_eq!(state.to_string(), "in_vehicle");
    }
}
