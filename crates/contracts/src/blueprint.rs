//! StabilityBlueprint - Config Loader output
//!
//! Describes a complete run: engine tuning, fix provider, movement script and
//! output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{GeoPoint, MovementState, StabilityConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Engine tuning
    #[serde(default)]
    pub engine: StabilityConfig,

    /// Fix provider selection
    pub provider: ProviderConfig,

    /// Movement state feed
    #[serde(default)]
    pub movement: MovementConfig,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Fix provider kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Synthetic fixes jittered around an anchor
    Mock,
    /// Fixes read back from a JSON-lines recording
    Replay,
}

/// Fix provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind
    pub kind: ProviderKind,

    /// Anchor coordinate for the mock provider
    #[serde(default)]
    pub origin: GeoPoint,

    /// Max horizontal jitter (metres) of mock fixes
    #[serde(default = "default_jitter_m")]
    pub jitter_m: f64,

    /// Reported accuracy (metres) of mock fixes in high-accuracy mode
    #[serde(default = "default_accuracy_m")]
    pub accuracy_m: f64,

    /// Recording to replay (replay only)
    #[serde(default)]
    pub replay_path: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = recorded pace)
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,

    /// Restart the recording when it ends
    #[serde(default)]
    pub replay_loop: bool,
}

fn default_jitter_m() -> f64 {
    2.0
}

fn default_accuracy_m() -> f64 {
    5.0
}

fn default_replay_speed() -> f64 {
    1.0
}

impl ProviderConfig {
    /// Mock provider anchored at `origin` with default noise
    pub fn mock(origin: GeoPoint) -> Self {
        Self {
            kind: ProviderKind::Mock,
            origin,
            jitter_m: default_jitter_m(),
            accuracy_m: default_accuracy_m(),
            replay_path: None,
            replay_speed: default_replay_speed(),
            replay_loop: false,
        }
    }

    /// Replay provider reading `path`
    pub fn replay(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ProviderKind::Replay,
            replay_path: Some(path.into()),
            ..Self::mock(GeoPoint::default())
        }
    }
}

/// Movement state feed configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementConfig {
    /// State emitted right after start
    #[serde(default)]
    pub initial: MovementState,

    /// Timed state changes, offsets relative to start
    #[serde(default)]
    pub script: Vec<MovementStep>,
}

/// One scripted movement change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementStep {
    /// Offset from start (milliseconds)
    pub after_ms: u64,

    /// State to emit
    pub state: MovementState,
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Tracing output
    Log,
    /// JSON-lines file output
    File,
}

impl SinkConfig {
    /// Log sink with default queue
    pub fn log(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::Log,
            queue_capacity: default_queue_capacity(),
            params: HashMap::new(),
        }
    }
}

impl StabilityBlueprint {
    /// Blueprint with default engine tuning
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            version: ConfigVersion::V1,
            engine: StabilityConfig::default(),
            provider,
            movement: MovementConfig::default(),
            sinks: Vec::new(),
        }
    }
}
