//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Units
//! - Coordinates are WGS84 degrees
//! - Distances and accuracies are metres
//! - Fix timestamps are seconds (provider clock), intervals are milliseconds

mod blueprint;
mod engine_config;
mod error;
mod fix;
mod output;
mod policy;
mod provider;
mod sink;

pub use blueprint::*;
pub use engine_config::*;
pub use error::*;
pub use fix::*;
pub use output::*;
pub use policy::*;
pub use provider::*;
pub use sink::*;
