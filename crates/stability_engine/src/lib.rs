//! # Stability Engine
//!
//! 定位稳定引擎：把带噪声的定位点流收敛为稳定的位置估计。
//!
//! 负责：
//! - 稳定集 / 候选集缓冲与淘汰
//! - 逐点分类（接受、缓冲、提升、拒绝）
//! - 自适应采样策略
//! - 会话生命周期与 `EngineOutput` 发布
//!
//! ## 使用示例
//!
//! ```ignore
//! use stability_engine::{StabilityConfig, StabilityEngine};
//!
//! let engine = StabilityEngine::new(StabilityConfig::default(), provider, movement)?;
//! let mut rx = engine.subscribe();
//! engine.start()?;
//!
//! while rx.changed().await.is_ok() {
//!     if let Some(output) = *rx.borrow() {
//!         println!("{:?}", output.centroid);
//!     }
//! }
//! ```

pub mod buffer;
pub mod classifier;
mod engine;
pub mod geometry;
pub mod sampling;

pub use buffer::{CandidateSet, EvictionStrategy, StableSet};
pub use classifier::{AcceptKind, Classification, Classifier, RejectReason};
pub use engine::{EngineError, StabilityEngine};
pub use sampling::{policy_for, PolicyTrigger, SamplingController};

// Re-export contracts types
pub use contracts::{
    EngineOutput, EngineSnapshot, Fix, GeoPoint, MovementState, PolicyTable, Priority,
    SamplingPolicy, StabilityConfig,
};
