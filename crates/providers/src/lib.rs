//! # Providers
//!
//! 定位数据源与运动状态源适配层。
//!
//! 负责：
//! - `ScriptedFixProvider` / `ScriptedMovementSource`：确定性驱动，用于测试
//! - `MockFixProvider`：围绕锚点生成带抖动的定位点
//! - `ReplayFixProvider`：从 JSON Lines 录制文件回放定位点
//! - 按配置构建数据源

mod error;
mod factory;
mod metrics;
mod mock;
mod replay;
mod scripted;
mod subscriptions;

pub use error::{ProviderError, Result};
pub use factory::build_fix_provider;
pub use metrics::{ProviderMetrics, ProviderMetricsSnapshot};
pub use mock::{MockFixConfig, MockFixProvider};
pub use replay::{parse_fixes, ReplayConfig, ReplayFixProvider};
pub use scripted::{ScriptedFixProvider, ScriptedMovementSource};
