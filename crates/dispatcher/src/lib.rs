//! # Dispatcher
//!
//! 输出分发模块。
//!
//! 负责：
//! - 订阅引擎的 `EngineOutput` 流
//! - Fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞引擎

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{EngineOutput, OutputSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{Delivery, MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
