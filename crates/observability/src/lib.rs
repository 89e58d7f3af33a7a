//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - Prometheus 指标导出
//! - 定位稳定引擎的分类、输出与采样策略指标
//!
//! ## 使用示例
//!
//! ```ignore
//! observability::init()?;
//!
//! let mut rx = engine.subscribe();
//! while rx.changed().await.is_ok() {
//!     if let Some(output) = *rx.borrow() {
//!         observability::record_engine_output(&output, None);
//!     }
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_buffer_sizes, record_classification, record_engine_output, record_fix_received,
    record_movement_update, record_output_dispatched, record_policy_applied,
    record_resubscribe_failure, EngineMetricsAggregator, MetricsSummary, RunningStats,
    StatsSummary,
};

/// 以默认配置初始化：JSON 日志 + 9000 端口的 Prometheus 导出
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 不导出)
    pub metrics_port: Option<u16>,
    /// RUST_LOG 缺失时使用的过滤级别
    pub default_log_level: String,
    /// false 时忽略 RUST_LOG，始终使用 `default_log_level`
    pub honor_rust_log: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
            honor_rust_log: true,
        }
    }
}

impl ObservabilityConfig {
    /// 仅日志，不启动指标导出
    pub fn logging_only(log_format: LogFormat, level: &str) -> Self {
        Self {
            log_format,
            metrics_port: None,
            default_log_level: level.to_string(),
            honor_rust_log: true,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if !self.honor_rust_log {
            return EnvFilter::new(&self.default_log_level);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    /// 单行
    Compact,
}

/// 按配置安装全局 subscriber，并按需启动 Prometheus 导出
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let output = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(output)
        .try_init()
        .context("tracing subscriber already installed")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability ready"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于 Tracing 已由其他模块初始化的场景。
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// 按 CLI 详细级别选择默认日志级别
pub fn level_for_verbosity(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
