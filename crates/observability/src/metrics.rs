//! 定位稳定引擎指标收集模块
//!
//! 记录分类结果、输出、采样策略切换等运行指标，并在内存中聚合运行摘要。

use std::collections::HashMap;

use contracts::{EngineOutput, Fix, MovementState, SamplingPolicy};
use metrics::{counter, gauge, histogram};

/// 记录一次分类结果
///
/// `outcome` 为 accepted / buffered / promoted / rejected，
/// `detail` 为接受方式或拒绝原因。
pub fn record_classification(outcome: &str, detail: &str) {
    counter!(
        "stability_engine_classifications_total",
        "outcome" => outcome.to_string(),
        "detail" => detail.to_string()
    )
    .increment(1);
}

/// 记录一次发布的输出
///
/// 每次 Accepted / Promoted 后调用。
pub fn record_engine_output(output: &EngineOutput, centroid_shift_m: Option<f64>) {
    counter!("stability_engine_outputs_total").increment(1);
    gauge!("stability_engine_update_count").set(output.update_count as f64);
    gauge!("stability_engine_average_accuracy_m").set(output.average_accuracy);
    histogram!("stability_engine_average_accuracy_m_hist").record(output.average_accuracy);

    if let Some(shift) = centroid_shift_m {
        histogram!("stability_engine_centroid_shift_m").record(shift);
    }
}

/// 记录缓冲区深度
pub fn record_buffer_sizes(stable: usize, candidates: usize) {
    gauge!("stability_engine_stable_set_size").set(stable as f64);
    gauge!("stability_engine_candidate_set_size").set(candidates as f64);
}

/// 记录采样策略切换
pub fn record_policy_applied(policy: &SamplingPolicy, trigger: &str) {
    counter!(
        "stability_engine_policy_changes_total",
        "trigger" => trigger.to_string(),
        "priority" => policy.priority.as_str().to_string()
    )
    .increment(1);
    gauge!("stability_engine_policy_interval_ms").set(policy.interval_ms as f64);
}

/// 记录运动状态更新
pub fn record_movement_update(state: MovementState) {
    counter!(
        "stability_engine_movement_updates_total",
        "state" => state.as_str().to_string()
    )
    .increment(1);
}

/// 记录收到的定位点
pub fn record_fix_received(fix: &Fix) {
    counter!("stability_engine_fixes_received_total").increment(1);
    histogram!("stability_engine_fix_accuracy_m").record(fix.accuracy);
}

/// 记录输出分发
pub fn record_output_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "stability_engine_outputs_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录重新订阅失败
pub fn record_resubscribe_failure(provider: &str) {
    counter!(
        "stability_engine_resubscribe_failures_total",
        "provider" => provider.to_string()
    )
    .increment(1);
}

/// 引擎指标聚合器
///
/// 在内存中聚合一次运行的指标，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct EngineMetricsAggregator {
    /// 收到的定位点总数
    pub total_fixes: u64,

    /// 直接接受数
    pub accepted: u64,

    /// 候选缓冲数
    pub buffered: u64,

    /// 候选簇提升数
    pub promoted: u64,

    /// 拒绝数
    pub rejected: u64,

    /// 采样策略切换次数
    pub policy_changes: u64,

    /// 输出的平均精度统计 (米)
    pub accuracy_stats: RunningStats,

    /// 相邻输出间质心位移统计 (米)
    pub shift_stats: RunningStats,

    /// 各拒绝原因次数
    pub reject_reasons: HashMap<String, u64>,
}

impl EngineMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 统计一次分类结果
    pub fn observe_classification(&mut self, outcome: &str, detail: &str) {
        self.total_fixes += 1;
        match outcome {
            "accepted" => self.accepted += 1,
            "buffered" => self.buffered += 1,
            "promoted" => self.promoted += 1,
            "rejected" => {
                self.rejected += 1;
                *self.reject_reasons.entry(detail.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    /// 统计一次输出
    pub fn observe_output(&mut self, output: &EngineOutput, centroid_shift_m: Option<f64>) {
        self.accuracy_stats.push(output.average_accuracy);
        if let Some(shift) = centroid_shift_m {
            self.shift_stats.push(shift);
        }
    }

    /// 统计一次策略切换
    pub fn observe_policy_change(&mut self) {
        self.policy_changes += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_fixes: self.total_fixes,
            accepted: self.accepted,
            buffered: self.buffered,
            promoted: self.promoted,
            rejected: self.rejected,
            policy_changes: self.policy_changes,
            rejection_rate: if self.total_fixes > 0 {
                self.rejected as f64 / self.total_fixes as f64 * 100.0
            } else {
                0.0
            },
            average_accuracy_m: StatsSummary::from(&self.accuracy_stats),
            centroid_shift_m: StatsSummary::from(&self.shift_stats),
            reject_reasons: self.reject_reasons.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_fixes: u64,
    pub accepted: u64,
    pub buffered: u64,
    pub promoted: u64,
    pub rejected: u64,
    pub policy_changes: u64,
    pub rejection_rate: f64,
    pub average_accuracy_m: StatsSummary,
    pub centroid_shift_m: StatsSummary,
    pub reject_reasons: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Stability Metrics Summary ===")?;
        writeln!(f, "Total fixes: {}", self.total_fixes)?;
        writeln!(f, "Accepted: {}", self.accepted)?;
        writeln!(f, "Buffered: {}", self.buffered)?;
        writeln!(f, "Promoted clusters: {}", self.promoted)?;
        writeln!(
            f,
            "Rejected: {} ({:.2}%)",
            self.rejected, self.rejection_rate
        )?;
        writeln!(f, "Policy changes: {}", self.policy_changes)?;
        writeln!(f, "Average accuracy (m): {}", self.average_accuracy_m)?;
        writeln!(f, "Centroid shift (m): {}", self.centroid_shift_m)?;

        if !self.reject_reasons.is_empty() {
            writeln!(f, "Reject reasons:")?;
            for (reason, count) in &self.reject_reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
