//! Run statistics.

use std::time::Duration;

use contracts::{EngineOutput, SamplingPolicy};
use dispatcher::MetricsSnapshot;
use observability::MetricsSummary;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `--duration` elapsed
    Duration,
    /// `--max-updates` reached
    MaxUpdates,
    /// Ctrl+C / SIGTERM
    Signal,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::Duration => "duration elapsed",
            StopReason::MaxUpdates => "update limit reached",
            StopReason::Signal => "shutdown signal",
        };
        f.write_str(text)
    }
}

/// Statistics from one engine session
#[derive(Debug, Clone)]
pub struct RunStats {
    pub duration: Duration,
    pub stop_reason: StopReason,

    /// Last estimate published before the engine stopped
    pub final_estimate: Option<EngineOutput>,

    /// Policy in force when the engine stopped
    pub final_policy: SamplingPolicy,

    /// Engine-side counters
    pub engine: MetricsSummary,

    /// Per-sink counters, in configuration order
    pub sinks: Vec<(String, MetricsSnapshot)>,
}

impl RunStats {
    pub fn updates_published(&self) -> u64 {
        self.final_estimate.map_or(0, |o| o.update_count)
    }

    /// Fixes processed per second
    pub fn fix_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.engine.total_fixes as f64 / secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Session Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s ({})", self.duration.as_secs_f64(), self.stop_reason);
        println!("   ├─ Fixes processed: {}", self.engine.total_fixes);
        println!("   ├─ Fix rate: {:.2}/s", self.fix_rate());
        println!("   ├─ Estimates published: {}", self.updates_published());
        println!("   └─ Final policy: {}", self.final_policy);

        println!("\n📍 Final Estimate");
        match &self.final_estimate {
            Some(output) => {
                println!(
                    "   ├─ Centroid: {:.7}, {:.7}",
                    output.centroid.latitude, output.centroid.longitude
                );
                println!("   └─ Average accuracy: {:.2} m", output.average_accuracy);
            }
            None => println!("   └─ (no estimate published)"),
        }

        println!("\n📈 Engine Metrics");
        for line in self.engine.to_string().lines().skip(1) {
            println!("   {line}");
        }

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks ({})", self.sinks.len());
            for (i, (name, snapshot)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!("   {prefix} {name}: {snapshot}");
            }
        }

        println!();
    }
}
