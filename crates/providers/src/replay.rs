//! Replay fix provider - 从录制文件回放定位点
//!
//! 读取 JSON Lines 录制文件（每行一个 `Fix`），按原始时间戳回放。
//! 缺少时间戳时按订阅的采样间隔回放；单次等待最长一小时。重新订阅（采样策略变化）从上次
//! 回放到的位置继续，不会重放已发送的定位点。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{
    ContractError, Fix, FixCallback, FixProvider, ProviderConfig, SamplingPolicy,
    SubscriptionHandle,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, Result};
use crate::metrics::{ProviderMetrics, ProviderMetricsSnapshot};
use crate::subscriptions::Subscriptions;

/// Replay 配置
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// 录制文件路径
    pub path: PathBuf,

    /// 回放速度倍率 (1.0 = 原速)
    pub speed_multiplier: f64,

    /// 是否循环回放
    pub loop_playback: bool,
}

impl ReplayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }

    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self> {
        let path = config
            .replay_path
            .clone()
            .ok_or(ProviderError::MissingReplayPath)?;
        Ok(Self {
            path,
            speed_multiplier: config.replay_speed,
            loop_playback: config.replay_loop,
        })
    }
}

/// 解析 JSON Lines 录制内容
///
/// 空行和 `#` 开头的行被跳过；行号从 1 开始。坐标、精度或时间戳不合法
/// （非有限值、负精度）的行按解析错误处理。
pub fn parse_fixes(reader: impl BufRead) -> Result<Vec<Fix>> {
    let mut fixes = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ProviderError::ReplayParse {
            line: idx + 1,
            message: e.to_string(),
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fix: Fix = serde_json::from_str(trimmed)
            .map_err(|e| e.to_string())
            .and_then(check_fix)
            .map_err(|message| ProviderError::ReplayParse {
                line: idx + 1,
                message,
            })?;
        fixes.push(fix);
    }
    Ok(fixes)
}

fn check_fix(fix: Fix) -> std::result::Result<Fix, String> {
    if !fix.latitude.is_finite() || !fix.longitude.is_finite() {
        return Err(format!(
            "coordinates ({}, {}) are not finite",
            fix.latitude, fix.longitude
        ));
    }
    if !fix.accuracy.is_finite() || fix.accuracy < 0.0 {
        return Err(format!("accuracy {} must be a finite value >= 0", fix.accuracy));
    }
    if fix.timestamp.is_some_and(|t| !t.is_finite()) {
        return Err("timestamp is not finite".to_string());
    }
    Ok(fix)
}

/// 相邻两个定位点之间的最长回放等待
const MAX_REPLAY_GAP: Duration = Duration::from_secs(3600);

/// 录制间隔（秒）按倍率换算成等待时间，截断到 `MAX_REPLAY_GAP`
fn replay_gap(seconds: f64, speed: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds / speed)
        .map_or(MAX_REPLAY_GAP, |gap| gap.min(MAX_REPLAY_GAP))
}

/// 回放偏移：相邻两点都有时间戳时按录制节奏，否则按采样间隔
fn playback_offsets(fixes: &[Fix], interval: Duration, speed: f64) -> Vec<Duration> {
    let interval_secs = interval.as_secs_f64();
    let mut elapsed = Duration::ZERO;
    let mut previous: Option<&Fix> = None;
    fixes
        .iter()
        .map(|fix| {
            if let Some(prev) = previous {
                let recorded = match (prev.timestamp, fix.timestamp) {
                    (Some(a), Some(b)) => b - a,
                    _ => interval_secs,
                };
                elapsed = elapsed.saturating_add(replay_gap(recorded, speed));
            }
            previous = Some(fix);
            elapsed
        })
        .collect()
}

/// Replay fix provider
pub struct ReplayFixProvider {
    fixes: Arc<Vec<Fix>>,
    config: ReplayConfig,
    /// 下一个待发送定位点的下标，跨订阅共享
    cursor: Arc<AtomicUsize>,
    tasks: Subscriptions<JoinHandle<()>>,
    metrics: Arc<ProviderMetrics>,
}

impl ReplayFixProvider {
    /// 从录制文件加载
    pub fn load(config: ReplayConfig) -> Result<Self> {
        let file = File::open(&config.path).map_err(|source| ProviderError::ReplayRead {
            path: config.path.clone(),
            source,
        })?;
        let fixes = parse_fixes(BufReader::new(file))?;
        if fixes.is_empty() {
            warn!(path = %config.path.display(), "replay file holds no fixes");
        }
        info!(path = %config.path.display(), fixes = fixes.len(), "loaded replay recording");
        Ok(Self::from_fixes(fixes, config))
    }

    /// 直接使用内存中的定位点
    pub fn from_fixes(fixes: Vec<Fix>, config: ReplayConfig) -> Self {
        Self {
            fixes: Arc::new(fixes),
            config,
            cursor: Arc::new(AtomicUsize::new(0)),
            tasks: Subscriptions::default(),
            metrics: Arc::new(ProviderMetrics::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn metrics(&self) -> ProviderMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Fixes already played in the current pass
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl FixProvider for ReplayFixProvider {
    fn name(&self) -> &str {
        "replay"
    }

    fn subscribe(
        &self,
        policy: SamplingPolicy,
        callback: FixCallback,
    ) -> std::result::Result<SubscriptionHandle, ContractError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ContractError::provider_unavailable("replay", e.to_string()))?;

        let fixes = Arc::clone(&self.fixes);
        let metrics = Arc::clone(&self.metrics);
        let speed = self.config.speed_multiplier.max(0.01);
        let loop_playback = self.config.loop_playback;
        let offsets = playback_offsets(&fixes, Duration::from_millis(policy.interval_ms), speed);

        let cursor = Arc::clone(&self.cursor);

        let task = runtime.spawn(async move {
            if fixes.is_empty() {
                return;
            }
            loop {
                let from = cursor.load(Ordering::SeqCst).min(fixes.len());
                let base = offsets.get(from).copied().unwrap_or_default();
                let start = Instant::now();
                for (idx, (fix, offset)) in fixes.iter().zip(&offsets).enumerate().skip(from) {
                    sleep_until(start + offset.saturating_sub(base)).await;
                    cursor.store(idx + 1, Ordering::SeqCst);
                    metrics.record_fix();
                    callback(*fix);
                }
                if !loop_playback {
                    info!("replay completed");
                    break;
                }
                cursor.store(0, Ordering::SeqCst);
                debug!("looping replay");
            }
        });

        self.metrics.record_subscribe();
        let handle = self.tasks.insert(task);
        debug!(%handle, %policy, "replay provider subscribed");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(task) = self.tasks.remove(handle) {
            task.abort();
            self.metrics.record_unsubscribe();
        }
    }
}

impl Drop for ReplayFixProvider {
    fn drop(&mut self) {
        for task in self.tasks.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let input = r#"
# recorded on site
{"latitude": 1.0, "longitude": 2.0, "accuracy": 3.0, "timestamp": 10.0}

{"latitude": 1.5, "longitude": 2.5, "accuracy": 4.0, "speed": 0.0, "altitude": 12.0}
"#;
        let fixes = parse_fixes(Cursor::new(input)).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].timestamp, Some(10.0));
        assert_eq!(fixes[1].altitude, Some(12.0));
        assert_eq!(fixes[1].timestamp, None);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let input = "{\"latitude\": 1.0, \"longitude\": 2.0, \"accuracy\": 3.0}\nnot json\n";
        let err = parse_fixes(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, ProviderError::ReplayParse { line: 2, .. }));
    }

    #[test]
    fn test_offsets_follow_timestamps_and_speed() {
        let fixes = vec![
            Fix::new(0.0, 0.0, 1.0).with_timestamp(100.0),
            Fix::new(0.0, 0.0, 1.0).with_timestamp(102.0),
        ];
        let offsets = playback_offsets(&fixes, Duration::from_millis(500), 2.0);
        assert_eq!(offsets, vec![Duration::ZERO, Duration::from_secs(1)]);
    }

    #[test]
    fn test_offsets_fall_back_to_interval() {
        let fixes = vec![Fix::new(0.0, 0.0, 1.0); 3];
        let offsets = playback_offsets(&fixes, Duration::from_millis(100), 1.0);
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(200)
            ]
        );
    }

    #[test]
    fn test_parse_rejects_negative_accuracy() {
        let input = "{\"latitude\": 1.0, \"longitude\": 2.0, \"accuracy\": 3.0}\n\
                     {\"latitude\": 1.0, \"longitude\": 2.0, \"accuracy\": -1.0}\n";
        let err = parse_fixes(Cursor::new(input)).unwrap_err();
        match err {
            ProviderError::ReplayParse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("accuracy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_offsets_cap_huge_gaps() {
        let fixes = vec![
            Fix::new(0.0, 0.0, 1.0).with_timestamp(0.0),
            Fix::new(0.0, 0.0, 1.0).with_timestamp(1e20),
            Fix::new(0.0, 0.0, 1.0).with_timestamp(1e20 + 2.0),
        ];
        let offsets = playback_offsets(&fixes, Duration::from_millis(100), 0.01);
        assert_eq!(offsets[1], MAX_REPLAY_GAP);
        assert!(offsets[2] >= offsets[1]);
        assert!(offsets[2] <= MAX_REPLAY_GAP * 2);
    }

    #[test]
    fn test_out_of_order_timestamps_play_immediately() {
        let fixes = vec![
            Fix::new(0.0, 0.0, 1.0).with_timestamp(10.0),
            Fix::new(0.0, 0.0, 1.0).with_timestamp(5.0),
        ];
        let offsets = playback_offsets(&fixes, Duration::from_millis(100), 1.0);
        assert_eq!(offsets, vec![Duration::ZERO, Duration::ZERO]);
    }

    #[tokio::test]
    async fn test_subscribe_survives_huge_timestamp_gap() {
        let fixes = vec![
            Fix::new(7.0, 0.0, 5.0).with_timestamp(0.0),
            Fix::new(8.0, 0.0, 5.0).with_timestamp(1e20),
        ];
        let provider = ReplayFixProvider::from_fixes(fixes, ReplayConfig::new("memory"));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: FixCallback = Arc::new(move |fix| {
            let _ = tx.send(fix);
        });
        let handle = provider
            .subscribe(SamplingPolicy::new(500, contracts::Priority::HighAccuracy), callback)
            .unwrap();

        let fix = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fix.latitude, 7.0);
        provider.unsubscribe(handle);
    }

    #[test]
    fn test_missing_replay_path() {
        let mut config = ProviderConfig::replay("unused.jsonl");
        config.replay_path = None;
        assert!(matches!(
            ReplayConfig::from_provider_config(&config),
            Err(ProviderError::MissingReplayPath)
        ));
    }

    #[tokio::test]
    async fn test_replays_file_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..3 {
            writeln!(
                file,
                r#"{{"latitude": {}.0, "longitude": 0.0, "accuracy": 5.0}}"#,
                i
            )
            .unwrap();
        }

        let mut config = ReplayConfig::new(file.path());
        config.speed_multiplier = 10.0;
        let provider = ReplayFixProvider::load(config).unwrap();
        assert_eq!(provider.len(), 3);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: FixCallback = Arc::new(move |fix| {
            let _ = tx.send(fix);
        });
        provider
            .subscribe(SamplingPolicy::new(10, contracts::Priority::HighAccuracy), callback)
            .unwrap();

        for expected in 0..3 {
            let fix = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(fix.latitude, expected as f64);
        }
        assert_eq!(provider.metrics().fixes_emitted, 3);
    }

    #[tokio::test]
    async fn test_resubscribe_resumes_where_playback_stopped() {
        let fixes: Vec<Fix> = (0..4).map(|i| Fix::new(i as f64, 0.0, 5.0)).collect();
        let provider = ReplayFixProvider::from_fixes(fixes, ReplayConfig::new("memory"));
        let policy = SamplingPolicy::new(200, contracts::Priority::HighAccuracy);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: FixCallback = Arc::new(move |fix| {
            let _ = tx.send(fix);
        });

        let first = provider.subscribe(policy, Arc::clone(&callback)).unwrap();
        let fix = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fix.latitude, 0.0);
        provider.unsubscribe(first);
        let resumed_at = provider.position();
        assert!(resumed_at >= 1);

        provider.subscribe(policy, callback).unwrap();
        let fix = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fix.latitude, resumed_at as f64);
    }
}
