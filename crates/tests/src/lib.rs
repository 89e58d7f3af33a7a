//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 通过真实引擎外观驱动的行为场景（脚本化 provider 与运动源）
//! - 缓冲区与分类器不变量
//! - provider → engine → dispatcher 端到端数据流

#[cfg(test)]
mod support {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{Fix, GeoPoint, MovementState, StabilityConfig};
    use providers::{ScriptedFixProvider, ScriptedMovementSource};
    use stability_engine::StabilityEngine;

    /// Engine wired to scripted sources
    pub struct Harness {
        pub engine: StabilityEngine,
        pub provider: Arc<ScriptedFixProvider>,
        pub movement: Arc<ScriptedMovementSource>,
    }

    impl Harness {
        pub fn new(config: StabilityConfig) -> Self {
            let provider = Arc::new(ScriptedFixProvider::new("scripted"));
            let movement = Arc::new(ScriptedMovementSource::new("scripted-movement"));
            let engine = StabilityEngine::new(config, provider.clone(), movement.clone())
                .expect("valid config");
            Self {
                engine,
                provider,
                movement,
            }
        }

        /// Deliver one fix and wait until the worker has classified it
        pub async fn feed(&self, fix: Fix) {
            let before = self.engine.metrics_summary().total_fixes;
            assert_eq!(self.provider.emit(fix), 1, "no live fix subscription");
            self.wait_until(|h| h.engine.metrics_summary().total_fixes > before)
                .await;
        }

        pub async fn feed_all(&self, fixes: impl IntoIterator<Item = Fix>) {
            for fix in fixes {
                self.feed(fix).await;
            }
        }

        pub async fn set_movement(&self, state: MovementState) {
            assert_eq!(self.movement.emit(state), 1, "no movement listener");
            self.wait_until(|h| h.engine.snapshot().movement == state)
                .await;
        }

        pub async fn wait_until(&self, pred: impl Fn(&Self) -> bool) {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
            while !pred(self) {
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "timed out, last snapshot: {:?}",
                    self.engine.snapshot()
                );
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        }
    }

    /// Fix `north_m`/`east_m` metres from `origin`
    pub fn fix_at(origin: GeoPoint, north_m: f64, east_m: f64, accuracy: f64) -> Fix {
        let p = origin.offset_m(north_m, east_m);
        Fix::new(p.latitude, p.longitude, accuracy)
    }

    /// Deterministic uniform [0, 1) sequence
    pub struct Lcg(pub u64);

    impl Lcg {
        pub fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
            lo + (hi - lo) * self.next_f64()
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use contracts::{Fix, GeoPoint, MovementState, Priority, SamplingPolicy, StabilityConfig};
    use stability_engine::geometry::distance;

    use crate::support::{fix_at, Harness};

    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    /// Scenario A on a started engine: ten identical fixes at the origin
    async fn settled_at_origin() -> Harness {
        let h = Harness::new(StabilityConfig::default());
        h.engine.start().unwrap();
        h.feed_all(std::iter::repeat_n(Fix::new(0.0, 0.0, 5.0), 10))
            .await;
        h
    }

    #[tokio::test]
    async fn scenario_a_identical_fixes_settle_on_their_position() {
        let h = settled_at_origin().await;

        let output = h.engine.latest().unwrap();
        assert_eq!(output.centroid, ORIGIN);
        assert_eq!(output.average_accuracy, 5.0);
        assert_eq!(output.update_count, 10);

        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.stable.len(), 10);
        assert!(snapshot.candidates.is_empty());
    }

    #[tokio::test]
    async fn scenario_b_travel_replaces_farthest() {
        let h = settled_at_origin().await;
        h.set_movement(MovementState::InVehicle).await;

        let far = fix_at(ORIGIN, 1000.0, 0.0, 5.0);
        h.feed(far).await;

        let output = h.engine.latest().unwrap();
        assert_eq!(output.update_count, 11);
        let shift = distance(ORIGIN, output.centroid);
        assert!((shift - 100.0).abs() < 0.5, "shift was {shift}");

        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.stable.len(), 10);
        assert!(snapshot.stable.contains(&far));
        assert!(snapshot.candidates.is_empty());
        assert_eq!(h.engine.metrics_summary().buffered, 0);
    }

    #[tokio::test]
    async fn scenario_c_still_cluster_is_promoted() {
        let h = settled_at_origin().await;
        h.set_movement(MovementState::Still).await;

        let cluster: Vec<Fix> = [(0.0, 0.0), (0.8, 0.0), (0.0, 0.8), (-0.8, 0.0), (0.0, -0.8)]
            .iter()
            .map(|(n, e)| fix_at(ORIGIN, 50.0 + n, *e, 5.0))
            .collect();

        for (i, fix) in cluster.iter().take(4).enumerate() {
            h.feed(*fix).await;
            let snapshot = h.engine.snapshot();
            assert_eq!(snapshot.candidates.len(), i + 1);
            assert!(!snapshot.stable.contains(fix));
            assert_eq!(snapshot.update_count, 10, "buffered fixes never publish");
        }
        assert_eq!(h.engine.current_policy(), SamplingPolicy::GATHERING);
        assert_eq!(h.provider.current_policy(), Some(SamplingPolicy::GATHERING));

        h.feed(cluster[4]).await;

        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.stable, cluster);
        assert!(snapshot.candidates.is_empty());
        assert_eq!(snapshot.update_count, 11);

        let policy = h.engine.current_policy();
        assert_eq!(policy.priority, Priority::BalancedPower);
        assert_eq!(policy.interval_ms, 5000);
        assert_eq!(h.provider.current_policy(), Some(policy));

        let output = h.engine.latest().unwrap();
        assert!((distance(ORIGIN, output.centroid) - 50.0).abs() < 0.5);
    }

    #[tokio::test]
    async fn scenario_d_stop_resets_session() {
        let h = settled_at_origin().await;
        h.set_movement(MovementState::Still).await;
        h.feed(fix_at(ORIGIN, 50.0, 0.0, 5.0)).await;
        assert_eq!(h.engine.snapshot().candidates.len(), 1);

        let mut rx = h.engine.subscribe();
        h.engine.stop();

        let snapshot = h.engine.snapshot();
        assert!(!snapshot.active);
        assert!(snapshot.stable.is_empty());
        assert!(snapshot.candidates.is_empty());
        assert_eq!(snapshot.update_count, 0);
        assert_eq!(snapshot.movement, MovementState::Unknown);
        assert_eq!(snapshot.policy, SamplingPolicy::STARTUP);
        assert!(rx.borrow_and_update().is_none());
        assert!(!h.provider.is_subscribed());
        assert_eq!(h.movement.listener_count(), 0);

        // fixes after stop go nowhere
        assert_eq!(h.provider.emit(Fix::new(0.0, 0.0, 5.0)), 0);
    }

    #[tokio::test]
    async fn stop_discards_fix_still_queued_in_mailbox() {
        let h = Harness::new(StabilityConfig::default());
        h.engine.start().unwrap();

        // queued synchronously; the worker cannot run before stop
        let stale = fix_at(ORIGIN, 25.0, 0.0, 5.0);
        assert_eq!(h.provider.emit(stale), 1);
        h.engine.stop();

        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let snapshot = h.engine.snapshot();
        assert!(snapshot.stable.is_empty());
        assert!(snapshot.candidates.is_empty());
        assert_eq!(snapshot.update_count, 0);
        assert!(h.engine.latest().is_none());
        assert_eq!(h.engine.metrics_summary().total_fixes, 0);

        // the next session never sees the stale fix
        h.engine.start().unwrap();
        let fresh = Fix::new(0.0, 0.0, 3.0);
        h.feed(fresh).await;
        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.stable, vec![fresh]);
        assert_eq!(snapshot.update_count, 1);
        assert_eq!(h.engine.metrics_summary().total_fixes, 1);
    }

    #[tokio::test]
    async fn scenario_e_second_start_is_a_no_op() {
        let h = settled_at_origin().await;
        let before = h.engine.snapshot();
        let subscribes = h.provider.metrics().subscriptions;

        h.engine.start().unwrap();

        assert_eq!(h.engine.snapshot(), before);
        assert_eq!(h.engine.latest().unwrap().update_count, 10);
        assert_eq!(h.provider.metrics().subscriptions, subscribes);
        assert_eq!(h.movement.listener_count(), 1);
    }

    #[tokio::test]
    async fn restart_after_stop_counts_from_one() {
        let h = settled_at_origin().await;
        h.engine.stop();
        h.engine.start().unwrap();

        h.feed(Fix::new(1.0, 1.0, 3.0)).await;
        let output = h.engine.latest().unwrap();
        assert_eq!(output.update_count, 1);
        assert_eq!(output.centroid, GeoPoint::new(1.0, 1.0));
    }

    #[tokio::test]
    async fn movement_resumed_raises_precision_after_promotion() {
        let h = settled_at_origin().await;
        h.set_movement(MovementState::Still).await;
        h.feed_all((0..5).map(|_| fix_at(ORIGIN, 50.0, 0.0, 5.0)))
            .await;
        assert_eq!(h.engine.current_policy(), SamplingPolicy::SETTLED);

        h.set_movement(MovementState::Tilting).await;
        assert_eq!(h.engine.current_policy(), SamplingPolicy::SETTLED);

        h.set_movement(MovementState::Walking).await;
        assert_eq!(h.engine.current_policy(), SamplingPolicy::REACQUIRE);
        assert_eq!(h.provider.current_policy(), Some(SamplingPolicy::REACQUIRE));
    }

    #[tokio::test]
    async fn provider_refusal_keeps_engine_inactive() {
        let h = Harness::new(StabilityConfig::default());
        h.provider.set_available(false);

        assert!(h.engine.start().is_err());
        assert!(!h.engine.is_active());
        assert_eq!(h.movement.listener_count(), 0);
        assert!(h.engine.latest().is_none());
    }
}

#[cfg(test)]
mod property_tests {
    use contracts::{Fix, GeoPoint, MovementState, StabilityConfig};
    use stability_engine::geometry::{centroid, distance};
    use stability_engine::{CandidateSet, Classification, Classifier, EvictionStrategy, StableSet};

    use crate::support::{fix_at, Harness, Lcg};

    const ORIGIN: GeoPoint = GeoPoint {
        latitude: 10.0,
        longitude: 20.0,
    };

    fn noisy_fix(rng: &mut Lcg, spread_m: f64) -> Fix {
        fix_at(
            ORIGIN,
            rng.range(-spread_m, spread_m),
            rng.range(-spread_m, spread_m),
            rng.range(1.0, 20.0),
        )
    }

    #[tokio::test]
    async fn stable_set_grows_one_per_fix_until_full() {
        let h = Harness::new(StabilityConfig::default());
        h.engine.start().unwrap();
        let mut rng = Lcg(7);

        for processed in 1..=15usize {
            h.feed(noisy_fix(&mut rng, 2.0)).await;
            let stable = h.engine.snapshot().stable.len();
            assert_eq!(stable, processed.min(10));
        }
    }

    #[tokio::test]
    async fn candidate_set_never_exceeds_capacity() {
        let h = Harness::new(StabilityConfig::default());
        h.engine.start().unwrap();
        h.feed_all(std::iter::repeat_n(fix_at(ORIGIN, 0.0, 0.0, 5.0), 10))
            .await;
        h.set_movement(MovementState::Still).await;

        // scattered far fixes never form a coherent cluster
        let mut rng = Lcg(11);
        for _ in 0..20 {
            let fix = fix_at(
                ORIGIN,
                rng.range(100.0, 400.0),
                rng.range(-300.0, 300.0),
                2.0,
            );
            h.feed(fix).await;
            let snapshot = h.engine.snapshot();
            assert!(snapshot.candidates.len() <= 5);
            assert_eq!(snapshot.stable.len(), 10);
        }
        assert!(h.engine.metrics_summary().rejected > 0);
    }

    #[test]
    fn candidate_set_is_fifo() {
        let mut set = CandidateSet::new(3);
        let fixes: Vec<Fix> = (0..5).map(|i| Fix::new(i as f64, 0.0, 1.0)).collect();

        for fix in &fixes[..3] {
            assert!(set.insert_evicting(*fix).is_none());
        }
        assert_eq!(set.insert_evicting(fixes[3]), Some(fixes[0]));
        assert_eq!(set.insert_evicting(fixes[4]), Some(fixes[1]));
        assert_eq!(set.all(), fixes[2..].to_vec());
    }

    #[test]
    fn promotion_empties_candidates_and_installs_cluster() {
        let config = StabilityConfig::default();
        let mut classifier = Classifier::new(&config);
        for _ in 0..10 {
            classifier.classify(fix_at(ORIGIN, 0.0, 0.0, 5.0), MovementState::Still);
        }

        let cluster: Vec<Fix> = (0..5)
            .map(|i| fix_at(ORIGIN, 80.0, i as f64 * 0.3, 4.0))
            .collect();
        let mut last = None;
        for fix in &cluster {
            last = Some(classifier.classify(*fix, MovementState::Still));
        }

        assert!(matches!(last, Some(Classification::Promoted { cluster_size: 5 })));
        assert!(classifier.candidates().is_empty());
        assert_eq!(classifier.stable().all(), cluster);
    }

    #[test]
    fn full_set_insertion_bounds_centroid_shift() {
        let config = StabilityConfig {
            stable_capacity: 8,
            ..Default::default()
        };
        let n = config.stable_capacity as f64;
        let mut classifier = Classifier::new(&config);
        let mut rng = Lcg(42);

        for _ in 0..8 {
            classifier.classify(noisy_fix(&mut rng, 10.0), MovementState::InVehicle);
        }

        for _ in 0..200 {
            let prior = classifier.stable().centroid().unwrap();
            let fix = noisy_fix(&mut rng, 30.0);

            let Classification::Accepted {
                evicted: Some(evicted),
                ..
            } = classifier.classify(fix, MovementState::InVehicle)
            else {
                panic!("full set in travel must accept with eviction");
            };

            let after = classifier.stable().centroid().unwrap();
            let bound = (distance(prior, fix.point()) + distance(prior, evicted.point())) / n;
            let shift = distance(prior, after);
            assert!(shift <= bound + 1e-3, "shift {shift} exceeds bound {bound}");
        }
    }

    #[test]
    fn filling_insertion_bounds_centroid_shift() {
        let mut set = StableSet::new(20);
        let mut rng = Lcg(3);
        set.insert_or_evict_worst(noisy_fix(&mut rng, 15.0), EvictionStrategy::LowestAccuracy);

        while !set.is_full() {
            let prior = set.centroid().unwrap();
            let len = set.len() as f64;
            let fix = noisy_fix(&mut rng, 15.0);
            assert!(set
                .insert_or_evict_worst(fix, EvictionStrategy::LowestAccuracy)
                .is_none());

            let shift = distance(prior, set.centroid().unwrap());
            let bound = distance(prior, fix.point()) / (len + 1.0);
            assert!(shift <= bound + 1e-3, "shift {shift} exceeds bound {bound}");
        }
    }

    #[test]
    fn full_stable_set_never_grows() {
        let mut set = StableSet::new(4);
        let mut rng = Lcg(99);
        for i in 0..50 {
            let strategy = if i % 2 == 0 {
                EvictionStrategy::LowestAccuracy
            } else {
                EvictionStrategy::Farthest
            };
            set.insert_or_evict_worst(noisy_fix(&mut rng, 50.0), strategy);
            assert!(set.len() <= 4);
        }
        assert_eq!(
            set.centroid(),
            centroid(&set.all()),
            "buffer centroid matches geometry helper"
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Fix, GeoPoint, MovementState, SinkConfig, SinkType, StabilityConfig};
    use dispatcher::create_dispatcher;
    use providers::{ReplayConfig, ReplayFixProvider, ScriptedMovementSource};
    use stability_engine::StabilityEngine;
    use tokio::sync::oneshot;

    use crate::support::Harness;

    fn file_sink(name: &str, path: &std::path::Path) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 64,
            params: HashMap::from([("path".to_string(), path.display().to_string())]),
        }
    }

    fn read_records(path: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    /// End-to-end: ScriptedFixProvider -> StabilityEngine -> Dispatcher -> FileSink
    #[tokio::test]
    async fn test_e2e_scripted_engine_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("estimates.jsonl");

        let h = Harness::new(StabilityConfig {
            stable_capacity: 3,
            ..Default::default()
        });
        let dispatcher = create_dispatcher(
            vec![SinkConfig::log("log"), file_sink("file", &path)],
            h.engine.subscribe(),
        )
        .unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let dispatcher_task = dispatcher.spawn_until(async move {
            let _ = stop_rx.await;
        });

        h.engine.start().unwrap();
        for i in 0..3 {
            h.feed(Fix::new(48.0, 11.0, 4.0 + i as f64)).await;
            // give the dispatcher a turn so every estimate reaches the sinks
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        h.engine.stop();
        stop_tx.send(()).unwrap();

        let metrics = tokio::time::timeout(Duration::from_secs(2), dispatcher_task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metrics.len(), 2);
        for (_, snapshot) in &metrics {
            assert_eq!(snapshot.write_count, 3);
            assert_eq!(snapshot.last_update, 3);
            assert_eq!(snapshot.failure_count, 0);
        }

        let records = read_records(&path);
        let counts: Vec<u64> = records
            .iter()
            .map(|r| r["update_count"].as_u64().unwrap())
            .collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert_eq!(records[2]["average_accuracy"], 5.0);
    }

    /// Config-driven run: TOML -> mock provider -> engine -> file sink
    #[tokio::test]
    async fn test_e2e_config_with_mock_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock.jsonl");
        let toml = format!(
            r#"
[engine]
stable_capacity = 4

[engine.policies]
startup = {{ interval_ms = 10, priority = "high_accuracy" }}

[provider]
kind = "mock"
origin = {{ latitude = 52.52, longitude = 13.405 }}
jitter_m = 1.0
accuracy_m = 3.0

[[sinks]]
name = "file"
sink_type = "file"
params = {{ path = "{}" }}
"#,
            path.display().to_string().replace('\\', "/")
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let provider = providers::build_fix_provider(&blueprint.provider).unwrap();
        let movement = Arc::new(ScriptedMovementSource::default());
        let engine = StabilityEngine::new(blueprint.engine.clone(), provider, movement).unwrap();
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), engine.subscribe()).unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let dispatcher_task = dispatcher.spawn_until(async move {
            let _ = stop_rx.await;
        });

        let mut rx = engine.subscribe();
        engine.start().unwrap();
        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|o| o.is_some_and(|o| o.update_count >= 4)),
        )
        .await
        .unwrap()
        .unwrap();

        let estimate = engine.latest().unwrap();
        let drift = stability_engine::geometry::distance(
            estimate.centroid,
            GeoPoint::new(52.52, 13.405),
        );
        assert!(drift <= 1.5, "estimate drifted {drift} m");
        assert_eq!(estimate.average_accuracy, 3.0);

        engine.stop();
        stop_tx.send(()).unwrap();
        dispatcher_task.await.unwrap();
        assert!(!read_records(&path).is_empty());
    }

    /// Recorded drive: replay file -> engine, movement switches to still
    #[tokio::test]
    async fn test_e2e_replay_recording() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..6 {
            writeln!(
                file,
                r#"{{"latitude": 1.0, "longitude": 1.0, "accuracy": 4.0, "timestamp": {}}}"#,
                i as f64 * 0.01
            )
            .unwrap();
        }

        let provider = Arc::new(ReplayFixProvider::load(ReplayConfig::new(file.path())).unwrap());
        let movement = Arc::new(ScriptedMovementSource::default());
        let engine = StabilityEngine::new(
            StabilityConfig {
                stable_capacity: 4,
                ..Default::default()
            },
            provider.clone(),
            movement.clone(),
        )
        .unwrap();

        let mut rx = engine.subscribe();
        engine.start().unwrap();
        let _script = movement.play(vec![contracts::MovementStep {
            after_ms: 0,
            state: MovementState::Still,
        }]);

        let output = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|o| o.is_some_and(|o| o.update_count == 6)),
        )
        .await
        .unwrap()
        .unwrap()
        .unwrap();
        assert_eq!(output.centroid, GeoPoint::new(1.0, 1.0));
        assert_eq!(engine.snapshot().stable.len(), 4);
        assert_eq!(provider.metrics().fixes_emitted, 6);
    }
}
