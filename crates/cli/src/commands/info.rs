//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{MovementStep, PolicyTable, ProviderKind, StabilityBlueprint};

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    engine: EngineInfo,
    provider: ProviderInfo,
    movement: MovementInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct EngineInfo {
    stable_capacity: usize,
    candidate_capacity: usize,
    drift_threshold_m: f64,
    drop_low_information_fixes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    policies: Option<PolicyTable>,
}

#[derive(Serialize)]
struct ProviderInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_path: Option<String>,
}

#[derive(Serialize)]
struct MovementInfo {
    initial: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    script: Vec<MovementStep>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{json}");
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &StabilityBlueprint, args: &InfoArgs) -> ConfigInfo {
    let engine = &blueprint.engine;
    let provider = &blueprint.provider;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        engine: EngineInfo {
            stable_capacity: engine.stable_capacity,
            candidate_capacity: engine.candidate_capacity,
            drift_threshold_m: engine.drift_threshold_m,
            drop_low_information_fixes: engine.drop_low_information_fixes,
            policies: args.policies.then_some(engine.policies),
        },
        provider: ProviderInfo {
            kind: format!("{:?}", provider.kind),
            origin: (provider.kind == ProviderKind::Mock)
                .then_some((provider.origin.latitude, provider.origin.longitude)),
            replay_path: provider
                .replay_path
                .as_ref()
                .map(|p| p.display().to_string()),
        },
        movement: MovementInfo {
            initial: blueprint.movement.initial.to_string(),
            script: if args.movement {
                blueprint.movement.script.clone()
            } else {
                Vec::new()
            },
        },
        sinks: blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect(),
    }
}

fn print_config_info(blueprint: &StabilityBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Stability Engine Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let engine = &blueprint.engine;
    println!("⚙️  Engine");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Stable capacity: {}", engine.stable_capacity);
    println!("   ├─ Candidate capacity: {}", engine.candidate_capacity);
    println!("   ├─ Drift threshold: {} m", engine.drift_threshold_m);
    println!(
        "   └─ Drop low-information fixes: {}",
        engine.drop_low_information_fixes
    );

    if args.policies {
        let policies = &engine.policies;
        println!("\n⏱  Sampling Policies");
        println!("   ├─ Startup: {}", policies.startup);
        println!("   ├─ Gathering: {}", policies.gathering);
        println!("   ├─ Settled: {}", policies.settled);
        println!("   └─ Reacquire: {}", policies.reacquire);
    }

    let provider = &blueprint.provider;
    println!("\n📡 Provider ({:?})", provider.kind);
    match provider.kind {
        ProviderKind::Mock => {
            println!(
                "   ├─ Origin: {}, {}",
                provider.origin.latitude, provider.origin.longitude
            );
            println!("   ├─ Jitter: {} m", provider.jitter_m);
            println!("   └─ Accuracy: {} m", provider.accuracy_m);
        }
        ProviderKind::Replay => {
            if let Some(ref path) = provider.replay_path {
                println!("   ├─ Recording: {}", path.display());
            }
            println!("   ├─ Speed: x{}", provider.replay_speed);
            println!("   └─ Loop: {}", provider.replay_loop);
        }
    }

    let movement = &blueprint.movement;
    println!("\n🚶 Movement");
    if args.movement && !movement.script.is_empty() {
        println!("   ├─ Initial: {}", movement.initial);
        for (i, step) in movement.script.iter().enumerate() {
            let prefix = if i == movement.script.len() - 1 { "└─" } else { "├─" };
            println!("   {prefix} +{} ms: {}", step.after_ms, step.state);
        }
    } else {
        println!("   ├─ Initial: {}", movement.initial);
        println!("   └─ {} scripted changes", movement.script.len());
    }

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let prefix = if i == blueprint.sinks.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {prefix} {} ({:?}, queue {})",
                sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GeoPoint, MovementState, ProviderConfig, SinkConfig};
    use std::path::PathBuf;

    fn info_args(policies: bool, movement: bool) -> InfoArgs {
        InfoArgs {
            config: PathBuf::from("stability.toml"),
            json: true,
            policies,
            movement,
        }
    }

    fn blueprint() -> StabilityBlueprint {
        let mut bp = StabilityBlueprint::new(ProviderConfig::mock(GeoPoint::new(10.0, 20.0)));
        bp.sinks.push(SinkConfig::log("log"));
        bp.movement.script.push(MovementStep {
            after_ms: 100,
            state: MovementState::Walking,
        });
        bp
    }

    #[test]
    fn test_info_json_hides_optional_sections() {
        let info = build_config_info(&blueprint(), &info_args(false, false));
        let json = serde_json::to_value(&info).unwrap();
        assert!(json["engine"].get("policies").is_none());
        assert!(json["movement"].get("script").is_none());
        assert_eq!(json["provider"]["origin"][0], 10.0);
        assert_eq!(json["sinks"][0]["name"], "log");
    }

    #[test]
    fn test_info_json_with_policies_and_movement() {
        let info = build_config_info(&blueprint(), &info_args(true, true));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["engine"]["policies"]["settled"]["interval_ms"], 5000);
        assert_eq!(json["movement"]["script"][0]["state"], "walking");
    }
}
