//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::{ProviderKind, StabilityBlueprint};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after applying CLI overrides")?;

    info!(
        provider = ?blueprint.provider.kind,
        stable_capacity = blueprint.engine.stable_capacity,
        candidate_capacity = blueprint.engine.candidate_capacity,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        max_updates: (args.max_updates > 0).then_some(args.max_updates),
        metrics_port: args.metrics_port,
    });

    info!("Starting engine session...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Engine session failed")?;

    stats.print_summary();
    info!("Stability engine finished");
    Ok(())
}

fn apply_overrides(blueprint: &mut StabilityBlueprint, args: &RunArgs) {
    if let Some(ref path) = args.replay {
        info!(path = %path.display(), "Overriding provider with replay from CLI");
        blueprint.provider.kind = ProviderKind::Replay;
        blueprint.provider.replay_path = Some(path.clone());
    }
    if let Some(speed) = args.replay_speed {
        blueprint.provider.replay_speed = speed;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C"),
        _ = terminate => warn!("Received SIGTERM"),
    }
}

fn print_config_summary(blueprint: &StabilityBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Engine:");
    println!(
        "  Stable/candidate capacity: {}/{}",
        blueprint.engine.stable_capacity, blueprint.engine.candidate_capacity
    );
    println!("  Drift threshold: {} m", blueprint.engine.drift_threshold_m);

    println!("\nProvider: {:?}", blueprint.provider.kind);
    match blueprint.provider.kind {
        ProviderKind::Mock => println!(
            "  Origin: {}, {} (jitter {} m)",
            blueprint.provider.origin.latitude,
            blueprint.provider.origin.longitude,
            blueprint.provider.jitter_m
        ),
        ProviderKind::Replay => {
            if let Some(ref path) = blueprint.provider.replay_path {
                println!(
                    "  Recording: {} (x{})",
                    path.display(),
                    blueprint.provider.replay_speed
                );
            }
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
