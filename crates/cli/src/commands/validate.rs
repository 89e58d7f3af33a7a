//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{MovementState, ProviderKind, StabilityBlueprint};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    provider: String,
    stable_capacity: usize,
    candidate_capacity: usize,
    drift_threshold_m: f64,
    movement_steps: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(format!("File not found: {config_path}")),
            config_path,
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                provider: format!("{:?}", blueprint.provider.kind),
                stable_capacity: blueprint.engine.stable_capacity,
                candidate_capacity: blueprint.engine.candidate_capacity,
                drift_threshold_m: blueprint.engine.drift_threshold_m,
                movement_steps: blueprint.movement.script.len(),
                sink_count: blueprint.sinks.len(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal issues worth pointing out
fn collect_warnings(blueprint: &StabilityBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - estimates will not be recorded".to_string());
    }

    if blueprint.engine.candidate_capacity > blueprint.engine.stable_capacity {
        warnings.push(format!(
            "candidate_capacity ({}) exceeds stable_capacity ({}) - relocation needs more evidence than the stable set holds",
            blueprint.engine.candidate_capacity, blueprint.engine.stable_capacity
        ));
    }

    let stationary_ever = blueprint.movement.initial.is_stationary()
        || blueprint.movement.script.iter().any(|s| s.state.is_stationary());
    if !stationary_ever {
        warnings.push(
            "Movement never becomes still/tilting - relocation clusters will not be gathered"
                .to_string(),
        );
    }

    if blueprint.provider.kind == ProviderKind::Mock
        && blueprint.provider.jitter_m > blueprint.engine.drift_threshold_m
    {
        warnings.push(format!(
            "Mock jitter ({} m) exceeds drift threshold ({} m)",
            blueprint.provider.jitter_m, blueprint.engine.drift_threshold_m
        ));
    }

    if blueprint.movement.initial == MovementState::Unknown && blueprint.movement.script.is_empty()
    {
        warnings.push("No movement script - movement stays 'unknown'".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Provider: {}", summary.provider);
            println!(
                "  Stable/candidate capacity: {}/{}",
                summary.stable_capacity, summary.candidate_capacity
            );
            println!("  Drift threshold: {} m", summary.drift_threshold_m);
            println!("  Movement steps: {}", summary.movement_steps);
            println!("  Sinks: {}", summary.sink_count);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
