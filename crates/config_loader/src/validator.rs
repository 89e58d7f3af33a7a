//! 配置校验模块
//!
//! 校验规则：
//! - engine 参数 (容量 >= 1, drift > 0, 各策略 interval > 0)
//! - provider 参数 (jitter/accuracy >= 0, replay 需要 replay_path, replay_speed > 0)
//! - sink 名称非空且唯一, file sink 需要 params.path
//! - movement 脚本时间偏移单调不减

use std::collections::HashSet;

use contracts::{ContractError, ProviderKind, SinkType, StabilityBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 StabilityBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StabilityBlueprint) -> Result<(), ContractError> {
    validate_engine(blueprint)?;
    validate_provider(blueprint)?;
    validate_sinks(blueprint)?;
    validate_movement(blueprint)?;
    Ok(())
}

fn validate_engine(blueprint: &StabilityBlueprint) -> Result<(), ContractError> {
    blueprint.engine.validate().map_err(|errors| {
        let (field, message) = first_violation("engine", &errors)
            .unwrap_or_else(|| ("engine".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 取出第一条违规 (按字段名排序，保证结果稳定)
fn first_violation(prefix: &str, errors: &ValidationErrors) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    entries.into_iter().find_map(|(name, kind)| {
        let path = format!("{prefix}.{name}");
        match kind {
            ValidationErrorsKind::Field(errs) => errs.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (path, message)
            }),
            ValidationErrorsKind::Struct(inner) => first_violation(&path, inner),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_violation(&format!("{path}[{idx}]"), inner)),
        }
    })
}

fn validate_provider(blueprint: &StabilityBlueprint) -> Result<(), ContractError> {
    let provider = &blueprint.provider;

    if !(-90.0..=90.0).contains(&provider.origin.latitude)
        || !(-180.0..=180.0).contains(&provider.origin.longitude)
    {
        return Err(ContractError::config_validation(
            "provider.origin",
            format!(
                "origin ({}, {}) is not a valid WGS84 coordinate",
                provider.origin.latitude, provider.origin.longitude
            ),
        ));
    }

    if !non_negative(provider.jitter_m) {
        return Err(ContractError::config_validation(
            "provider.jitter_m",
            format!("jitter_m must be >= 0, got {}", provider.jitter_m),
        ));
    }
    if !non_negative(provider.accuracy_m) {
        return Err(ContractError::config_validation(
            "provider.accuracy_m",
            format!("accuracy_m must be >= 0, got {}", provider.accuracy_m),
        ));
    }

    if provider.kind == ProviderKind::Replay {
        if provider.replay_path.is_none() {
            return Err(ContractError::config_validation(
                "provider.replay_path",
                "replay provider requires replay_path",
            ));
        }
        if provider.replay_speed.is_nan() || provider.replay_speed <= 0.0 {
            return Err(ContractError::config_validation(
                "provider.replay_speed",
                format!("replay_speed must be > 0, got {}", provider.replay_speed),
            ));
        }
    }

    Ok(())
}

/// NaN 也视为非法
fn non_negative(value: f64) -> bool {
    !value.is_nan() && value >= 0.0
}

fn validate_sinks(blueprint: &StabilityBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "file sink requires a path parameter",
            ));
        }
    }
    Ok(())
}

fn validate_movement(blueprint: &StabilityBlueprint) -> Result<(), ContractError> {
    let script = &blueprint.movement.script;
    for (idx, pair) in script.windows(2).enumerate() {
        if pair[1].after_ms < pair[0].after_ms {
            return Err(ContractError::config_validation(
                format!("movement.script[{}].after_ms", idx + 1),
                format!(
                    "script offsets must be non-decreasing ({} after {})",
                    pair[1].after_ms, pair[0].after_ms
                ),
            ));
        }
    }
    Ok(())
}
