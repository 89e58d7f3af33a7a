//! # Config Loader
//!
//! 读取 TOML/JSON 蓝图，校验引擎参数、定位源、移动脚本与输出端，
//! 产出可直接交给引擎的 `StabilityBlueprint`。
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("stability.toml")).unwrap();
//! println!("Provider: {:?}", blueprint.provider.kind);
//! ```

mod parser;
mod validator;

pub use contracts::StabilityBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Stateless entry point for loading blueprints
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate the file at `path`; `.toml` or `.json` picks the format.
    pub fn load_from_path(path: &Path) -> Result<StabilityBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse then validate in-memory text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<StabilityBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate a blueprint built in code
    pub fn validate(blueprint: &StabilityBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &StabilityBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &StabilityBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}
