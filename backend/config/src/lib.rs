//! `clockin-config` — configuration for the clock-in runner.
//!
//! Provides:
//! - Typed config schema (shift times, timeouts, browser, logging)
//! - YAML loading from `~/.clockin/config.yaml`
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with path-tagged messages

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{BrowserConfig, ClockInConfig, LoggingConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, apply env substitution, and apply defaults to a config file.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<ClockInConfig> {
    let raw_config = load_config(path).await?;

    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: ClockInConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    Ok(apply_all_defaults(config))
}
