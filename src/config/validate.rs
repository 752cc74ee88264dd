// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DtmError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DtmError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.run, raw.output, raw.env))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_run_section(cfg)?;
    validate_env(cfg.env.keys().map(String::as_str))?;
    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.processes == Some(0) {
        return Err(DtmError::ConfigError(
            "[run].processes must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(secs) = cfg.run.timeout {
        validate_timeout(secs)?;
    }

    if cfg.run.task_log.trim().is_empty() {
        return Err(DtmError::ConfigError(
            "[run].task_log must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// A timeout must be a positive, finite number of seconds.
pub fn validate_timeout(secs: f64) -> Result<()> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(DtmError::ConfigError(format!(
            "timeout must be a positive number of seconds (got {secs})"
        )));
    }
    Ok(())
}

/// Environment variable names must be non-empty and must not contain `=`.
pub fn validate_env<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for key in keys {
        if key.is_empty() || key.contains('=') {
            return Err(DtmError::ConfigError(format!(
                "invalid environment variable name '{key}'"
            )));
        }
    }
    Ok(())
}
