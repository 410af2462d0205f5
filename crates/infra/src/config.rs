//! Configuration loading: optional JSON file, then `STOCKWISE_*` environment overrides.
//!
//! Range validation is left to `AnalyticsEngine::new`; this module only parses.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use stockwise_analytics::{AnalyticsConfig, SmoothingParam};
use stockwise_core::PeriodGranularity;

pub const ENV_PREFIX: &str = "STOCKWISE_";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: '{value}' ({reason})")]
    InvalidEnv { var: String, value: String, reason: String },
}

/// Load from `path` (if any) and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig, ConfigLoadError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Load from `path` (if any), then apply overrides found through `lookup`.
///
/// `lookup` receives full variable names (e.g. `STOCKWISE_WINDOW_PERIODS`).
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<AnalyticsConfig, ConfigLoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => from_file(path)?,
        None => AnalyticsConfig::default(),
    };
    apply_env_overrides(&mut config, lookup)?;
    Ok(config)
}

pub fn from_file(path: &Path) -> Result<AnalyticsConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn apply_env_overrides<F>(config: &mut AnalyticsConfig, lookup: F) -> Result<(), ConfigLoadError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.parse::<u32>("WINDOW_PERIODS")? {
        config.window_periods = v;
    }
    if let Some(v) = env.parse::<PeriodGranularity>("PERIOD_GRANULARITY")? {
        config.period_granularity = v;
    }
    if let Some(v) = env.parse::<u32>("MIN_HISTORY_PERIODS")? {
        config.min_history_periods = v;
    }
    if let Some(v) = env.parse::<u32>("FORECAST_HORIZON")? {
        config.forecast_horizon = v;
    }
    if let Some(v) = env.parse::<SmoothingParam>("ALPHA")? {
        config.alpha = v;
    }
    if let Some(v) = env.parse::<SmoothingParam>("BETA")? {
        config.beta = v;
    }
    if let Some(grid) = env.raw("SMOOTHING_GRID") {
        config.smoothing_grid = grid
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| env.invalid("SMOOTHING_GRID", &grid, e))?;
    }
    if let Some(v) = env.parse::<f64>("CONFIDENCE_LEVEL")? {
        config.confidence_level = v;
    }
    if let Some(v) = env.parse::<f64>("ABC_A")? {
        config.abc_thresholds.a = v;
    }
    if let Some(v) = env.parse::<f64>("ABC_B")? {
        config.abc_thresholds.b = v;
    }
    if let Some(v) = env.parse::<f64>("XYZ_X")? {
        config.xyz_thresholds.x = v;
    }
    if let Some(v) = env.parse::<f64>("XYZ_Y")? {
        config.xyz_thresholds.y = v;
    }
    if let Some(v) = env.parse::<u32>("REVIEW_PERIOD_DAYS")? {
        config.review_period_days = v;
    }
    if let Some(v) = env.parse::<u32>("DEFAULT_LEAD_TIME_DAYS")? {
        config.default_lead_time_days = v;
    }
    if let Some(v) = env.parse::<f64>("OVERSTOCK_MULTIPLIER")? {
        config.overstock_multiplier = v;
    }
    if let Some(v) = env.parse::<u32>("SLOW_MOVING_PERIODS")? {
        config.slow_moving_periods = v;
    }
    if let Some(v) = env.parse::<u32>("STALE_AFTER_DAYS")? {
        config.stale_after_days = v;
    }
    if let Some(v) = env.parse::<usize>("MAX_WORKERS")? {
        config.max_workers = Some(v);
    }

    Ok(())
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-blank value of `STOCKWISE_<key>`.
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigLoadError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(key) {
            Some(value) => value.parse::<T>().map(Some).map_err(|e| self.invalid(key, &value, e)),
            None => Ok(None),
        }
    }

    fn invalid(&self, key: &str, value: &str, reason: impl std::fmt::Display) -> ConfigLoadError {
        ConfigLoadError::InvalidEnv {
            var: format!("{ENV_PREFIX}{key}"),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
