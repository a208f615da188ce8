//! Bench configuration – reads `loadctl.toml`.
//!
//! The file is optional.  Every table and field falls back to its default,
//! and a handful of `LOADCTL_*` environment variables override the result.

use std::fs;
use std::path::{Path, PathBuf};

use loadctl_control::ControlConfig;
use loadctl_hal::sim::SourceModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "loadctl.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid control config: {0}")]
    Invalid(#[from] loadctl_control::ConfigError),
}

/// Contents of `loadctl.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub control: ControlConfig,
    pub bench: BenchConfig,
}

/// The simulated hardware the CLI runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Ceiling of the current actuator, in microamps.
    pub max_current_ua: u32,
    /// Ceiling of the voltage actuator, in microvolts.
    pub max_voltage_uv: u32,
    pub sample_period_ms: u32,
    pub thevenin: TheveninConfig,
    pub solar: SolarConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TheveninConfig {
    pub open_circuit_uv: u32,
    pub internal_mohm: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarConfig {
    pub open_circuit_uv: u32,
    pub short_circuit_ua: u32,
    pub knee_uv: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            max_current_ua: 10_000_000,
            max_voltage_uv: 60_000_000,
            sample_period_ms: 10,
            thevenin: TheveninConfig::default(),
            solar: SolarConfig::default(),
        }
    }
}

impl Default for TheveninConfig {
    fn default() -> Self {
        Self {
            open_circuit_uv: 24_000_000,
            internal_mohm: 2_000,
        }
    }
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            open_circuit_uv: 20_000_000,
            short_circuit_ua: 5_000_000,
            knee_uv: 1_500_000,
        }
    }
}

impl TheveninConfig {
    pub fn model(&self) -> SourceModel {
        SourceModel::Thevenin {
            open_circuit_uv: self.open_circuit_uv,
            internal_mohm: self.internal_mohm,
        }
    }
}

impl SolarConfig {
    pub fn model(&self) -> SourceModel {
        SourceModel::Solar {
            open_circuit_uv: self.open_circuit_uv,
            short_circuit_ua: self.short_circuit_ua,
            knee_uv: self.knee_uv,
        }
    }
}

/// Resolve the config path: `explicit`, then `LOADCTL_CONFIG`, then
/// [`DEFAULT_CONFIG_FILE`].
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os("LOADCTL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load, override from the environment and validate.
///
/// A missing file is not an error; the defaults are used instead.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = load_from(&config_path(explicit))?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.control.validate()?;
    Ok(cfg)
}

/// Parse the file at `path`.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(cfg))
}

/// Apply `LOADCTL_*` environment variable overrides to `cfg`.
///
/// Values that do not parse as an unsigned integer are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `LOADCTL_POWER_INTERVAL_MS` | `control.power_update_interval_ms` |
/// | `LOADCTL_INPUT_IMPEDANCE_MOHM` | `control.voltmeter_input_impedance_mohm` |
/// | `LOADCTL_MAX_CURRENT_UA` | `bench.max_current_ua` |
/// | `LOADCTL_MAX_VOLTAGE_UV` | `bench.max_voltage_uv` |
/// | `LOADCTL_SAMPLE_PERIOD_MS` | `bench.sample_period_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_u32("LOADCTL_POWER_INTERVAL_MS") {
        cfg.control.power_update_interval_ms = v;
    }
    if let Some(v) = env_u32("LOADCTL_INPUT_IMPEDANCE_MOHM") {
        cfg.control.voltmeter_input_impedance_mohm = v;
    }
    if let Some(v) = env_u32("LOADCTL_MAX_CURRENT_UA") {
        cfg.bench.max_current_ua = v;
    }
    if let Some(v) = env_u32("LOADCTL_MAX_VOLTAGE_UV") {
        cfg.bench.max_voltage_uv = v;
    }
    if let Some(v) = env_u32("LOADCTL_SAMPLE_PERIOD_MS") {
        cfg.bench.sample_period_ms = v;
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok()?.trim().parse().ok()
}
