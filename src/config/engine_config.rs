//! Engine Configuration - operator-tunable TOML values
//!
//! Each struct implements `Default` with the built-in constants, so a missing
//! or empty config file behaves exactly like the hardcoded defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults::{CONFIG_ENV_VAR, LOCAL_CONFIG_FILE};
use crate::types::task_thresholds;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an evaluation session.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$MOTION_GAUGE_CONFIG` env var
/// 2. `./motion_gauge.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tick scheduling and frame staleness
    #[serde(default)]
    pub engine: EngineSection,

    /// Classifier margin
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Hold Timer cap and decay
    #[serde(default)]
    pub hold: HoldConfig,

    /// Duration-task cutoffs
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Result ledger capacity and storage location
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MOTION_GAUGE_CONFIG` environment variable
    /// 2. `./motion_gauge.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - One-leg warn cutoff must be below the pass cutoff
    /// - Decay factor in (0, 1]
    /// - Cap, margin and intervals must be positive and finite
    /// - Ledger capacity > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let one_leg = &self.thresholds.one_leg;
        Self::check_ordered(
            one_leg.warn_secs,
            one_leg.pass_secs,
            "thresholds.one_leg",
            &mut errors,
        );
        if one_leg.warn_secs < 0.0 {
            errors.push(format!(
                "thresholds.one_leg.warn_secs ({:.2}) cannot be negative",
                one_leg.warn_secs
            ));
        }

        let h = &self.hold;
        if !h.cap_ms.is_finite() || h.cap_ms <= 0.0 {
            errors.push(format!("hold.cap_ms must be a positive number, got {}", h.cap_ms));
        }
        if !h.decay_factor.is_finite() || h.decay_factor <= 0.0 || h.decay_factor > 1.0 {
            errors.push(format!(
                "hold.decay_factor must be in (0, 1], got {}",
                h.decay_factor
            ));
        }

        let m = self.classifier.margin;
        if !m.is_finite() || !(0.0..0.5).contains(&m) {
            errors.push(format!("classifier.margin must be in [0, 0.5), got {m}"));
        }

        if self.engine.tick_interval_ms == 0 {
            errors.push("engine.tick_interval_ms must be > 0".to_string());
        }
        if self.engine.stale_frame_ms == 0 {
            errors.push("engine.stale_frame_ms must be > 0".to_string());
        }
        if self.ledger.capacity == 0 {
            errors.push("ledger.capacity must be > 0".to_string());
        }

        for w in super::validation::validate_ranges(self) {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_ordered(lower: f64, upper: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass
        if !lower.is_finite() || !upper.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got warn={lower}, pass={upper})"
            ));
            return;
        }
        if lower >= upper {
            errors.push(format!(
                "{name}: warn cutoff ({lower:.3}) must be < pass cutoff ({upper:.3})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Engine Section
// ============================================================================

/// What drives the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    /// Fixed-period timer (`tick_interval_ms`).
    #[default]
    Interval,
    /// One tick per frame delivered by the source.
    PerFrame,
}

impl std::str::FromStr for TickMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interval" => Ok(TickMode::Interval),
            "per_frame" | "per-frame" | "frame" => Ok(TickMode::PerFrame),
            other => Err(format!("unknown tick mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub tick_mode: TickMode,

    /// Timer period when `tick_mode = "interval"` (ms).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// A frame older than this is treated as absent (ms). Also the longest
    /// frame gap that still counts as elapsed hold time in per-frame mode.
    #[serde(default = "default_stale_frame_ms")]
    pub stale_frame_ms: u64,
}

fn default_tick_interval_ms() -> u64 { 100 }
fn default_stale_frame_ms() -> u64 { 150 }

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            tick_mode: TickMode::default(),
            tick_interval_ms: default_tick_interval_ms(),
            stale_frame_ms: default_stale_frame_ms(),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Jitter margin in normalized units.
    #[serde(default = "default_margin")]
    pub margin: f64,
}

fn default_margin() -> f64 { task_thresholds::RAISE_MARGIN }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
        }
    }
}

// ============================================================================
// Hold Timer
// ============================================================================

/// Behaviour of the Hold Timer on a not-met tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayMode {
    /// Remove `dt × decay_factor` of progress.
    #[default]
    Proportional,
    /// Drop progress to zero immediately.
    InstantReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldConfig {
    /// Hold-to-pass cap (ms).
    #[serde(default = "default_cap_ms")]
    pub cap_ms: f64,

    #[serde(default)]
    pub decay: DecayMode,

    /// Only used with `decay = "proportional"`.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,
}

fn default_cap_ms() -> f64 { task_thresholds::HOLD_CAP_MS }
fn default_decay_factor() -> f64 { task_thresholds::HOLD_DECAY_FACTOR }

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            cap_ms: default_cap_ms(),
            decay: DecayMode::default(),
            decay_factor: default_decay_factor(),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub one_leg: DurationCutoffs,
}

/// `(warn_secs, pass_secs)` band edges for a duration-scored task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationCutoffs {
    #[serde(default = "default_one_leg_warn")]
    pub warn_secs: f64,

    #[serde(default = "default_one_leg_pass")]
    pub pass_secs: f64,
}

fn default_one_leg_warn() -> f64 { task_thresholds::ONE_LEG_WARN_SECS }
fn default_one_leg_pass() -> f64 { task_thresholds::ONE_LEG_PASS_SECS }

impl Default for DurationCutoffs {
    fn default() -> Self {
        Self {
            warn_secs: default_one_leg_warn(),
            pass_secs: default_one_leg_pass(),
        }
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Most-recent results retained.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Directory holding the sled database and the process lock.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_capacity() -> usize { super::defaults::LEDGER_CAPACITY }
fn default_data_dir() -> String { super::defaults::DATA_DIR.to_string() }

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            data_dir: default_data_dir(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `MOTION_GAUGE_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: EngineConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.classifier.margin, 0.03);
        assert_eq!(config.hold.cap_ms, 2000.0);
        assert_eq!(config.hold.decay_factor, 0.75);
        assert_eq!(config.hold.decay, DecayMode::Proportional);
        assert_eq!(config.thresholds.one_leg.warn_secs, 3.0);
        assert_eq!(config.thresholds.one_leg.pass_secs, 5.0);
        assert_eq!(config.ledger.capacity, 200);
        assert_eq!(config.engine.tick_mode, TickMode::Interval);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[hold]
decay = "instant_reset"
cap_ms = 3000.0

[thresholds.one_leg]
pass_secs = 10.0
"#;
        let config = EngineConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.hold.decay, DecayMode::InstantReset);
        assert_eq!(config.hold.cap_ms, 3000.0);
        assert_eq!(config.thresholds.one_leg.pass_secs, 10.0);
        // Non-overridden values retain defaults
        assert_eq!(config.thresholds.one_leg.warn_secs, 3.0);
        assert_eq!(config.hold.decay_factor, 0.75);
    }

    #[test]
    fn test_validation_catches_inverted_cutoffs() {
        let mut config = EngineConfig::default();
        config.thresholds.one_leg.warn_secs = 5.0;
        config.thresholds.one_leg.pass_secs = 3.0;
        let result = config.validate();
        assert!(result.is_err(), "Inverted cutoffs should fail validation");
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("one_leg")));
        }
    }

    #[test]
    fn test_validation_catches_bad_decay_and_cap() {
        let mut config = EngineConfig::default();
        config.hold.decay_factor = 1.5;
        config.hold.cap_ms = 0.0;
        config.ledger.capacity = 0;
        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_validation_catches_nan() {
        let mut config = EngineConfig::default();
        config.thresholds.one_leg.pass_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = EngineConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        assert!(toml_str.contains("[hold]"), "Missing [hold] section");
        assert!(toml_str.contains("[thresholds.one_leg]"), "Missing one_leg section");
        let roundtripped: EngineConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original.hold.cap_ms, roundtripped.hold.cap_ms);
        assert_eq!(original.ledger.data_dir, roundtripped.ledger.data_dir);
    }

    #[test]
    fn test_load_file_written_from_to_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motion_gauge.toml");
        let mut config = EngineConfig::default();
        config.classifier.margin = 0.05;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.classifier.margin, 0.05);
    }

    #[test]
    fn test_tick_mode_parse() {
        assert_eq!("interval".parse::<TickMode>().unwrap(), TickMode::Interval);
        assert_eq!("per-frame".parse::<TickMode>().unwrap(), TickMode::PerFrame);
        assert!("vsync".parse::<TickMode>().is_err());
    }
}
