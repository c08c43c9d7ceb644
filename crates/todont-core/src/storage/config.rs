//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - Scoring (completion penalty, milestone interval)
//! - Task validation (accepted estimate range)
//! - The avoidance clock period
//! - Bingo board generation and celebration
//! - Notifications
//!
//! Configuration is stored at `~/.config/todont/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::data_dir;
use crate::bingo::{BoardSettings, BoardStrategy};
use crate::error::ConfigError;
use crate::ledger::{LedgerSettings, PenaltyPolicy};
use crate::task::DurationRange;

/// Scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Fraction of accrued points forfeited when a task is completed.
    #[serde(default = "default_completion_penalty")]
    pub completion_penalty: f64,
    #[serde(default = "default_milestone_interval")]
    pub milestone_interval_min: u64,
}

/// Task validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_min_duration")]
    pub min_duration_min: u32,
    #[serde(default = "default_max_duration")]
    pub max_duration_min: u32,
}

/// Avoidance clock configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

/// Bingo board configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BingoConfig {
    #[serde(default)]
    pub strategy: BoardStrategy,
    #[serde(default = "default_celebration_secs")]
    pub celebration_secs: u64,
    /// Demo boards only. Leave at 0 for real use.
    #[serde(default)]
    pub demo_premark_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Notification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/todont/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub bingo: BingoConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Longest celebration a config may ask for.
pub const MAX_CELEBRATION_SECS: u64 = 600;

// Default functions
fn default_completion_penalty() -> f64 {
    0.5
}
fn default_milestone_interval() -> u64 {
    5
}
fn default_min_duration() -> u32 {
    5
}
fn default_max_duration() -> u32 {
    480
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_celebration_secs() -> u64 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            completion_penalty: default_completion_penalty(),
            milestone_interval_min: default_milestone_interval(),
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            min_duration_min: default_min_duration(),
            max_duration_min: default_max_duration(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl Default for BingoConfig {
    fn default() -> Self {
        Self {
            strategy: BoardStrategy::default(),
            celebration_secs: default_celebration_secs(),
            demo_premark_probability: 0.0,
            seed: None,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Optional fields (the seed) are null until set.
                    serde_json::Value::Null => {
                        if value.eq_ignore_ascii_case("none") {
                            serde_json::Value::Null
                        } else {
                            serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk, writing the default if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Same as [`Config::load`] against an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value in memory by dot-separated key, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the engines cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if PenaltyPolicy::from_fraction(self.scoring.completion_penalty).is_none() {
            return invalid("scoring.completion_penalty", "must be between 0 and 1");
        }
        if self.scoring.milestone_interval_min == 0 {
            return invalid("scoring.milestone_interval_min", "must be at least 1");
        }
        if self.tasks.min_duration_min > self.tasks.max_duration_min {
            return invalid("tasks.min_duration_min", "must not exceed tasks.max_duration_min");
        }
        if self.clock.tick_interval_ms == 0 {
            return invalid("clock.tick_interval_ms", "must be at least 1");
        }
        if self.bingo.celebration_secs > MAX_CELEBRATION_SECS {
            return invalid("bingo.celebration_secs", "must be at most 600");
        }
        let p = self.bingo.demo_premark_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return invalid("bingo.demo_premark_probability", "must be between 0 and 1");
        }
        Ok(())
    }

    pub fn duration_range(&self) -> DurationRange {
        DurationRange {
            min: self.tasks.min_duration_min,
            max: self.tasks.max_duration_min,
        }
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            penalty: PenaltyPolicy::from_fraction(self.scoring.completion_penalty)
                .unwrap_or_default(),
            milestone_interval: self.scoring.milestone_interval_min.max(1),
            durations: self.duration_range(),
        }
    }

    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            strategy: self.bingo.strategy,
            premark_probability: self.bingo.demo_premark_probability.clamp(0.0, 1.0),
            celebration_duration: i64::try_from(self.bingo.celebration_secs.min(MAX_CELEBRATION_SECS))
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or_else(|| chrono::Duration::seconds(3)),
            seed: self.bingo.seed,
        }
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.clock.tick_interval_ms.max(1))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!("using default configuration: {e}");
            Self::default()
        })
    }
}
