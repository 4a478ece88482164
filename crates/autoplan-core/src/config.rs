//! TOML-based scheduler configuration.
//!
//! One immutable [`Config`] value drives a whole scheduling pass:
//! - Split sizing and title decoration
//! - Calendar-import detection window
//! - Urgency weights and tag boosts
//! - Working-day window used for placement
//!
//! Every field has a serde default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveTime};

use crate::error::ConfigError;

/// Block length used when neither the caller nor the config gives a positive one.
pub const DEFAULT_BLOCK_SIZE_MINUTES: i64 = 120;

/// Longest block a task is cut into (one year).
pub const MAX_BLOCK_SIZE_MINUTES: i64 = 525_600;

/// Longest calendar-import detection window (one year).
pub const MAX_DETECTION_WINDOW_MINUTES: i64 = 525_600;

/// Furthest a placement pass looks ahead.
pub const MAX_HORIZON_DAYS: u32 = 3650;

/// Longest pause between two placed blocks (one day).
pub const MAX_BREAK_MINUTES: i64 = 1440;

/// Notes substring marking a task whose splits were already accepted.
pub const DEFAULT_PROCESSED_MARKER: &str = "[AutoPlan]";

/// Relative weight of each urgency factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyWeights {
    /// Position in the input list
    #[serde(default = "default_one")]
    pub base: f64,
    /// Tag boost table
    #[serde(default = "default_one")]
    pub tag: f64,
    /// Remaining duration
    #[serde(default = "default_half")]
    pub duration: f64,
    /// Task age
    #[serde(default = "default_half")]
    pub age: f64,
}

/// How boosts of several matching tags are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagAggregate {
    /// Strongest matching tag wins
    #[default]
    Max,
    /// Boosts add up
    Sum,
}

/// Which end of the duration scale is favored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPreference {
    /// Short remaining work scores higher (quick wins)
    #[default]
    PreferShort,
    /// Long remaining work scores higher (big items get booked first)
    PreferLong,
}

/// Urgency scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyConfig {
    #[serde(default)]
    pub tag_aggregate: TagAggregate,
    #[serde(default)]
    pub duration_preference: DurationPreference,
    /// Age at which the age factor saturates
    #[serde(default = "default_age_horizon_days")]
    pub age_horizon_days: f64,
    #[serde(default)]
    pub weights: UrgencyWeights,
    /// Boost per tag id
    #[serde(default)]
    pub tag_priorities: HashMap<String, f64>,
}

/// Working-time layout used by the placer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Start of the working window (HH:MM, UTC)
    #[serde(default = "default_day_start")]
    pub day_start: String,
    /// End of the working window (HH:MM, UTC). Earlier than `day_start` means
    /// the window crosses midnight.
    #[serde(default = "default_day_end")]
    pub day_end: String,
    /// Working weekdays, 0=Mon ... 6=Sun
    #[serde(default = "default_workdays")]
    pub workdays: Vec<u8>,
    /// How many days ahead of `now` blocks may be placed
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Pause inserted after every placed block
    #[serde(default)]
    pub break_minutes: i64,
}

/// Scheduler configuration.
///
/// Serialized to/from TOML; all keys are snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_block_size_minutes")]
    pub block_size_minutes: i64,
    /// Append ` <I>`, ` <II>`, ... to split titles
    #[serde(default = "default_true")]
    pub split_suffix: bool,
    /// Prepended to every split title
    #[serde(default)]
    pub split_prefix: String,
    #[serde(default = "default_calendar_detection_window_minutes")]
    pub calendar_detection_window_minutes: i64,
    #[serde(default = "default_processed_marker")]
    pub processed_marker: String,
    #[serde(default)]
    pub urgency: UrgencyConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
}

// Default functions
fn default_one() -> f64 {
    1.0
}
fn default_half() -> f64 {
    0.5
}
fn default_true() -> bool {
    true
}
fn default_block_size_minutes() -> i64 {
    DEFAULT_BLOCK_SIZE_MINUTES
}
fn default_calendar_detection_window_minutes() -> i64 {
    5
}
fn default_processed_marker() -> String {
    DEFAULT_PROCESSED_MARKER.into()
}
fn default_age_horizon_days() -> f64 {
    365.0
}
fn default_day_start() -> String {
    "09:00".into()
}
fn default_day_end() -> String {
    "17:00".into()
}
fn default_workdays() -> Vec<u8> {
    (0..7).collect()
}
fn default_horizon_days() -> u32 {
    14
}

impl Default for UrgencyWeights {
    fn default() -> Self {
        Self {
            base: 1.0,
            tag: 1.0,
            duration: 0.5,
            age: 0.5,
        }
    }
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            tag_aggregate: TagAggregate::Max,
            duration_preference: DurationPreference::PreferShort,
            age_horizon_days: default_age_horizon_days(),
            weights: UrgencyWeights::default(),
            tag_priorities: HashMap::new(),
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            workdays: default_workdays(),
            horizon_days: default_horizon_days(),
            break_minutes: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size_minutes: DEFAULT_BLOCK_SIZE_MINUTES,
            split_suffix: true,
            split_prefix: String::new(),
            calendar_detection_window_minutes: default_calendar_detection_window_minutes(),
            processed_marker: default_processed_marker(),
            urgency: UrgencyConfig::default(),
            placement: PlacementConfig::default(),
        }
    }
}

/// Returns `~/.config/autoplan[-dev]/` based on AUTOPLAN_ENV.
///
/// Set AUTOPLAN_ENV=dev to use a development directory. Falls back to the
/// current directory when no home directory is known. Nothing is created.
pub fn config_dir() -> PathBuf {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    match std::env::var("AUTOPLAN_ENV").as_deref() {
        Ok("dev") => base_dir.join("autoplan-dev"),
        _ => base_dir.join("autoplan"),
    }
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let (hour, minute) = value.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

impl PlacementConfig {
    /// Working window as wall-clock times.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound is not a valid `HH:MM` time.
    pub fn day_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let start = parse_hhmm(&self.day_start)
            .ok_or_else(|| ConfigError::invalid("placement.day_start", "expected HH:MM"))?;
        let end = parse_hhmm(&self.day_end)
            .ok_or_else(|| ConfigError::invalid("placement.day_end", "expected HH:MM"))?;
        Ok((start, end))
    }

    /// Look-ahead of a pass, capped at [`MAX_HORIZON_DAYS`].
    pub fn horizon(&self) -> Duration {
        Duration::days(i64::from(self.horizon_days.min(MAX_HORIZON_DAYS)))
    }

    /// Pause after each block, clamped to `0..=MAX_BREAK_MINUTES`.
    pub fn pause(&self) -> Duration {
        Duration::minutes(self.break_minutes.clamp(0, MAX_BREAK_MINUTES))
    }
}

impl Config {
    /// Block length to use for a pass.
    ///
    /// A positive `requested` value wins, then a positive configured value,
    /// then [`DEFAULT_BLOCK_SIZE_MINUTES`]. The result never exceeds
    /// [`MAX_BLOCK_SIZE_MINUTES`].
    pub fn effective_block_minutes(&self, requested: i64) -> i64 {
        let minutes = if requested > 0 {
            requested
        } else if self.block_size_minutes > 0 {
            self.block_size_minutes
        } else {
            DEFAULT_BLOCK_SIZE_MINUTES
        };
        minutes.min(MAX_BLOCK_SIZE_MINUTES)
    }

    /// Calendar-import detection window, clamped to `0..=MAX_DETECTION_WINDOW_MINUTES`.
    pub fn detection_window(&self) -> Duration {
        Duration::minutes(
            self.calendar_detection_window_minutes
                .clamp(0, MAX_DETECTION_WINDOW_MINUTES),
        )
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this schema or
    /// if a value is out of range (see [`Config::validate`]).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Load from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from a file, returning default when the file is missing.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write as pretty TOML, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_failed = |e: std::io::Error| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(write_failed)
    }

    /// `config_dir()/config.toml`
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Reject values no scheduling pass can work with.
    ///
    /// Non-positive `block_size_minutes` is allowed: it falls back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size_minutes > MAX_BLOCK_SIZE_MINUTES {
            return Err(ConfigError::invalid(
                "block_size_minutes",
                format!("must not exceed {MAX_BLOCK_SIZE_MINUTES}"),
            ));
        }
        if !(0..=MAX_DETECTION_WINDOW_MINUTES).contains(&self.calendar_detection_window_minutes) {
            return Err(ConfigError::invalid(
                "calendar_detection_window_minutes",
                format!("expected 0 to {MAX_DETECTION_WINDOW_MINUTES}"),
            ));
        }
        if self.processed_marker.is_empty() {
            return Err(ConfigError::invalid("processed_marker", "must not be empty"));
        }

        let w = &self.urgency.weights;
        for (key, value) in [
            ("urgency.weights.base", w.base),
            ("urgency.weights.tag", w.tag),
            ("urgency.weights.duration", w.duration),
            ("urgency.weights.age", w.age),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(key, format!("expected a non-negative number, got {value}")));
            }
        }
        if let Some((tag, boost)) = self.urgency.tag_priorities.iter().find(|(_, b)| !b.is_finite()) {
            return Err(ConfigError::invalid(
                &format!("urgency.tag_priorities.{tag}"),
                format!("expected a finite number, got {boost}"),
            ));
        }
        let horizon = self.urgency.age_horizon_days;
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(ConfigError::invalid("urgency.age_horizon_days", "must be positive"));
        }

        let (start, end) = self.placement.day_window()?;
        if start == end {
            return Err(ConfigError::invalid("placement.day_end", "working window is empty"));
        }
        if let Some(day) = self.placement.workdays.iter().find(|d| **d > 6) {
            return Err(ConfigError::invalid(
                "placement.workdays",
                format!("weekday {day} out of range 0-6"),
            ));
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&self.placement.horizon_days) {
            return Err(ConfigError::invalid(
                "placement.horizon_days",
                format!("expected 1 to {MAX_HORIZON_DAYS}"),
            ));
        }
        if !(0..=MAX_BREAK_MINUTES).contains(&self.placement.break_minutes) {
            return Err(ConfigError::invalid(
                "placement.break_minutes",
                format!("expected 0 to {MAX_BREAK_MINUTES}"),
            ));
        }
        Ok(())
    }
}
