#![forbid(unsafe_code)]

//! Tunable parameters for the selection engine and the count-entry form.
//!
//! Every field has a documented default, so `PickerConfig::default()`
//! reproduces the stock behavior. Hosts that want different thresholds can
//! construct the struct directly or, with the `config` feature, load it from
//! TOML or JSON:
//!
//! ```toml
//! auto_select_delay_ms = 2500
//! palm_rejection_px = 160.0
//! ```
//!
//! ```rust,ignore
//! let config = PickerConfig::from_toml_str(text)?;
//! ```

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use web_time::Duration;

/// Default full auto-select delay measured from the last contact-set change.
pub const DEFAULT_AUTO_SELECT_DELAY_MS: u64 = 2_000;
/// Default length of the anticipation phase that precedes commit.
pub const DEFAULT_ANTICIPATION_MS: u64 = 500;
/// Default interval between highlight steps during anticipation.
pub const DEFAULT_CYCLE_INTERVAL_MS: u64 = 110;
/// Hard ceiling on concurrent contacts regardless of device capability.
pub const DEFAULT_MAX_CONTACTS_CEILING: usize = 6;
/// Contacts wider or taller than this (CSS pixels) are treated as palms.
pub const DEFAULT_PALM_REJECTION_PX: f32 = 140.0;
/// Namespaced key for the persisted last mode.
pub const DEFAULT_STORAGE_KEY: &str = "turnorder.lastMode";
/// Smallest accepted player count in count-entry mode.
pub const DEFAULT_MIN_PLAYERS: u32 = 2;
/// Largest accepted player count in count-entry mode.
pub const DEFAULT_MAX_PLAYERS: u32 = 20;
/// Notices retained for the host before the oldest is dropped.
pub const DEFAULT_NOTICE_CAPACITY: usize = 256;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct PickerConfig {
    /// Quiet period (ms) with at least two contacts before a winner is drawn.
    pub auto_select_delay_ms: u64,
    /// Length (ms) of the highlight cycling that precedes commit.
    pub anticipation_ms: u64,
    /// Step interval (ms) of the highlight cycle.
    pub cycle_interval_ms: u64,
    /// Upper bound on concurrent contacts, applied on top of the device value.
    pub max_contacts_ceiling: usize,
    /// Width/height (px) above which a new contact is rejected.
    pub palm_rejection_px: f32,
    /// Key the last mode is persisted under.
    pub storage_key: String,
    /// Count-entry lower bound.
    pub min_players: u32,
    /// Count-entry upper bound.
    pub max_players: u32,
    /// Outbox bound for notices not yet drained by a host.
    pub notice_capacity: usize,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            auto_select_delay_ms: DEFAULT_AUTO_SELECT_DELAY_MS,
            anticipation_ms: DEFAULT_ANTICIPATION_MS,
            cycle_interval_ms: DEFAULT_CYCLE_INTERVAL_MS,
            max_contacts_ceiling: DEFAULT_MAX_CONTACTS_CEILING,
            palm_rejection_px: DEFAULT_PALM_REJECTION_PX,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            min_players: DEFAULT_MIN_PLAYERS,
            max_players: DEFAULT_MAX_PLAYERS,
            notice_capacity: DEFAULT_NOTICE_CAPACITY,
        }
    }
}

impl PickerConfig {
    /// Full auto-select delay.
    #[must_use]
    pub const fn auto_select_delay(&self) -> Duration {
        Duration::from_millis(self.auto_select_delay_ms)
    }

    /// Delay from the last change until anticipation starts.
    ///
    /// Saturates at zero when the anticipation phase is longer than the
    /// full delay.
    #[must_use]
    pub const fn anticipation_start(&self) -> Duration {
        Duration::from_millis(
            self.auto_select_delay_ms
                .saturating_sub(self.anticipation_ms),
        )
    }

    /// Highlight cycle step.
    #[must_use]
    pub const fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    /// Effective contact limit for a device reporting `device_max_touch_points`.
    ///
    /// Devices that report nothing, or zero, get the ceiling.
    #[must_use]
    pub fn max_contacts(&self, device_max_touch_points: Option<u32>) -> usize {
        match device_max_touch_points {
            Some(points) if points > 0 => {
                (points as usize).min(self.max_contacts_ceiling)
            }
            _ => self.max_contacts_ceiling,
        }
    }

    /// Check that the values describe a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_select_delay_ms == 0 {
            return Err(ConfigError::Invalid("auto_select_delay_ms must be > 0"));
        }
        if self.cycle_interval_ms == 0 {
            return Err(ConfigError::Invalid("cycle_interval_ms must be > 0"));
        }
        if self.max_contacts_ceiling < 2 {
            return Err(ConfigError::Invalid("max_contacts_ceiling must be >= 2"));
        }
        if !(self.palm_rejection_px.is_finite() && self.palm_rejection_px > 0.0) {
            return Err(ConfigError::Invalid(
                "palm_rejection_px must be a positive number",
            ));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty"));
        }
        if self.min_players < 2 || self.min_players > self.max_players {
            return Err(ConfigError::Invalid(
                "player bounds must satisfy 2 <= min_players <= max_players",
            ));
        }
        if self.notice_capacity == 0 {
            return Err(ConfigError::Invalid("notice_capacity must be > 0"));
        }
        Ok(())
    }

    /// Load from a TOML string and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON string and validate.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of its usable range.
    Invalid(&'static str),
    /// TOML decode failure.
    Toml(String),
    /// JSON decode failure.
    Json(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
            Self::Toml(msg) => write!(f, "TOML parse error: {msg}"),
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
