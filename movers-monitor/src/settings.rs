//! User settings of the short horizon ranking and its alerts.
//!
//! Values are never rejected: anything out of range is clamped, anything missing or
//! unparseable falls back to the default.

use crate::store::{BlobStore, KEY_SETTINGS, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const DEFAULT_SHORT_LIMIT: usize = 10;
pub const DEFAULT_SHORT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_SHORT_SOUND: bool = true;

pub const SHORT_LIMIT_MIN: usize = 1;
pub const SHORT_LIMIT_MAX: usize = 50;
pub const SHORT_THRESHOLD_MIN: f64 = 0.1;
pub const SHORT_THRESHOLD_MAX: f64 = 100.0;

/// Look-back of the short horizon ranking, in minutes.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Deserialize, Serialize, derive_more::Display,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum ShortWindow {
    #[default]
    #[display("1m")]
    One,
    #[display("2m")]
    Two,
    #[display("5m")]
    Five,
}

impl ShortWindow {
    pub fn minutes(self) -> i64 {
        match self {
            ShortWindow::One => 1,
            ShortWindow::Two => 2,
            ShortWindow::Five => 5,
        }
    }

    pub fn from_minutes(minutes: i64) -> Option<Self> {
        match minutes {
            1 => Some(ShortWindow::One),
            2 => Some(ShortWindow::Two),
            5 => Some(ShortWindow::Five),
            _ => None,
        }
    }

    /// Any value outside `{1, 2, 5}` maps to the default window.
    pub fn clamp(minutes: i64) -> Self {
        Self::from_minutes(minutes).unwrap_or_default()
    }
}

impl From<ShortWindow> for u8 {
    fn from(window: ShortWindow) -> Self {
        window.minutes() as u8
    }
}

impl TryFrom<u8> for ShortWindow {
    type Error = String;

    fn try_from(minutes: u8) -> Result<Self, Self::Error> {
        Self::from_minutes(i64::from(minutes))
            .ok_or_else(|| format!("invalid short window: {minutes}"))
    }
}

pub fn clamp_limit(limit: i64) -> usize {
    limit.clamp(SHORT_LIMIT_MIN as i64, SHORT_LIMIT_MAX as i64) as usize
}

/// Clamp to `[0.1, 100]`. NaN falls back to the default.
pub fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        return DEFAULT_SHORT_THRESHOLD;
    }
    threshold.clamp(SHORT_THRESHOLD_MIN, SHORT_THRESHOLD_MAX)
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub short_window: ShortWindow,
    pub short_limit: usize,
    /// Alert threshold in percent.
    pub short_threshold: f64,
    pub short_sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            short_window: ShortWindow::default(),
            short_limit: DEFAULT_SHORT_LIMIT,
            short_threshold: DEFAULT_SHORT_THRESHOLD,
            short_sound: DEFAULT_SHORT_SOUND,
        }
    }
}

impl Settings {
    /// Alert threshold as a ratio comparable with a `pct_change`.
    pub fn threshold_ratio(&self) -> f64 {
        self.short_threshold / 100.0
    }

    /// Return a copy with the patch applied, every field clamped.
    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        Self {
            short_window: patch
                .window
                .map(ShortWindow::clamp)
                .unwrap_or(self.short_window),
            short_limit: patch.limit.map(clamp_limit).unwrap_or(self.short_limit),
            short_threshold: patch
                .threshold
                .map(clamp_threshold)
                .unwrap_or(self.short_threshold),
            short_sound: patch.sound.unwrap_or(self.short_sound),
        }
    }

    /// Normalise an arbitrary persisted JSON value.
    ///
    /// A field that is missing, non-numeric or zero takes its default before clamping.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let number_or = |key: &str, default: f64| {
            object
                .get(key)
                .and_then(coerce_number)
                .filter(|number| *number != 0.0)
                .unwrap_or(default)
        };

        Self {
            short_window: Some(number_or("shortWindow", ShortWindow::default().minutes() as f64))
                .filter(|minutes| minutes.fract() == 0.0)
                .map(|minutes| ShortWindow::clamp(minutes as i64))
                .unwrap_or_default(),
            short_limit: clamp_limit(number_or("shortLimit", DEFAULT_SHORT_LIMIT as f64) as i64),
            short_threshold: clamp_threshold(number_or(
                "shortThreshold",
                DEFAULT_SHORT_THRESHOLD,
            )),
            short_sound: object
                .get("shortSound")
                .map(normalise_sound)
                .unwrap_or(DEFAULT_SHORT_SOUND),
        }
    }

    /// Load the persisted settings, defaults if absent or malformed.
    pub fn load(store: &dyn BlobStore) -> Self {
        let Some(blob) = store.get(KEY_SETTINGS) else {
            return Self::default();
        };

        match serde_json::from_str::<Value>(&blob) {
            Ok(value) => Self::from_value(&value),
            Err(error) => {
                warn!(%error, "failed to load persisted settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn BlobStore) -> Result<(), StoreError> {
        let blob = serde_json::to_string(self)?;
        store.set(KEY_SETTINGS, &blob)
    }
}

/// Partial settings update, eg/ from one user command. Fields are clamped when applied.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SettingsPatch {
    pub window: Option<i64>,
    pub limit: Option<i64>,
    pub threshold: Option<f64>,
    pub sound: Option<bool>,
}

impl SettingsPatch {
    pub fn window(minutes: i64) -> Self {
        Self {
            window: Some(minutes),
            ..Default::default()
        }
    }

    pub fn limit(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn threshold(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
            ..Default::default()
        }
    }

    pub fn sound(enabled: bool) -> Self {
        Self {
            sound: Some(enabled),
            ..Default::default()
        }
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(f64::from(u8::from(*flag))),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn normalise_sound(value: &Value) -> bool {
    match value {
        Value::Bool(enabled) => *enabled,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !matches!(
            text.to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        ),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}
