// Engine configuration
// Loaded from RON; every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest onset distance still grouped into one chord
pub const MAX_CHORD_EPSILON_SECONDS: f64 = 1e-4;

/// Smallest nudge used to keep onsets strictly increasing
pub const MIN_INCREMENT_SECONDS: f64 = 1e-5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Live scheduling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Onsets closer than this are dispatched as one chord (at most 1e-4 s)
    pub chord_epsilon_seconds: f64,
    /// Forward nudge for non-increasing onsets (at least 1e-5 s)
    pub min_increment_seconds: f64,
    /// Floor applied to dispatched note durations
    pub min_audible_seconds: f64,
}

impl SchedulerSettings {
    /// Bring out-of-range values back into their allowed ranges
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let pick = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        Self {
            chord_epsilon_seconds: pick(self.chord_epsilon_seconds, defaults.chord_epsilon_seconds)
                .clamp(0.0, MAX_CHORD_EPSILON_SECONDS),
            min_increment_seconds: pick(self.min_increment_seconds, defaults.min_increment_seconds)
                .max(MIN_INCREMENT_SECONDS),
            min_audible_seconds: pick(self.min_audible_seconds, defaults.min_audible_seconds).max(0.0),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            chord_epsilon_seconds: MAX_CHORD_EPSILON_SECONDS,
            min_increment_seconds: MIN_INCREMENT_SECONDS,
            min_audible_seconds: 0.01,
        }
    }
}

/// MIDI file export parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Directory exported files are written to
    pub output_dir: PathBuf,
    /// File extension, without the dot
    pub extension: String,
    /// Resolution written to the file header
    pub ticks_per_quarter: u16,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            extension: "mid".to_string(),
            ticks_per_quarter: crate::sequencer::timeline::TICKS_PER_QUARTER as u16,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerSettings,
    pub export: ExportSettings,
}

impl EngineConfig {
    /// Parse a RON document; scheduler values are sanitized
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = ron::from_str(text)?;
        config.scheduler = config.scheduler.sanitized();
        if config.export.ticks_per_quarter == 0 {
            config.export.ticks_per_quarter = ExportSettings::default().ticks_per_quarter;
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn to_ron_string(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).unwrap_or_default()
    }
}
