/// Editor settings with built-in defaults, optionally overridden from YAML
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::roll::SnapUnit;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Width of one measure at zoom 1.
    pub measure_width_px: f32,
    pub beats_per_measure: u32,
    pub row_height_px: f32,
    /// Length of the grid, and of a playback pass, in beats.
    pub length_beats: f32,
    pub zoom: f32,
    pub snap: SnapUnit,
    pub tick_interval_ms: u64,
    /// How far the playhead moves on each tick.
    pub tick_beats: f32,
    pub tone_gain: f32,
    pub tone_floor: f32,
    pub tone_release_secs: f32,
    pub generation_timeout_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            measure_width_px: 400.0,
            beats_per_measure: 4,
            row_height_px: 20.0,
            length_beats: 16.0,
            zoom: 1.0,
            snap: SnapUnit::Sixteenth,
            tick_interval_ms: 50,
            tick_beats: 0.125,
            tone_gain: 0.3,
            tone_floor: 0.01,
            tone_release_secs: 0.5,
            generation_timeout_ms: 2000,
        }
    }
}

impl EditorConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would break the grid geometry or stall the transport.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("measure_width_px", self.measure_width_px)?;
        positive("row_height_px", self.row_height_px)?;
        positive("length_beats", self.length_beats)?;
        positive("zoom", self.zoom)?;
        positive("tick_beats", self.tick_beats)?;
        positive("tone_gain", self.tone_gain)?;
        positive("tone_floor", self.tone_floor)?;
        positive("tone_release_secs", self.tone_release_secs)?;
        if self.beats_per_measure == 0 {
            return Err(invalid("beats_per_measure", "must be at least 1"));
        }
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be at least 1"));
        }
        if self.tone_floor >= self.tone_gain {
            return Err(invalid("tone_floor", "must be below tone_gain"));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&source)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Transport tempo implied by the tick cadence.
    pub fn tempo_bpm(&self) -> f32 {
        let seconds_per_beat = self.tick_interval().as_secs_f32() / self.tick_beats;
        60.0 / seconds_per_beat
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
