/// Pure coordinate transforms between pointer pixels and musical units.
/// Nothing here touches the note collection.
use serde::Deserialize;

use super::pitch::{Pitch, ROW_COUNT};
use crate::config::EditorConfig;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SnapUnit {
    #[serde(rename = "1/1")]
    Whole,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/4")]
    Quarter,
    #[serde(rename = "1/8")]
    Eighth,
    #[default]
    #[serde(rename = "1/16")]
    Sixteenth,
    #[serde(rename = "1/32")]
    ThirtySecond,
}

impl SnapUnit {
    pub const ALL: [SnapUnit; 6] = [
        SnapUnit::Whole,
        SnapUnit::Half,
        SnapUnit::Quarter,
        SnapUnit::Eighth,
        SnapUnit::Sixteenth,
        SnapUnit::ThirtySecond,
    ];

    /// Length of the unit in beats (quarter notes).
    pub fn beats(self) -> f32 {
        match self {
            SnapUnit::Whole => 4.0,
            SnapUnit::Half => 2.0,
            SnapUnit::Quarter => 1.0,
            SnapUnit::Eighth => 0.5,
            SnapUnit::Sixteenth => 0.25,
            SnapUnit::ThirtySecond => 0.125,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SnapUnit::Whole => "1/1",
            SnapUnit::Half => "1/2",
            SnapUnit::Quarter => "1/4",
            SnapUnit::Eighth => "1/8",
            SnapUnit::Sixteenth => "1/16",
            SnapUnit::ThirtySecond => "1/32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    zoom: f32,
    snap: SnapUnit,
    measure_width_px: f32,
    beats_per_measure: u32,
    row_height_px: f32,
    length_beats: f32,
}

impl GridConfig {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            zoom: config.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            snap: config.snap,
            measure_width_px: config.measure_width_px,
            beats_per_measure: config.beats_per_measure.max(1),
            row_height_px: config.row_height_px,
            length_beats: config.length_beats,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Returns the zoom actually applied.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom
    }

    pub fn snap(&self) -> SnapUnit {
        self.snap
    }

    pub fn set_snap(&mut self, snap: SnapUnit) {
        self.snap = snap;
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    pub fn row_height_px(&self) -> f32 {
        self.row_height_px
    }

    pub fn length_beats(&self) -> f32 {
        self.length_beats
    }

    pub fn measure_width_px(&self) -> f32 {
        self.measure_width_px * self.zoom
    }

    pub fn beat_width_px(&self) -> f32 {
        self.measure_width_px() / self.beats_per_measure as f32
    }

    /// Width of one snap unit in pixels at the current zoom.
    pub fn step_px(&self) -> f32 {
        self.beat_width_px() * self.snap.beats()
    }

    pub fn width_px(&self) -> f32 {
        self.beats_to_px(self.length_beats)
    }

    pub fn height_px(&self) -> f32 {
        ROW_COUNT as f32 * self.row_height_px
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..self.width_px()).contains(&x) && (0.0..self.height_px()).contains(&y)
    }

    /// Quantizes a pixel position to the nearest snap step.
    pub fn snap_px(&self, x: f32) -> f32 {
        let step = self.step_px();
        (x / step).round() * step
    }

    pub fn px_to_beats(&self, x: f32) -> f32 {
        x / self.beat_width_px()
    }

    pub fn beats_to_px(&self, beats: f32) -> f32 {
        beats * self.beat_width_px()
    }

    /// Snapped pixel position expressed in beats, as a whole number of snap units.
    pub fn snapped_beats(&self, x: f32) -> f32 {
        let units = (x / self.step_px()).round();
        units * self.snap.beats()
    }

    pub fn row_at(&self, y: f32) -> Option<usize> {
        if y < 0.0 {
            return None;
        }
        let row = (y / self.row_height_px).floor() as usize;
        (row < ROW_COUNT).then_some(row)
    }

    pub fn pitch_at(&self, y: f32) -> Option<Pitch> {
        self.row_at(y).and_then(Pitch::from_row)
    }

    pub fn row_top_px(&self, row: usize) -> f32 {
        row as f32 * self.row_height_px
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}
