/// Piano-roll grid model - owns the placed notes and turns pointer
/// interactions into create/resize/erase operations
use log::debug;

pub mod geometry;
pub mod pitch;

pub use geometry::{GridConfig, SnapUnit};
pub use pitch::{Pitch, PitchClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(pub u64);

/// Where a note came from. Export can be limited to generated notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSource {
    Human,
    Generated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub pitch: Pitch,
    pub start_beat: f32,
    pub duration_beats: f32,
    pub source: NoteSource,
}

impl Note {
    pub fn new(pitch: Pitch, start_beat: f32, duration_beats: f32, source: NoteSource) -> Self {
        Self {
            id: NoteId(0),
            pitch,
            start_beat,
            duration_beats,
            source,
        }
    }

    pub fn end_beat(&self) -> f32 {
        self.start_beat + self.duration_beats
    }
}

/// Pixel rectangle of a note at the current zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NoteRect {
    /// Edges are inclusive.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

pub struct GridModel {
    config: GridConfig,
    notes: Vec<Note>,
    active: Option<NoteId>,
    next_id: u64,
    revision: u64,
}

impl GridModel {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            notes: Vec::new(),
            active: None,
            next_id: 1,
            revision: 0,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Notes in insertion order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Bumped by every change to the note collection.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn active_note(&self) -> Option<NoteId> {
        self.active
    }

    pub fn is_resizing(&self) -> bool {
        self.active.is_some()
    }

    pub fn note_rect(&self, note: &Note) -> NoteRect {
        NoteRect {
            x: self.config.beats_to_px(note.start_beat),
            y: self.config.row_top_px(note.pitch.row()),
            width: self.config.beats_to_px(note.duration_beats),
            height: self.config.row_height_px(),
        }
    }

    /// Places a note of one snap unit under the pointer and makes it the
    /// active note. Pointer positions outside the grid are ignored.
    ///
    /// The start is the pointer snapped to the nearest unit. If that rounds
    /// to the grid end (`x` within half a unit of the right edge), the note
    /// starts one unit earlier instead, so it always ends inside the grid.
    pub fn create(&mut self, x: f32, y: f32) -> Option<NoteId> {
        if !self.config.contains(x, y) {
            return None;
        }
        let pitch = self.config.pitch_at(y)?;
        let unit = self.config.snap().beats();
        let mut start_beat = self.config.snapped_beats(x);
        // Rounding up at the right edge would place the note past the end.
        if start_beat >= self.config.length_beats() {
            start_beat -= unit;
        }

        let id = self.push(Note::new(pitch, start_beat.max(0.0), unit, NoteSource::Human));
        self.active = Some(id);
        debug!("Created note {:?} {} at beat {}", id, pitch, start_beat);
        Some(id)
    }

    /// Stretches the active note to the pointer, never below one snap unit.
    pub fn resize(&mut self, x: f32) -> Option<f32> {
        let id = self.active?;
        let config = self.config;
        let note = self.notes.iter_mut().find(|note| note.id == id)?;

        let offset_px = x - config.beats_to_px(note.start_beat);
        let duration = config.snapped_beats(offset_px).max(config.snap().beats());
        if duration != note.duration_beats {
            note.duration_beats = duration;
            self.revision += 1;
        }
        Some(duration)
    }

    pub fn end_resize(&mut self) {
        self.active = None;
    }

    /// Removes every note whose rectangle contains the point.
    pub fn erase(&mut self, x: f32, y: f32) -> usize {
        let before = self.notes.len();
        let config = self.config;
        self.notes.retain(|note| {
            let rect = NoteRect {
                x: config.beats_to_px(note.start_beat),
                y: config.row_top_px(note.pitch.row()),
                width: config.beats_to_px(note.duration_beats),
                height: config.row_height_px(),
            };
            !rect.contains(x, y)
        });

        let removed = before - self.notes.len();
        if removed > 0 {
            if let Some(active) = self.active {
                if self.note(active).is_none() {
                    self.active = None;
                }
            }
            self.revision += 1;
            debug!("Erased {} note(s) at ({}, {})", removed, x, y);
        }
        removed
    }

    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.config.set_zoom(zoom)
    }

    pub fn adjust_zoom(&mut self, delta: f32) -> f32 {
        self.set_zoom(self.config.zoom() + delta)
    }

    pub fn set_snap(&mut self, snap: SnapUnit) {
        self.config.set_snap(snap);
    }

    /// Appends externally produced notes, assigning fresh ids.
    pub fn add_notes(&mut self, notes: impl IntoIterator<Item = Note>) -> usize {
        let before = self.notes.len();
        for note in notes {
            self.push(note);
        }
        self.notes.len() - before
    }

    pub fn clear(&mut self) {
        if !self.notes.is_empty() {
            self.notes.clear();
            self.revision += 1;
        }
        self.active = None;
    }

    fn push(&mut self, mut note: Note) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        note.id = id;
        self.notes.push(note);
        self.revision += 1;
        id
    }
}

impl Default for GridModel {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}
