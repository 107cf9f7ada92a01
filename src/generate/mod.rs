/// Note generator - fills the grid with short melodic ideas
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use crate::config::EditorConfig;
use crate::error::GenerationError;
use crate::roll::{Note, NoteSource, Pitch, PitchClass};

pub const IDEA_COUNT_RANGE: RangeInclusive<u32> = 1..=3;
pub const NOTE_COUNT_RANGE: RangeInclusive<u32> = 10..=100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub idea_count: u32,
    pub note_count: u32,
    pub beginner_mode: bool,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), GenerationError> {
        check_range("idea count", self.idea_count, &IDEA_COUNT_RANGE)?;
        check_range("note count", self.note_count, &NOTE_COUNT_RANGE)
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            idea_count: 1,
            note_count: 10,
            beginner_mode: false,
        }
    }
}

fn check_range(
    name: &'static str,
    value: u32,
    range: &RangeInclusive<u32>,
) -> Result<(), GenerationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(GenerationError::InvalidParameterRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Scale and rhythm vocabulary for one mode.
struct Palette {
    scale: Vec<Pitch>,
    /// Candidate slot lengths in beats, longest first.
    units: &'static [f32],
    max_step: i32,
}

impl Palette {
    fn for_mode(beginner_mode: bool) -> Self {
        if beginner_mode {
            Self {
                scale: scale_between(
                    &[0, 2, 4, 5, 7, 9, 11],
                    Pitch { class: PitchClass::C, octave: 4 },
                    Pitch { class: PitchClass::C, octave: 5 },
                ),
                units: &[1.0, 0.5, 0.25, 0.125],
                max_step: 1,
            }
        } else {
            Self {
                scale: scale_between(
                    &[9, 0, 2, 4, 7],
                    Pitch { class: PitchClass::A, octave: 3 },
                    Pitch { class: PitchClass::A, octave: 5 },
                ),
                units: &[0.5, 0.25, 0.125],
                max_step: 2,
            }
        }
    }
}

/// Every pitch from `low` to `high` whose class is in `classes`.
fn scale_between(classes: &[usize], low: Pitch, high: Pitch) -> Vec<Pitch> {
    let mut pitches = Vec::new();
    let mut pitch = Some(low);
    while let Some(current) = pitch {
        if classes.contains(&current.class.index()) {
            pitches.push(current);
        }
        if current == high {
            break;
        }
        pitch = current.transpose(1);
    }
    pitches
}

pub struct Generator {
    rng: Pcg32,
    length_beats: f32,
    beats_per_measure: f32,
    timeout: Duration,
}

impl Generator {
    pub fn new(config: &EditorConfig, seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            length_beats: config.length_beats,
            beats_per_measure: config.beats_per_measure.max(1) as f32,
            timeout: config.generation_timeout(),
        }
    }

    pub fn from_entropy(config: &EditorConfig) -> Self {
        Self::new(config, rand::random())
    }

    /// Lays the ideas out one after another, each on whole measures.
    pub fn generate(&mut self, request: GenerationRequest) -> Result<Vec<Note>, GenerationError> {
        request.validate()?;
        let started = Instant::now();

        let palette = Palette::for_mode(request.beginner_mode);
        let span = self.idea_span(request.idea_count);
        let ideas = request.idea_count as usize;
        let per_idea = request.note_count as usize / ideas;
        let remainder = request.note_count as usize % ideas;

        let mut notes = Vec::with_capacity(request.note_count as usize);
        for idea in 0..ideas {
            if started.elapsed() >= self.timeout {
                return Err(GenerationError::GenerationTimeout {
                    budget_ms: self.timeout.as_millis() as u64,
                    ideas_done: idea,
                });
            }
            let count = per_idea + usize::from(idea < remainder);
            let offset = idea as f32 * span;
            notes.extend(self.idea(&palette, offset, span, count));
        }

        info!(
            "Generated {} note(s) in {} idea(s)",
            notes.len(),
            request.idea_count
        );
        Ok(notes)
    }

    fn idea_span(&self, idea_count: u32) -> f32 {
        let measures = (self.length_beats / self.beats_per_measure / idea_count as f32).floor();
        measures.max(1.0) * self.beats_per_measure
    }

    fn idea(&mut self, palette: &Palette, offset: f32, span: f32, count: usize) -> Vec<Note> {
        let unit = palette
            .units
            .iter()
            .copied()
            .find(|unit| (span / unit) as usize >= count)
            .unwrap_or(palette.units[palette.units.len() - 1]);
        let slot_count = (span / unit) as usize;

        // Distinct onsets for the melody; overflow becomes chord tones.
        let melody_len = count.min(slot_count);
        let mut slots: Vec<usize> = (0..slot_count).collect();
        slots.shuffle(&mut self.rng);
        slots.truncate(melody_len);
        slots.sort_unstable();
        if let Some(first) = slots.first_mut() {
            *first = 0;
        }

        let mut degree = self.rng.gen_range(0..palette.scale.len());
        let mut melody = Vec::with_capacity(melody_len);
        for (ix, &slot) in slots.iter().enumerate() {
            let next_slot = slots.get(ix + 1).copied().unwrap_or(slot_count);
            let length = ((next_slot - slot) as f32 * unit).min(1.0).max(unit);

            let step = self.rng.gen_range(-palette.max_step..=palette.max_step);
            degree = reflect(degree as i32 + step, palette.scale.len());

            melody.push((slot, degree, length));
        }

        let mut notes: Vec<Note> = melody
            .iter()
            .map(|&(slot, degree, length)| {
                Note::new(
                    palette.scale[degree],
                    offset + slot as f32 * unit,
                    length,
                    NoteSource::Generated,
                )
            })
            .collect();

        for _ in melody_len..count {
            let &(slot, degree, length) = &melody[self.rng.gen_range(0..melody.len())];
            let chord_degree = (degree + 2).min(palette.scale.len() - 1);
            notes.push(Note::new(
                palette.scale[chord_degree],
                offset + slot as f32 * unit,
                length,
                NoteSource::Generated,
            ));
        }

        debug!(
            "Idea at beat {}: {} note(s), {} beat slots",
            offset, count, unit
        );
        notes
    }
}

/// Folds an out-of-range scale degree back inside `0..len`.
fn reflect(degree: i32, len: usize) -> usize {
    let max = len as i32 - 1;
    if degree < 0 {
        (-degree).min(max) as usize
    } else if degree > max {
        (2 * max - degree).max(0) as usize
    } else {
        degree as usize
    }
}
