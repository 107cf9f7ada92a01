/// Playback scheduler - drives the virtual transport and triggers tones
/// for notes whose onset the playhead reaches
use log::{debug, info, warn};

pub mod clock;
pub mod schedule;

pub use clock::TickClock;
pub use schedule::OnsetSchedule;

use crate::audio::{AudioBackend, Envelope, Tone, ToneSink};
use crate::config::EditorConfig;
use crate::error::AudioError;
use crate::roll::{GridConfig, GridModel, NoteId, Pitch};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    PlayheadMoved(f32),
    NoteTriggered {
        id: NoteId,
        pitch: Pitch,
        frequency: f32,
    },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub playhead_beats: f32,
}

impl PlaybackState {
    pub fn playhead_px(&self, config: &GridConfig) -> f32 {
        config.beats_to_px(self.playhead_beats)
    }
}

pub struct PlaybackScheduler<B: AudioBackend> {
    backend: B,
    engine: Option<B::Sink>,
    state: PlaybackState,
    schedule: OnsetSchedule,
    tick_beats: f32,
    envelope: Envelope,
}

impl<B: AudioBackend> PlaybackScheduler<B> {
    pub fn new(backend: B, config: &EditorConfig) -> Self {
        Self {
            backend,
            engine: None,
            state: PlaybackState::default(),
            schedule: OnsetSchedule::new(),
            tick_beats: config.tick_beats,
            envelope: Envelope {
                peak: config.tone_gain,
                floor: config.tone_floor,
                release: config.tone_release_secs,
            },
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Stopped -> Playing. Opens the audio engine on first use; if that
    /// fails playback stays stopped.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.state.is_playing {
            return Ok(());
        }
        self.ensure_engine()?;

        self.state = PlaybackState {
            is_playing: true,
            playhead_beats: 0.0,
        };
        self.schedule.invalidate();
        info!("Playback started");
        Ok(())
    }

    /// Playing -> Stopped. Tones already sounding decay on their own.
    pub fn stop(&mut self) {
        if self.state.is_playing {
            info!("Playback stopped at beat {}", self.state.playhead_beats);
        }
        self.state = PlaybackState::default();
    }

    pub fn toggle(&mut self) -> Result<(), AudioError> {
        if self.state.is_playing {
            self.stop();
            Ok(())
        } else {
            self.start()
        }
    }

    /// Advances the playhead by one tick and fires every onset in
    /// `(previous, next]`. The first tick of a pass also fires onsets at
    /// beat 0. Reaching the end stops playback without firing.
    pub fn tick(&mut self, grid: &GridModel) -> Vec<PlaybackEvent> {
        if !self.state.is_playing {
            return Vec::new();
        }

        let previous = self.state.playhead_beats;
        let next = previous + self.tick_beats;
        let length = grid.config().length_beats();

        if next >= length {
            self.stop();
            return vec![PlaybackEvent::Finished];
        }

        if self.schedule.is_stale(grid) {
            let fired_through = (previous > 0.0).then_some(previous);
            self.schedule.rebuild(grid, fired_through);
        }

        let mut events = Vec::new();
        for id in self.schedule.take_through(next) {
            let Some(note) = grid.note(id) else {
                continue;
            };
            if let Some(frequency) = self.play(note.pitch) {
                events.push(PlaybackEvent::NoteTriggered {
                    id,
                    pitch: note.pitch,
                    frequency,
                });
            }
        }

        self.state.playhead_beats = next;
        events.push(PlaybackEvent::PlayheadMoved(next));
        events
    }

    /// Sounds a single pitch outside of playback, opening the engine if needed.
    pub fn trigger_note(&mut self, pitch: Pitch) -> Result<f32, AudioError> {
        self.ensure_engine()?;
        Ok(self.play(pitch).unwrap_or_else(|| pitch.frequency()))
    }

    /// Stops playback and releases the audio engine.
    pub fn close(&mut self) {
        self.stop();
        if self.engine.take().is_some() {
            info!("Audio engine closed");
        }
    }

    fn ensure_engine(&mut self) -> Result<(), AudioError> {
        if self.engine.is_none() {
            let engine = self.backend.open().map_err(|e| {
                warn!("Audio unavailable: {}", e);
                e
            })?;
            self.engine = Some(engine);
        }
        Ok(())
    }

    fn play(&mut self, pitch: Pitch) -> Option<f32> {
        let engine = self.engine.as_mut()?;
        let frequency = pitch.frequency();
        engine.play(Tone {
            frequency,
            envelope: self.envelope,
        });
        debug!("Triggered {} at {:.2} Hz", pitch, frequency);
        Some(frequency)
    }
}

impl<B: AudioBackend> Drop for PlaybackScheduler<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::{Note, NoteSource, PitchClass};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder {
        opened: Rc<RefCell<usize>>,
        played: Rc<RefCell<Vec<Tone>>>,
    }

    struct RecordingSink {
        played: Rc<RefCell<Vec<Tone>>>,
    }

    impl ToneSink for RecordingSink {
        fn play(&mut self, tone: Tone) {
            self.played.borrow_mut().push(tone);
        }
    }

    impl AudioBackend for Recorder {
        type Sink = RecordingSink;

        fn open(&mut self) -> Result<RecordingSink, AudioError> {
            *self.opened.borrow_mut() += 1;
            Ok(RecordingSink {
                played: Rc::clone(&self.played),
            })
        }
    }

    struct Unavailable;

    impl AudioBackend for Unavailable {
        type Sink = RecordingSink;

        fn open(&mut self) -> Result<RecordingSink, AudioError> {
            Err(AudioError::NoOutputDevice)
        }
    }

    fn scheduler() -> (PlaybackScheduler<Recorder>, Recorder) {
        let recorder = Recorder::default();
        let scheduler = PlaybackScheduler::new(recorder.clone(), &EditorConfig::default());
        (scheduler, recorder)
    }

    fn triggered(events: &[PlaybackEvent]) -> Vec<NoteId> {
        events
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::NoteTriggered { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_ten_ticks_advance_playhead() {
        let grid = GridModel::default();
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();

        for _ in 0..10 {
            scheduler.tick(&grid);
        }

        let state = scheduler.state();
        assert!(state.is_playing);
        assert_eq!(state.playhead_px(grid.config()), 125.0);
    }

    #[test]
    fn test_playhead_is_monotonic_and_resets_at_end() {
        let grid = GridModel::default();
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();

        let mut previous = 0.0;
        let mut ticks = 0;
        loop {
            let events = scheduler.tick(&grid);
            ticks += 1;
            if events.contains(&PlaybackEvent::Finished) {
                break;
            }
            let playhead = scheduler.state().playhead_beats;
            assert!(playhead > previous);
            previous = playhead;
        }

        assert_eq!(ticks, 128);
        assert!(!scheduler.is_playing());
        assert_eq!(scheduler.state().playhead_beats, 0.0);
        assert!(scheduler.tick(&grid).is_empty());
    }

    #[test]
    fn test_each_onset_fires_once() {
        let mut grid = GridModel::default();
        let first = grid.create(0.0, 0.0).unwrap();
        grid.end_resize();
        let second = grid.create(100.0, 20.0).unwrap();
        grid.end_resize();

        let (mut scheduler, recorder) = scheduler();
        scheduler.start().unwrap();

        let mut fired = Vec::new();
        for _ in 0..127 {
            fired.extend(triggered(&scheduler.tick(&grid)));
        }

        assert_eq!(fired, vec![first, second]);
        assert_eq!(recorder.played.borrow().len(), 2);
    }

    #[test]
    fn test_note_fires_on_the_tick_that_reaches_it() {
        let mut grid = GridModel::default();
        let id = grid.create(100.0, 0.0).unwrap();
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();

        for _ in 0..7 {
            assert!(triggered(&scheduler.tick(&grid)).is_empty());
        }
        assert_eq!(triggered(&scheduler.tick(&grid)), vec![id]);
        assert_eq!(scheduler.state().playhead_px(grid.config()), 100.0);
    }

    #[test]
    fn test_note_at_beat_zero_fires_on_first_tick() {
        let mut grid = GridModel::default();
        let id = grid.create(0.0, 0.0).unwrap();
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();

        assert_eq!(triggered(&scheduler.tick(&grid)), vec![id]);
        assert!(triggered(&scheduler.tick(&grid)).is_empty());
    }

    #[test]
    fn test_simultaneous_onsets_follow_insertion_order() {
        let mut grid = GridModel::default();
        let high = grid.create(0.0, 0.0).unwrap();
        grid.end_resize();
        let low = grid.create(0.0, 400.0).unwrap();
        grid.end_resize();

        let (mut scheduler, recorder) = scheduler();
        scheduler.start().unwrap();

        assert_eq!(triggered(&scheduler.tick(&grid)), vec![high, low]);
        let played = recorder.played.borrow();
        assert!(played[0].frequency > played[1].frequency);
    }

    #[test]
    fn test_edits_during_playback_are_picked_up() {
        let mut grid = GridModel::default();
        let erased = grid.create(200.0, 0.0).unwrap();
        grid.end_resize();

        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();
        for _ in 0..4 {
            scheduler.tick(&grid);
        }

        grid.erase(210.0, 10.0);
        let added = grid.create(300.0, 0.0).unwrap();
        grid.end_resize();
        // Behind the playhead: never fires in this pass.
        grid.create(0.0, 40.0);
        grid.end_resize();

        let mut fired = Vec::new();
        for _ in 0..60 {
            fired.extend(triggered(&scheduler.tick(&grid)));
        }
        assert_eq!(fired, vec![added]);
        assert!(!fired.contains(&erased));
    }

    #[test]
    fn test_last_step_fires_then_end_only_finishes() {
        let mut grid = GridModel::default();
        grid.add_notes(vec![Note::new(Pitch::A4, 15.875, 0.125, NoteSource::Human)]);
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();

        for _ in 0..126 {
            assert!(triggered(&scheduler.tick(&grid)).is_empty());
        }
        assert_eq!(triggered(&scheduler.tick(&grid)).len(), 1);
        assert_eq!(scheduler.tick(&grid), vec![PlaybackEvent::Finished]);
        assert!(!scheduler.is_playing());
    }

    #[test]
    fn test_stop_is_idempotent_and_resets() {
        let grid = GridModel::default();
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();
        scheduler.tick(&grid);

        scheduler.stop();
        scheduler.stop();
        assert_eq!(scheduler.state(), PlaybackState::default());
    }

    #[test]
    fn test_start_while_playing_keeps_position() {
        let grid = GridModel::default();
        let (mut scheduler, _) = scheduler();
        scheduler.start().unwrap();
        scheduler.tick(&grid);
        scheduler.start().unwrap();
        assert_eq!(scheduler.state().playhead_beats, 0.125);
    }

    #[test]
    fn test_engine_is_opened_once() {
        let grid = GridModel::default();
        let (mut scheduler, recorder) = scheduler();

        scheduler.trigger_note(Pitch::A4).unwrap();
        scheduler.start().unwrap();
        scheduler.tick(&grid);
        scheduler.stop();
        scheduler.start().unwrap();

        assert_eq!(*recorder.opened.borrow(), 1);
    }

    #[test]
    fn test_close_releases_engine() {
        let (mut scheduler, recorder) = scheduler();
        scheduler.start().unwrap();
        scheduler.close();

        assert!(!scheduler.has_engine());
        assert!(!scheduler.is_playing());
        scheduler.start().unwrap();
        assert_eq!(*recorder.opened.borrow(), 2);
    }

    #[test]
    fn test_unavailable_audio_keeps_transport_stopped() {
        let grid = GridModel::default();
        let mut scheduler = PlaybackScheduler::new(Unavailable, &EditorConfig::default());

        assert!(matches!(scheduler.start(), Err(AudioError::NoOutputDevice)));
        assert!(!scheduler.is_playing());
        assert!(scheduler.tick(&grid).is_empty());
        assert!(scheduler.trigger_note(Pitch::A4).is_err());
    }

    #[test]
    fn test_trigger_a4() {
        let (mut scheduler, recorder) = scheduler();
        assert_eq!(scheduler.trigger_note(Pitch::A4).unwrap(), 440.0);

        let played = recorder.played.borrow();
        assert_eq!(played[0].frequency, 440.0);
        assert_eq!(played[0].envelope.peak, 0.3);
        assert_eq!(played[0].envelope.release, 0.5);
    }

    #[test]
    fn test_trigger_octave_up_doubles() {
        let (mut scheduler, _) = scheduler();
        let c4 = Pitch::new(PitchClass::C, 4).unwrap();
        let c5 = Pitch::new(PitchClass::C, 5).unwrap();
        let low = scheduler.trigger_note(c4).unwrap();
        let high = scheduler.trigger_note(c5).unwrap();
        assert_eq!(high, low * 2.0);
    }
}
