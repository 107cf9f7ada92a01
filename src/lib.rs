/// pianoroll - a piano-roll note editor library
///
/// This library provides the core components of the editor:
/// - Grid model mapping pointer positions to pitches and snapped beats
/// - Playback scheduler driving a virtual transport over the notes
/// - Audio output through an owned engine handle
/// - MIDI device input and MIDI file import/export
/// - Note generation

pub mod audio;
pub mod config;
pub mod error;
pub mod generate;
pub mod midi;
pub mod playback;
pub mod roll;

// Re-export commonly used types
pub use audio::{AudioBackend, AudioEngine, CpalBackend, Tone, ToneSink};
pub use config::EditorConfig;
pub use error::{AudioError, ConfigError, ConnectionError, FileError, GenerationError};
pub use generate::{GenerationRequest, Generator};
pub use midi::{midi_note_name, DeviceEvent, DeviceHandle, MidiDeviceConnector};
pub use playback::{PlaybackEvent, PlaybackScheduler, PlaybackState, TickClock};
pub use roll::{GridConfig, GridModel, Note, NoteId, NoteSource, Pitch, PitchClass, SnapUnit};
