/// Audio output seam: the scheduler plays `Tone`s into a `ToneSink`
/// opened from an `AudioBackend`
use crate::error::AudioError;

pub mod engine;
pub mod voice;

pub use engine::{AudioEngine, CpalBackend};
pub use voice::{Envelope, Voice};

/// A fire-and-forget tone. Its length is fixed by the envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub envelope: Envelope,
}

pub trait ToneSink {
    fn play(&mut self, tone: Tone);
}

/// Opens the audio engine. Called lazily, at most once per open engine.
pub trait AudioBackend {
    type Sink: ToneSink;

    fn open(&mut self) -> Result<Self::Sink, AudioError>;
}
