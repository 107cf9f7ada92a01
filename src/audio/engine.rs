/// Audio output using cpal
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use std::sync::{Arc, Mutex};

use super::{AudioBackend, Tone, ToneSink, Voice};
use crate::error::AudioError;

/// Opens the default output device of the default host.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    type Sink = AudioEngine;

    fn open(&mut self) -> Result<AudioEngine, AudioError> {
        AudioEngine::new()
    }
}

/// Owned handle to a running output stream. Dropping it closes the stream.
pub struct AudioEngine {
    _stream: cpal::Stream,
    voices: Arc<Mutex<Vec<Voice>>>,
    sample_rate: f32,
}

impl AudioEngine {
    pub fn new() -> Result<Self, AudioError> {
        let voices = Arc::new(Mutex::new(Vec::new()));
        let (stream, sample_rate) = Self::setup_audio_stream(Arc::clone(&voices))?;
        info!("Audio engine opened at {} Hz", sample_rate);

        Ok(Self {
            _stream: stream,
            voices,
            sample_rate,
        })
    }

    fn setup_audio_stream(
        voices: Arc<Mutex<Vec<Voice>>>,
    ) -> Result<(cpal::Stream, f32), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render(data, channels, &voices);
                },
                |err| warn!("Audio stream error: {}", err),
                None,
            ),
            other => return Err(AudioError::UnsupportedSampleFormat(format!("{:?}", other))),
        }
        .map_err(|e| AudioError::BuildStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))?;
        Ok((stream, sample_rate))
    }

}

impl ToneSink for AudioEngine {
    fn play(&mut self, tone: Tone) {
        let voice = Voice::new(tone.frequency, tone.envelope, self.sample_rate);
        match self.voices.lock() {
            Ok(mut voices) => voices.push(voice),
            Err(_) => warn!("Voice list poisoned, dropping tone at {} Hz", tone.frequency),
        }
    }
}

/// Mixes every live voice into each frame and drops finished ones.
fn render(data: &mut [f32], channels: usize, voices: &Mutex<Vec<Voice>>) {
    let Ok(mut voices) = voices.lock() else {
        data.fill(0.0);
        return;
    };

    for frame in data.chunks_mut(channels.max(1)) {
        let sample: f32 = voices.iter_mut().map(Voice::next_sample).sum();
        frame.fill(sample);
    }
    voices.retain(|voice| !voice.is_finished());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Envelope;

    #[test]
    fn test_render_mixes_and_retires_voices() {
        let envelope = Envelope {
            peak: 0.3,
            floor: 0.01,
            release: 0.002,
        };
        let voices = Mutex::new(vec![
            Voice::new(250.0, envelope, 1000.0),
            Voice::new(250.0, envelope, 1000.0),
        ]);

        // Two frames of stereo: both voices finish after two samples.
        let mut data = [1.0; 4];
        render(&mut data, 2, &voices);

        assert_eq!(data[0], 0.0);
        assert_eq!(data[0], data[1]);
        assert!(data[2] > 0.0);
        assert_eq!(data[2], data[3]);
        assert!(voices.lock().unwrap().is_empty());
    }
}
