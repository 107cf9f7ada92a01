/// Sine voices with a fixed exponential release
use std::f32::consts::TAU;

/// Instant attack to `peak`, then an exponential fall to `floor` over
/// `release` seconds. Silent afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub peak: f32,
    pub floor: f32,
    pub release: f32,
}

impl Envelope {
    pub fn level_at(&self, seconds: f32) -> f32 {
        if seconds < 0.0 || seconds >= self.release {
            return 0.0;
        }
        self.peak * (self.floor / self.peak).powf(seconds / self.release)
    }

    pub fn is_finished(&self, seconds: f32) -> bool {
        seconds >= self.release
    }
}

/// One triggered tone, rendered sample by sample.
#[derive(Debug, Clone)]
pub struct Voice {
    frequency: f32,
    envelope: Envelope,
    sample_rate: f32,
    phase: f32,
    elapsed_samples: u64,
}

impl Voice {
    pub fn new(frequency: f32, envelope: Envelope, sample_rate: f32) -> Self {
        Self {
            frequency,
            envelope,
            sample_rate,
            phase: 0.0,
            elapsed_samples: 0,
        }
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_samples as f32 / self.sample_rate
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished(self.elapsed_secs())
    }

    pub fn next_sample(&mut self) -> f32 {
        let level = self.envelope.level_at(self.elapsed_secs());
        let sample = (self.phase * TAU).sin() * level;

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.elapsed_samples += 1;
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: Envelope = Envelope {
        peak: 0.3,
        floor: 0.01,
        release: 0.5,
    };

    #[test]
    fn test_envelope_starts_at_peak() {
        assert_eq!(ENVELOPE.level_at(0.0), 0.3);
    }

    #[test]
    fn test_envelope_decays_towards_floor() {
        let near_end = ENVELOPE.level_at(0.4999);
        assert!((near_end - 0.01).abs() < 1e-3);
        assert!(ENVELOPE.level_at(0.1) > ENVELOPE.level_at(0.2));
        assert_eq!(ENVELOPE.level_at(0.5), 0.0);
        assert!(ENVELOPE.is_finished(0.5));
    }

    #[test]
    fn test_voice_finishes_after_release() {
        let sample_rate = 1000.0;
        let mut voice = Voice::new(440.0, ENVELOPE, sample_rate);
        let mut rendered = 0;
        while !voice.is_finished() {
            let sample = voice.next_sample();
            assert!(sample.abs() <= 0.3);
            rendered += 1;
        }
        assert_eq!(rendered, 500);
    }
}
