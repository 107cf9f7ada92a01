/// Pitch classes, octaves and the row layout of the piano roll
use std::fmt;

pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 8;
pub const OCTAVE_COUNT: usize = (MAX_OCTAVE - MIN_OCTAVE + 1) as usize;
pub const PITCH_CLASS_COUNT: usize = 12;
/// Total number of rows on the grid, one per semitone from C0 to B8.
pub const ROW_COUNT: usize = OCTAVE_COUNT * PITCH_CLASS_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Ascending from C.
    pub const ALL: [PitchClass; PITCH_CLASS_COUNT] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    pub fn is_sharp(self) -> bool {
        matches!(
            self,
            PitchClass::CSharp
                | PitchClass::DSharp
                | PitchClass::FSharp
                | PitchClass::GSharp
                | PitchClass::ASharp
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i32,
}

impl Pitch {
    pub const A4: Pitch = Pitch {
        class: PitchClass::A,
        octave: 4,
    };

    pub fn new(class: PitchClass, octave: i32) -> Option<Self> {
        (MIN_OCTAVE..=MAX_OCTAVE)
            .contains(&octave)
            .then_some(Self { class, octave })
    }

    /// Row 0 is the highest pitch (B8); octaves run from high to low and
    /// pitch classes descend within each octave.
    pub fn from_row(row: usize) -> Option<Self> {
        if row >= ROW_COUNT {
            return None;
        }
        let octave = MAX_OCTAVE - (row / PITCH_CLASS_COUNT) as i32;
        let class = PitchClass::from_index(PITCH_CLASS_COUNT - 1 - row % PITCH_CLASS_COUNT)?;
        Some(Self { class, octave })
    }

    pub fn row(self) -> usize {
        let octave_index = (MAX_OCTAVE - self.octave) as usize;
        octave_index * PITCH_CLASS_COUNT + (PITCH_CLASS_COUNT - 1 - self.class.index())
    }

    /// Signed distance in semitones from A4.
    pub fn semitones_from_a4(self) -> i32 {
        (self.octave - 4) * 12 + self.class.index() as i32 - PitchClass::A.index() as i32
    }

    /// Equal-tempered frequency referenced to A4 = 440Hz.
    ///
    /// The octave factor is applied as an exact power of two so that raising
    /// the octave doubles the frequency bit-for-bit.
    pub fn frequency(self) -> f32 {
        let class_offset = self.class.index() as f32 - PitchClass::A.index() as f32;
        440.0 * 2.0_f32.powi(self.octave - 4) * 2.0_f32.powf(class_offset / 12.0)
    }

    /// Moves by `semitones`, `None` when leaving the C0..B8 range.
    pub fn transpose(self, semitones: i32) -> Option<Self> {
        let absolute = self.octave * 12 + self.class.index() as i32 + semitones;
        let octave = absolute.div_euclid(12);
        let class = PitchClass::from_index(absolute.rem_euclid(12) as usize)?;
        Self::new(class, octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class.name(), self.octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_zero_is_highest_pitch() {
        let top = Pitch::from_row(0).unwrap();
        assert_eq!(top.class, PitchClass::B);
        assert_eq!(top.octave, 8);

        let bottom = Pitch::from_row(ROW_COUNT - 1).unwrap();
        assert_eq!(bottom.class, PitchClass::C);
        assert_eq!(bottom.octave, 0);

        assert!(Pitch::from_row(ROW_COUNT).is_none());
    }

    #[test]
    fn test_row_round_trips_through_pitch() {
        for row in 0..ROW_COUNT {
            assert_eq!(Pitch::from_row(row).unwrap().row(), row);
        }
    }

    #[test]
    fn test_a4_is_440() {
        assert_eq!(Pitch::A4.frequency(), 440.0);
        assert_eq!(Pitch::A4.semitones_from_a4(), 0);
    }

    #[test]
    fn test_octave_doubles_frequency() {
        for class in PitchClass::ALL {
            for octave in MIN_OCTAVE..MAX_OCTAVE {
                let low = Pitch::new(class, octave).unwrap();
                let high = Pitch::new(class, octave + 1).unwrap();
                assert_eq!(high.frequency(), low.frequency() * 2.0);
            }
        }
    }

    #[test]
    fn test_frequency_increases_with_semitones() {
        let mut previous = 0.0;
        for row in (0..ROW_COUNT).rev() {
            let frequency = Pitch::from_row(row).unwrap().frequency();
            assert!(frequency > previous);
            previous = frequency;
        }
    }

    #[test]
    fn test_transpose_crosses_octaves() {
        let b3 = Pitch::new(PitchClass::B, 3).unwrap();
        assert_eq!(b3.transpose(1), Pitch::new(PitchClass::C, 4));
        assert_eq!(b3.transpose(-11), Pitch::new(PitchClass::C, 3));
        assert!(Pitch::new(PitchClass::B, 8).unwrap().transpose(1).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Pitch::new(PitchClass::FSharp, 2).unwrap().to_string(), "F#2");
    }
}
