/// MIDI device input and Standard MIDI File import/export
use crate::roll::{Pitch, PitchClass};

pub mod device;
pub mod file;

pub use device::{DeviceEvent, DeviceHandle, MidiDeviceConnector};
pub use file::{save, upload};

/// MIDI key number of a pitch (C4 = 60).
pub fn key_for(pitch: Pitch) -> u8 {
    ((pitch.octave + 1) * 12 + pitch.class.index() as i32) as u8
}

/// Pitch on the grid for a MIDI key, `None` outside C0..B8.
pub fn pitch_for_key(key: u8) -> Option<Pitch> {
    let octave = (key / 12) as i32 - 1;
    let class = PitchClass::from_index((key % 12) as usize)?;
    Pitch::new(class, octave)
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}
