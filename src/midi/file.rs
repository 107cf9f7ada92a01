/// Standard MIDI File import/export using midly
use log::{info, warn};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use std::collections::HashMap;

use super::{key_for, pitch_for_key};
use crate::error::FileError;
use crate::roll::{Note, NoteSource};

pub const TICKS_PER_BEAT: u16 = 480;
const EXPORT_VELOCITY: u8 = 100;
/// Zero-length imported notes are widened to a 1/32 note.
const MIN_IMPORT_BEATS: f32 = 0.125;

/// Reads the note-on/note-off pairs of every track as grid notes.
pub fn upload(bytes: &[u8]) -> Result<Vec<Note>, FileError> {
    let smf = Smf::parse(bytes).map_err(|e| FileError::UnsupportedFileFormat(e.to_string()))?;
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) if tpb.as_int() > 0 => tpb.as_int() as f32,
        Timing::Metrical(_) => {
            return Err(FileError::UnsupportedFileFormat(
                "zero ticks per beat".to_string(),
            ))
        }
        Timing::Timecode(..) => {
            return Err(FileError::UnsupportedFileFormat(
                "timecode timing".to_string(),
            ))
        }
    };

    let mut notes = Vec::new();
    let mut skipped = 0;
    for track in &smf.tracks {
        let mut time: u32 = 0;
        let mut pending: HashMap<u8, u32> = HashMap::new();

        for event in track {
            time = time.checked_add(event.delta.as_int()).ok_or_else(|| {
                FileError::UnsupportedFileFormat("track longer than 2^32 ticks".to_string())
            })?;
            let TrackEventKind::Midi { message, .. } = event.kind else {
                continue;
            };
            let (key, is_on) = match message {
                MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int() > 0),
                MidiMessage::NoteOff { key, .. } => (key.as_int(), false),
                _ => continue,
            };

            if is_on {
                pending.entry(key).or_insert(time);
                continue;
            }
            let Some(start) = pending.remove(&key) else {
                continue;
            };
            let Some(pitch) = pitch_for_key(key) else {
                skipped += 1;
                continue;
            };

            let start_beat = start as f32 / ticks_per_beat;
            let duration_beats = ((time - start) as f32 / ticks_per_beat).max(MIN_IMPORT_BEATS);
            notes.push(Note::new(pitch, start_beat, duration_beats, NoteSource::Human));
        }
    }

    if skipped > 0 {
        warn!("Skipped {} note(s) outside the piano range", skipped);
    }
    notes.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));
    info!("Imported {} note(s)", notes.len());
    Ok(notes)
}

/// Writes a single-track file, optionally limited to generated notes.
pub fn save(notes: &[Note], only_generated: bool, tempo_bpm: f32) -> Result<Vec<u8>, FileError> {
    let mut events: Vec<(u32, TrackEventKind)> = Vec::new();

    let tempo_us = 60_000_000.0 / tempo_bpm;
    let tempo = (tempo_bpm.is_finite() && tempo_bpm > 0.0)
        .then(|| u24::try_from(tempo_us.round() as u32))
        .flatten()
        .ok_or_else(|| FileError::OutOfRange(format!("tempo {} bpm", tempo_bpm)))?;
    events.push((0, TrackEventKind::Meta(MetaMessage::Tempo(tempo))));

    let channel = u4::new(0);
    for note in notes {
        if only_generated && note.source != NoteSource::Generated {
            continue;
        }
        let key = u7::new(key_for(note.pitch));
        let start_tick = beats_to_ticks(note.start_beat);
        let end_tick = beats_to_ticks(note.end_beat()).max(start_tick.saturating_add(1));

        events.push((
            start_tick,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(EXPORT_VELOCITY),
                },
            },
        ));
        events.push((
            end_tick,
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            },
        ));
    }

    // Note-offs first at equal times so a repeated key is not cut short.
    events.sort_by_key(|(time, kind)| (*time, is_note_on(kind)));

    let mut track: Track = Vec::new();
    let mut last_time: u32 = 0;
    for (time, kind) in events {
        let delta = u28::try_from(time - last_time)
            .ok_or_else(|| FileError::OutOfRange(format!("a gap of {} ticks", time - last_time)))?;
        track.push(TrackEvent { delta, kind });
        last_time = time;
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(u15::new(TICKS_PER_BEAT)),
        },
        tracks: vec![track],
    };

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)?;
    info!("Exported {} bytes", buffer.len());
    Ok(buffer)
}

fn beats_to_ticks(beats: f32) -> u32 {
    (beats.max(0.0) * TICKS_PER_BEAT as f32).round() as u32
}

fn is_note_on(kind: &TrackEventKind) -> bool {
    matches!(
        kind,
        TrackEventKind::Midi {
            message: MidiMessage::NoteOn { .. },
            ..
        }
    )
}
