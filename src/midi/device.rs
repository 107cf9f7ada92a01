/// MIDI device input using midir
use log::{debug, info};
use midir::{Ignore, MidiInput, MidiInputConnection};
use midly::live::LiveEvent;
use midly::MidiMessage;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::ConnectionError;

const CLIENT_NAME: &str = "pianoroll MIDI Input";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8 },
}

/// Connects to MIDI input ports.
#[derive(Debug, Default)]
pub struct MidiDeviceConnector;

impl MidiDeviceConnector {
    pub fn new() -> Self {
        Self
    }

    pub fn available_ports(&self) -> Vec<String> {
        if let Ok(midi_in) = MidiInput::new(CLIENT_NAME) {
            midi_in
                .ports()
                .iter()
                .filter_map(|p| midi_in.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    /// Connects to the first available input port.
    pub fn connect(&self) -> Result<DeviceHandle, ConnectionError> {
        self.connect_port(0)
    }

    pub fn connect_port(&self, port_index: usize) -> Result<DeviceHandle, ConnectionError> {
        let mut midi_in =
            MidiInput::new(CLIENT_NAME).map_err(|e| ConnectionError::Init(e.to_string()))?;
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        let port = ports.get(port_index).ok_or(ConnectionError::DeviceNotFound)?;
        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| format!("port {}", port_index));

        let (sender, receiver) = channel();
        let connection = midi_in
            .connect(port, "pianoroll-in", forward_message, sender)
            .map_err(|e| ConnectionError::Connect {
                port: port_name.clone(),
                message: e.to_string(),
            })?;

        info!("Connected to MIDI input {}", port_name);
        Ok(DeviceHandle {
            _connection: connection,
            receiver,
            port_name,
        })
    }
}

/// Open input connection. Dropping it disconnects.
pub struct DeviceHandle {
    _connection: MidiInputConnection<Sender<DeviceEvent>>,
    receiver: Receiver<DeviceEvent>,
    port_name: String,
}

impl DeviceHandle {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn poll_events(&self) -> Vec<DeviceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

fn forward_message(_stamp: u64, message: &[u8], sender: &mut Sender<DeviceEvent>) {
    if let Some(event) = parse_message(message) {
        let _ = sender.send(event);
    }
}

/// Note messages only; a note-on with zero velocity is a note-off.
pub fn parse_message(bytes: &[u8]) -> Option<DeviceEvent> {
    let event = match LiveEvent::parse(bytes) {
        Ok(event) => event,
        Err(e) => {
            debug!("Ignoring MIDI message {:02x?}: {}", bytes, e);
            return None;
        }
    };

    match event {
        LiveEvent::Midi {
            message: MidiMessage::NoteOn { key, vel },
            ..
        } if vel.as_int() > 0 => Some(DeviceEvent::NoteOn {
            key: key.as_int(),
            velocity: vel.as_int(),
        }),
        LiveEvent::Midi {
            message: MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. },
            ..
        } => Some(DeviceEvent::NoteOff { key: key.as_int() }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        assert_eq!(
            parse_message(&[0x90, 60, 100]),
            Some(DeviceEvent::NoteOn {
                key: 60,
                velocity: 100
            })
        );
    }

    #[test]
    fn test_zero_velocity_note_on_is_note_off() {
        assert_eq!(
            parse_message(&[0x91, 64, 0]),
            Some(DeviceEvent::NoteOff { key: 64 })
        );
        assert_eq!(
            parse_message(&[0x80, 64, 0]),
            Some(DeviceEvent::NoteOff { key: 64 })
        );
    }

    #[test]
    fn test_other_messages_are_ignored() {
        assert_eq!(parse_message(&[0xB0, 7, 100]), None);
        assert_eq!(parse_message(&[]), None);
    }
}
