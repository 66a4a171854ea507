// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{fmt, sync::Arc};

use midly::{live::LiveEvent, MidiMessage};
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};

use crate::config;

mod midir;
mod mock;

/// A raw message received from a MIDI input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMessage {
    /// Microseconds since the input was opened, as reported by the port.
    pub timestamp: u64,
    pub data: Vec<u8>,
}

/// Raised when MIDI input cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("MIDI input unavailable: {0}")]
    Unavailable(String),

    #[error("already watching events on {0}")]
    AlreadyWatching(String),

    #[error("unable to connect to {device}: {reason}")]
    Connect { device: String, reason: String },
}

/// A MIDI input device that can be watched for events.
pub trait Device: fmt::Display + Send + Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<InputMessage>) -> Result<(), InputError>;

    /// Stops watching events.
    fn stop_watch_events(&self);
}

/// A note-on that can trigger or teach a pad. Note-ons with zero velocity are
/// note-offs by convention and never qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOn {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

impl NoteOn {
    /// Parses a qualifying note-on from raw bytes.
    pub fn parse(raw: &[u8]) -> Option<NoteOn> {
        match LiveEvent::parse(raw).ok()? {
            LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            } if vel > 0 => Some(NoteOn {
                channel: channel.as_int(),
                note: key.as_int(),
                velocity: vel.as_int(),
            }),
            _ => None,
        }
    }
}

/// Lists the MIDI input ports known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, InputError> {
    midir::list()
}

/// Opens the configured inputs, or every input when none are configured. Missing
/// MIDI support is not fatal: the instrument stays usable without it.
pub fn discover(config: &config::Midi) -> Vec<Arc<dyn Device>> {
    let names = match config.inputs() {
        Some(names) => names,
        None => {
            return match midir::list_inputs() {
                Ok(devices) => {
                    info!(count = devices.len(), "Discovered MIDI inputs.");
                    devices
                        .into_iter()
                        .map(|device| {
                            let device: Arc<dyn Device> = Arc::new(device);
                            device
                        })
                        .collect()
                }
                Err(e) => {
                    warn!(err = e.to_string(), "MIDI input is unavailable.");
                    Vec::new()
                }
            };
        }
    };

    names
        .iter()
        .filter_map(|name| match get_device(name) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!(device = name, err = e.to_string(), "Skipping MIDI input.");
                None
            }
        })
        .collect()
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, InputError> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

#[cfg(test)]
pub mod test {
    pub use super::mock::Device;

    use super::NoteOn;

    #[test]
    fn qualifying_note_on() {
        assert_eq!(
            Some(NoteOn {
                channel: 0,
                note: 40,
                velocity: 100
            }),
            NoteOn::parse(&[0x90, 40, 100])
        );
        assert_eq!(
            Some(NoteOn {
                channel: 9,
                note: 36,
                velocity: 1
            }),
            NoteOn::parse(&[0x99, 36, 1])
        );
    }

    #[test]
    fn ignored_messages() {
        // Zero velocity note-on.
        assert_eq!(None, NoteOn::parse(&[0x90, 40, 0]));
        // Note-off.
        assert_eq!(None, NoteOn::parse(&[0x80, 40, 100]));
        // Control change.
        assert_eq!(None, NoteOn::parse(&[0xB0, 7, 127]));
        // Truncated and empty messages.
        assert_eq!(None, NoteOn::parse(&[0x90, 40]));
        assert_eq!(None, NoteOn::parse(&[]));
    }
}
