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
use std::{fmt, mem};

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info, span, Level};

use super::{InputError, InputMessage};

/// A MIDI input port reached through midir.
pub struct Device {
    name: String,
    input_port: MidiInputPort,
    event_connection: Mutex<Option<MidiInputConnection<()>>>,
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<InputMessage>) -> Result<(), InputError> {
        let span = span!(Level::INFO, "wait for event (midir)");
        let _enter = span.enter();

        let mut event_connection = self.event_connection.lock();
        if event_connection.is_some() {
            return Err(InputError::AlreadyWatching(self.name.clone()));
        }

        info!(device = self.name, "Watching MIDI events.");
        let input = MidiInput::new("drumpad input").map_err(unavailable)?;
        let name = self.name.clone();
        let connection = input
            .connect(
                &self.input_port,
                "drumpad input watcher",
                move |timestamp, raw_event, _| {
                    if let Ok(event) = LiveEvent::parse(raw_event) {
                        debug!(
                            device = name,
                            event = format!("{:?}", event),
                            "Received MIDI event."
                        );
                    }

                    let message = InputMessage {
                        timestamp,
                        data: raw_event.to_vec(),
                    };
                    if let Err(e) = sender.blocking_send(message) {
                        error!(
                            err = format!("{:?}", e),
                            "Error sending MIDI event to receiver."
                        );
                    }
                },
                (),
            )
            .map_err(|e| InputError::Connect {
                device: self.name.clone(),
                reason: e.to_string(),
            })?;
        *event_connection = Some(connection);

        Ok(())
    }

    fn stop_watch_events(&self) {
        // Explicitly drop the connection.
        let event_connection = self.event_connection.lock().take();
        mem::drop(event_connection);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Input)", self.name)
    }
}

fn unavailable<E: fmt::Display>(err: E) -> InputError {
    InputError::Unavailable(err.to_string())
}

/// Lists midir input ports and produces the Device trait.
pub fn list() -> Result<Vec<Box<dyn super::Device>>, InputError> {
    Ok(list_inputs()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn super::Device> = Box::new(device);
            device
        })
        .collect())
}

/// Lists midir input ports, sorted by name.
pub fn list_inputs() -> Result<Vec<Device>, InputError> {
    let input = MidiInput::new("drumpad input listing").map_err(unavailable)?;

    let mut devices: Vec<Device> = Vec::new();
    for port in input.ports() {
        let name = input.port_name(&port).map_err(unavailable)?;
        devices.push(Device {
            name,
            input_port: port,
            event_connection: Mutex::new(None),
        });
    }

    devices.sort_by_key(|device| device.name.clone());
    Ok(devices)
}

/// Gets the midir input whose name contains the given name.
pub fn get(name: &str) -> Result<Device, InputError> {
    let mut matches = list_inputs()?
        .into_iter()
        .filter(|device| device.name.contains(name))
        .collect::<Vec<Device>>();

    if matches.is_empty() {
        return Err(InputError::Unavailable(format!(
            "no device found with name {}",
            name
        )));
    }
    if matches.len() > 1 {
        return Err(InputError::Unavailable(format!(
            "found too many devices that match ({}), use a less ambiguous device name",
            matches
                .iter()
                .map(|device| device.name.clone())
                .collect::<Vec<String>>()
                .join(", ")
        )));
    }

    Ok(matches.swap_remove(0))
}
