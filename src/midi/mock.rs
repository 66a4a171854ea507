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

use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;

use super::{InputError, InputMessage};

/// A mock device. Events are injected by tests.
#[derive(Clone)]
pub struct Device {
    name: String,
    sender: Arc<Mutex<Option<Sender<InputMessage>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            sender: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns true while something is watching this device.
    #[cfg(test)]
    pub fn is_watched(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Sends the mock event through to the watcher. Returns false if nothing is
    /// watching or the watcher has gone away.
    #[cfg(test)]
    pub fn mock_event(&self, event: &[u8]) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender
                .try_send(InputMessage {
                    timestamp: 0,
                    data: event.to_vec(),
                })
                .is_ok(),
            None => false,
        }
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<InputMessage>) -> Result<(), InputError> {
        let mut current = self.sender.lock();
        if current.is_some() {
            return Err(InputError::AlreadyWatching(self.name.clone()));
        }
        *current = Some(sender);
        Ok(())
    }

    fn stop_watch_events(&self) {
        self.sender.lock().take();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
