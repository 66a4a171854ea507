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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::info;

use super::{ContextState, OutputBackend, OutputContext, OutputError, StartError, Voice};

const MOCK_SAMPLE_RATE: u32 = 44100;
const MOCK_CHANNELS: u16 = 2;

/// A mock backend. Doesn't actually play anything.
pub struct Backend {
    available: bool,
    start_running: bool,
    contexts: Mutex<Vec<Arc<Context>>>,
}

impl Backend {
    /// A backend whose contexts start suspended, like a real output.
    pub fn new() -> Backend {
        Backend {
            available: true,
            start_running: false,
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose contexts are running as soon as they are created.
    pub fn running() -> Backend {
        Backend {
            start_running: true,
            ..Backend::new()
        }
    }

    /// A backend without any output capability.
    pub fn unavailable() -> Backend {
        Backend {
            available: false,
            ..Backend::new()
        }
    }

    /// The number of contexts created so far.
    pub fn open_count(&self) -> usize {
        self.contexts.lock().len()
    }

    /// The most recently created context.
    pub fn context(&self) -> Option<Arc<Context>> {
        self.contexts.lock().last().cloned()
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::new()
    }
}

impl OutputBackend for Backend {
    fn open(&self) -> Result<Arc<dyn OutputContext>, OutputError> {
        if !self.available {
            return Err(OutputError::Unavailable(
                "mock output is unavailable".to_string(),
            ));
        }

        let context = Arc::new(Context {
            running: AtomicBool::new(self.start_running),
            resumes: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        });
        self.contexts.lock().push(context.clone());
        info!("Opened mock output.");
        Ok(context)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mock (Mock)")
    }
}

/// A mock context that records every voice it is asked to start.
pub struct Context {
    running: AtomicBool,
    resumes: AtomicUsize,
    started: Mutex<Vec<Voice>>,
}

impl Context {
    /// The pads of every voice started, in order.
    pub fn started_pads(&self) -> Vec<usize> {
        self.started.lock().iter().map(|voice| voice.pad()).collect()
    }

    /// The voices started so far.
    pub fn started(&self) -> Vec<Voice> {
        self.started.lock().clone()
    }

    /// How many times a suspended context was resumed.
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::Acquire)
    }
}

impl OutputContext for Context {
    fn state(&self) -> ContextState {
        if self.running.load(Ordering::Acquire) {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&self) -> Result<(), OutputError> {
        if !self.running.swap(true, Ordering::AcqRel) {
            self.resumes.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        MOCK_SAMPLE_RATE
    }

    fn channel_count(&self) -> u16 {
        MOCK_CHANNELS
    }

    fn start(&self, voice: Voice) -> Result<(), StartError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(StartError::NotRunning);
        }
        self.started.lock().push(voice);
        Ok(())
    }
}
