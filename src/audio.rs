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

use crate::config;

pub mod cpal;
pub mod decode;
mod error;
pub mod mixer;
pub mod mock;

pub use decode::DecodedSample;
pub use error::{DecodeError, OutputError, StartError};
pub use mixer::Voice;

/// The state of a playback context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// The context exists but is not producing output.
    Suspended,
    /// The context is producing output.
    Running,
}

/// An audio output capability. Opening it yields the single playback context
/// that the sample engine renders through.
pub trait OutputBackend: fmt::Display + Send + Sync {
    /// Creates a playback context. Contexts always start suspended.
    fn open(&self) -> Result<Arc<dyn OutputContext>, OutputError>;
}

/// An open audio output.
pub trait OutputContext: Send + Sync {
    /// Returns the current state of the context.
    fn state(&self) -> ContextState;

    /// Starts output if the context is suspended. Resuming a running context is a no-op.
    fn resume(&self) -> Result<(), OutputError>;

    /// The sample rate of the output in Hz.
    fn sample_rate(&self) -> u32;

    /// The number of interleaved output channels.
    fn channel_count(&self) -> u16;

    /// Decodes encoded audio into a buffer that matches this context's format.
    fn decode(&self, bytes: Vec<u8>) -> Result<DecodedSample, DecodeError> {
        decode::decode(bytes, self.sample_rate(), self.channel_count())
    }

    /// Starts a one-shot voice. Fails with [StartError::NotRunning] while suspended.
    fn start(&self, voice: Voice) -> Result<(), StartError>;
}

/// Lists the names of output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, OutputError> {
    cpal::list()
}

/// Gets the output backend described by the configuration. Device names
/// starting with "mock" select the in-memory backend.
pub fn get_backend(config: &config::Audio) -> Arc<dyn OutputBackend> {
    if config.device().starts_with("mock") {
        return Arc::new(mock::Backend::new());
    }

    Arc::new(cpal::Backend::new(config.clone()))
}
