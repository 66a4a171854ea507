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
use symphonia::core::errors::Error as SymphoniaError;

/// Raised when no audio output can be created or started.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("unable to resume audio output: {0}")]
    Resume(String),
}

/// Raised when bytes cannot be turned into playable audio.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported or malformed audio: {0}")]
    Unsupported(#[from] SymphoniaError),

    #[error("no decodable audio track found")]
    NoTrack,

    #[error("audio track has no sample rate")]
    MissingSampleRate,

    #[error("audio contains no samples")]
    Empty,
}

/// Raised when a voice cannot be handed to the output.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error("playback context is not running")]
    NotRunning,

    #[error("playback context has shut down")]
    Closed,
}
