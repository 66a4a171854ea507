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
use crate::audio::{DecodeError, OutputError};

/// Raised when a sample cannot be loaded into a pad. The pad keeps its previous
/// sample whenever this is returned.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    OutputUnavailable(OutputError),

    #[error("pad {pad} is beyond the last loadable pad {last}")]
    PadOutOfRange { pad: usize, last: usize },

    #[error("a newer sample was requested for pad {pad}")]
    Superseded { pad: usize },

    #[error("sample decoding was interrupted: {0}")]
    Interrupted(String),
}
