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
/// Note assignments for each pad. A note is held by at most one pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    notes: Vec<Option<u8>>,
}

impl MappingTable {
    /// Creates a table of the given size with every pad unmapped.
    pub fn new(pads: usize) -> MappingTable {
        MappingTable {
            notes: vec![None; pads],
        }
    }

    /// The note mapped to the pad, if any.
    pub fn note(&self, pad: usize) -> Option<u8> {
        self.notes.get(pad).copied().flatten()
    }

    /// The pad the note is mapped to, if any.
    pub fn pad_for(&self, note: u8) -> Option<usize> {
        self.notes.iter().position(|mapped| *mapped == Some(note))
    }

    /// Maps the note to the pad, first clearing it from whichever pad held it.
    /// Returns the pad the note was taken from, if it moved. Pads outside the
    /// table are ignored.
    pub fn assign(&mut self, pad: usize, note: u8) -> Option<usize> {
        if pad >= self.notes.len() {
            return None;
        }
        let previous = self.pad_for(note).filter(|previous| *previous != pad);
        if let Some(previous) = previous {
            self.notes[previous] = None;
        }
        self.notes[pad] = Some(note);
        previous
    }

    /// Iterates over the note for every pad, in pad order.
    pub fn iter(&self) -> impl Iterator<Item = Option<u8>> + '_ {
        self.notes.iter().copied()
    }
}
