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
use std::{collections::HashMap, sync::Arc};

use crate::audio::DecodedSample;

/// A stored sample and the name it was loaded under.
#[derive(Clone)]
struct Slot {
    sample: Arc<DecodedSample>,
    name: Option<String>,
}

/// Decoded samples indexed by pad. Slots grow on demand and are never shrunk.
pub(super) struct SampleSlots {
    slots: Vec<Option<Slot>>,
    /// The latest load ticket issued per pad.
    requests: HashMap<usize, u64>,
    next_request: u64,
}

impl SampleSlots {
    pub fn new() -> SampleSlots {
        SampleSlots {
            slots: Vec::new(),
            requests: HashMap::new(),
            next_request: 0,
        }
    }

    /// Grows the slots so that pads 0..n are addressable.
    pub fn ensure_capacity(&mut self, n: usize) {
        if self.slots.len() < n {
            self.slots.resize(n, None);
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, pad: usize) -> Option<Arc<DecodedSample>> {
        self.slot(pad).map(|slot| slot.sample.clone())
    }

    /// The name stored with the pad's sample.
    pub fn name(&self, pad: usize) -> Option<String> {
        self.slot(pad).and_then(|slot| slot.name.clone())
    }

    fn slot(&self, pad: usize) -> Option<&Slot> {
        self.slots.get(pad).and_then(Option::as_ref)
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Records a new load request for the pad and returns its ticket. Any request
    /// issued earlier for the same pad is superseded.
    pub fn begin_load(&mut self, pad: usize) -> u64 {
        self.next_request += 1;
        self.requests.insert(pad, self.next_request);
        self.next_request
    }

    /// Stores the sample and its name if the ticket is still the latest for the
    /// pad. Returns false and leaves the slot untouched otherwise.
    pub fn finish_load(
        &mut self,
        pad: usize,
        ticket: u64,
        sample: Arc<DecodedSample>,
        name: Option<String>,
    ) -> bool {
        if self.requests.get(&pad) != Some(&ticket) {
            return false;
        }

        self.ensure_capacity(pad.saturating_add(1));
        match self.slots.get_mut(pad) {
            Some(slot) => {
                *slot = Some(Slot { sample, name });
                true
            }
            None => false,
        }
    }
}
