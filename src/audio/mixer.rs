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
// Voice mixing shared by the cpal output callback and tests.
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::DecodedSample;

/// Gain applied to every voice.
pub const UNITY_GAIN: f32 = 1.0;

/// A single one-shot playback of a decoded sample.
#[derive(Debug, Clone)]
pub struct Voice {
    pad: usize,
    sample: Arc<DecodedSample>,
    gain: f32,
    position: usize,
}

impl Voice {
    /// Creates a voice at unity gain positioned at the start of the sample.
    pub fn new(pad: usize, sample: Arc<DecodedSample>) -> Voice {
        Voice {
            pad,
            sample,
            gain: UNITY_GAIN,
            position: 0,
        }
    }

    /// The pad that started this voice.
    pub fn pad(&self) -> usize {
        self.pad
    }

    pub fn sample(&self) -> &Arc<DecodedSample> {
        &self.sample
    }

    fn is_finished(&self) -> bool {
        self.position >= self.sample.data().len()
    }

    /// Adds the voice into the interleaved buffer, advancing its position. The sample
    /// and the buffer are expected to share a channel layout.
    fn mix_into(&mut self, output: &mut [f32]) {
        let remaining = &self.sample.data()[self.position..];
        let count = remaining.len().min(output.len());
        for (dst, src) in output[..count].iter_mut().zip(remaining) {
            *dst += src * self.gain;
        }
        self.position += count;
    }
}

/// Sums every active voice into the output. Voices are never stolen: each plays
/// to its last frame and is then dropped.
pub struct VoiceMixer {
    voices: Vec<Voice>,
    incoming: Receiver<Voice>,
}

impl VoiceMixer {
    /// Creates a mixer that takes new voices from the given channel.
    pub fn new(incoming: Receiver<Voice>) -> VoiceMixer {
        VoiceMixer {
            voices: Vec::new(),
            incoming,
        }
    }

    /// The number of voices still playing.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Renders the next block of interleaved audio into the output buffer.
    pub fn process_into_output(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        while let Ok(voice) = self.incoming.try_recv() {
            self.voices.push(voice);
        }

        for voice in self.voices.iter_mut() {
            voice.mix_into(output);
        }
        self.voices.retain(|voice| !voice.is_finished());
    }
}
