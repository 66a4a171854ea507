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
use std::{io::Cursor, time::Duration};

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, codecs::CODEC_TYPE_NULL,
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use super::DecodeError;

/// Fully decoded audio, interleaved and already converted to the output format
/// of the context that decoded it.
#[derive(Clone, PartialEq)]
pub struct DecodedSample {
    data: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedSample {
    /// Creates a decoded sample from interleaved data.
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32) -> DecodedSample {
        DecodedSample {
            data,
            channels,
            sample_rate,
        }
    }

    /// The interleaved samples.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.data.len() / self.channels as usize
    }

    /// The playback length of the sample.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Approximate memory held by the sample in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for DecodedSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedSample")
            .field("frames", &self.frames())
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Decodes encoded audio bytes of any format symphonia understands into a sample
/// with the given rate and channel count.
pub fn decode(
    bytes: Vec<u8>,
    target_rate: u32,
    target_channels: u16,
) -> Result<DecodedSample, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let probed = get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;
    let mut source_channels = track
        .codec_params
        .channels
        .map(|channels| channels.count() as u16);

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(SymphoniaError::DecodeError(err)) => {
                warn!(err, "Skipping corrupt audio packet.");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let spec = *audio_buf.spec();
        if source_channels.is_none() {
            source_channels = Some(spec.channels.count() as u16);
        }

        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    let source_channels = match source_channels {
        Some(channels) if channels > 0 => channels,
        _ => return Err(DecodeError::Empty),
    };
    if decoded.len() < source_channels as usize {
        return Err(DecodeError::Empty);
    }

    let mapped = map_channels(&decoded, source_channels, target_channels);
    let data = if source_rate == target_rate {
        mapped
    } else {
        transcode(&mapped, target_channels, source_rate, target_rate)
    };

    debug!(
        source_rate,
        source_channels,
        target_rate,
        target_channels,
        frames = data.len() / target_channels.max(1) as usize,
        "Decoded sample."
    );

    Ok(DecodedSample::new(data, target_channels, target_rate))
}

/// Converts interleaved samples between channel layouts. Mono is spread to every
/// output channel, any layout folds to mono by averaging, and other layouts wrap
/// source channels around the output channels.
fn map_channels(samples: &[f32], source_channels: u16, target_channels: u16) -> Vec<f32> {
    let source = source_channels as usize;
    let target = target_channels as usize;
    if source == target {
        return samples.to_vec();
    }

    let frames = samples.len() / source;
    let mut out = Vec::with_capacity(frames * target);
    for frame in samples.chunks_exact(source) {
        if source == 1 {
            out.extend(std::iter::repeat(frame[0]).take(target));
        } else if target == 1 {
            out.push(frame.iter().sum::<f32>() / source as f32);
        } else {
            out.extend((0..target).map(|channel| frame[channel % source]));
        }
    }
    out
}

/// Linear interpolation resampler.
fn transcode(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}
