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
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use tracing::{debug, error, info, span, Level};

use super::{
    mixer::VoiceMixer, ContextState, OutputBackend, OutputContext, OutputError, StartError, Voice,
};
use crate::config;

/// The device name that selects the host's default output.
const DEFAULT_DEVICE: &str = "default";

/// Opens playback contexts on a cpal output device.
pub struct Backend {
    config: config::Audio,
}

impl Backend {
    pub fn new(config: config::Audio) -> Backend {
        Backend { config }
    }
}

impl OutputBackend for Backend {
    fn open(&self) -> Result<Arc<dyn OutputContext>, OutputError> {
        Ok(Arc::new(Context::open(&self.config)?))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (cpal)", self.config.device())
    }
}

/// Commands handled by the thread that owns the cpal stream.
enum StreamCommand {
    Play(Sender<Result<(), String>>),
}

/// A playback context backed by a cpal output stream. The stream lives on its own
/// thread and is built paused, so the context starts suspended.
pub struct Context {
    device_name: String,
    sample_rate: u32,
    channels: u16,
    running: AtomicBool,
    voice_tx: Sender<Voice>,
    command_tx: Sender<StreamCommand>,
}

impl Context {
    fn open(config: &config::Audio) -> Result<Context, OutputError> {
        let span = span!(Level::INFO, "open output (cpal)");
        let _enter = span.enter();

        let host = cpal::default_host();
        let device = find_device(&host, config.device())?;
        let device_name = device.name().map_err(unavailable)?;

        let default_config = device.default_output_config().map_err(unavailable)?;
        let sample_format = default_config.sample_format();
        let mut stream_config: cpal::StreamConfig = default_config.into();
        if let Some(sample_rate) = config.sample_rate() {
            stream_config.sample_rate = sample_rate;
        }
        if let Some(buffer_size) = config.buffer_size() {
            stream_config.buffer_size = cpal::BufferSize::Fixed(buffer_size);
        }
        let sample_rate = stream_config.sample_rate;
        let channels = stream_config.channels;

        let (voice_tx, voice_rx) = crossbeam_channel::unbounded::<Voice>();
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<StreamCommand>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);

        thread::Builder::new()
            .name("drumpad-output".to_string())
            .spawn(move || {
                let mixer = VoiceMixer::new(voice_rx);
                let stream = match build_stream(&device, &stream_config, sample_format, mixer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.pause() {
                    debug!(err = e.to_string(), "Output stream cannot be paused.");
                }
                let _ = ready_tx.send(Ok(()));

                // The stream stays alive until the context is dropped.
                while let Ok(command) = command_rx.recv() {
                    match command {
                        StreamCommand::Play(reply) => {
                            let _ = reply.send(stream.play().map_err(|e| e.to_string()));
                        }
                    }
                }
                info!("Output stream closed.");
            })
            .map_err(unavailable)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(OutputError::Unavailable(e)),
            Err(_) => {
                return Err(OutputError::Unavailable(
                    "output thread exited before the stream was built".to_string(),
                ))
            }
        }

        info!(
            device = device_name,
            sample_rate,
            channels,
            format = sample_format.to_string(),
            "Opened output stream."
        );

        Ok(Context {
            device_name,
            sample_rate,
            channels,
            running: AtomicBool::new(false),
            voice_tx,
            command_tx,
        })
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
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.command_tx
            .send(StreamCommand::Play(reply_tx))
            .map_err(|_| OutputError::Resume("output thread has exited".to_string()))?;
        match reply_rx.recv() {
            Ok(Ok(())) => {
                self.running.store(true, Ordering::Release);
                info!(device = self.device_name, "Output resumed.");
                Ok(())
            }
            Ok(Err(e)) => Err(OutputError::Resume(e)),
            Err(_) => Err(OutputError::Resume("output thread has exited".to_string())),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u16 {
        self.channels
    }

    fn start(&self, voice: Voice) -> Result<(), StartError> {
        if !self.running.load(Ordering::Acquire) {
            return Err(StartError::NotRunning);
        }
        self.voice_tx.send(voice).map_err(|_| StartError::Closed)
    }
}

fn unavailable<E: fmt::Display>(err: E) -> OutputError {
    OutputError::Unavailable(err.to_string())
}

fn find_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, OutputError> {
    if name == DEFAULT_DEVICE {
        return host
            .default_output_device()
            .ok_or_else(|| OutputError::Unavailable("no default output device".to_string()));
    }

    host.output_devices()
        .map_err(unavailable)?
        .find(|device| device.name().is_ok_and(|device_name| device_name.trim() == name))
        .ok_or_else(|| OutputError::Unavailable(format!("no device found with name {}", name)))
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: VoiceMixer,
) -> Result<cpal::Stream, String> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, mixer),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, mixer),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, mixer),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, mixer),
        other => Err(format!("unsupported output sample format {}", other)),
    }
}

/// Builds a stream whose callback mixes in f32 and converts to the device's format.
fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: VoiceMixer,
) -> Result<cpal::Stream, String>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() != data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                mixer.process_into_output(&mut scratch);
                for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                    *dst = T::from_sample(src);
                }
            },
            |err| error!(err = err.to_string(), "Output stream error."),
            None,
        )
        .map_err(|e| e.to_string())
}

/// Lists the output devices of every available host.
pub fn list() -> Result<Vec<String>, OutputError> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout().map_err(unavailable)?;
    let _shh_stderr = shh::stderr().map_err(unavailable)?;

    let mut devices: Vec<String> = Vec::new();
    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                error!(err = e.to_string(), host = host_id.name(), "Host unavailable");
                continue;
            }
        };
        let host_devices = match host.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            if let Ok(name) = device.name() {
                devices.push(format!("{} ({})", name.trim(), host_id.name()));
            }
        }
    }

    devices.sort();
    Ok(devices)
}
