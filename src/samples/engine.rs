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
//! Coordinates the playback context, sample slots and voice playback.

use std::{fmt, sync::Arc, thread, time::Duration};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::{slots::SampleSlots, LoadError};
use crate::{
    audio::{
        ContextState, DecodedSample, OutputBackend, OutputContext, OutputError, StartError, Voice,
    },
    config::MAX_PADS,
};

/// The lifecycle of the process-wide playback context.
enum ContextSlot {
    Absent,
    Ready(Arc<dyn OutputContext>),
    /// Creation failed once. The capability is treated as absent from then on.
    Unavailable(String),
}

/// The sample engine owns every pad's decoded audio and the single playback
/// context. It knows nothing about note mappings.
pub struct SampleEngine {
    backend: Arc<dyn OutputBackend>,
    context: Mutex<ContextSlot>,
    slots: RwLock<SampleSlots>,
}

impl SampleEngine {
    /// Creates an engine with no slots and no playback context.
    pub fn new(backend: Arc<dyn OutputBackend>) -> SampleEngine {
        SampleEngine {
            backend,
            context: Mutex::new(ContextSlot::Absent),
            slots: RwLock::new(SampleSlots::new()),
        }
    }

    /// Returns the playback context, creating it on first use. Concurrent callers
    /// share one context.
    fn context(&self) -> Result<Arc<dyn OutputContext>, OutputError> {
        let mut slot = self.context.lock();
        match &*slot {
            ContextSlot::Ready(context) => return Ok(context.clone()),
            ContextSlot::Unavailable(reason) => {
                return Err(OutputError::Unavailable(reason.clone()))
            }
            ContextSlot::Absent => {}
        }

        match self.backend.open() {
            Ok(context) => {
                info!(
                    backend = self.backend.to_string(),
                    sample_rate = context.sample_rate(),
                    channels = context.channel_count(),
                    "Created playback context."
                );
                *slot = ContextSlot::Ready(context.clone());
                Ok(context)
            }
            Err(e) => {
                warn!(
                    backend = self.backend.to_string(),
                    err = e.to_string(),
                    "No audio output available, playback is disabled."
                );
                *slot = ContextSlot::Unavailable(e.to_string());
                Err(e)
            }
        }
    }

    /// Makes pads 0..n addressable.
    pub fn ensure_capacity(&self, n: usize) {
        self.slots.write().ensure_capacity(n);
    }

    /// The number of addressable pads.
    pub fn capacity(&self) -> usize {
        self.slots.read().capacity()
    }

    /// The number of pads holding a sample.
    pub fn loaded_count(&self) -> usize {
        self.slots.read().loaded_count()
    }

    /// Creates the context if needed and starts output if it is suspended. Does
    /// nothing when there is no output capability.
    pub async fn resume_output(&self) {
        let context = match self.context() {
            Ok(context) => context,
            Err(_) => return,
        };
        if context.state() == ContextState::Running {
            return;
        }

        match tokio::task::spawn_blocking(move || context.resume()).await {
            Ok(Ok(())) => debug!("Playback context resumed."),
            Ok(Err(e)) => warn!(err = e.to_string(), "Unable to resume audio output."),
            Err(e) => error!(err = e.to_string(), "Resume task failed."),
        }
    }

    /// Decodes the bytes and stores the result in the pad, replacing any previous
    /// sample. Returns the duration of the stored sample.
    pub async fn load_sample(&self, pad: usize, bytes: Vec<u8>) -> Result<Duration, LoadError> {
        self.load_named_sample(pad, None, bytes).await
    }

    /// Like [SampleEngine::load_sample], storing the name with the sample so the
    /// two are always replaced together.
    pub async fn load_named_sample(
        &self,
        pad: usize,
        name: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Duration, LoadError> {
        if pad >= MAX_PADS {
            return Err(LoadError::PadOutOfRange {
                pad,
                last: MAX_PADS - 1,
            });
        }
        let context = self.context().map_err(LoadError::OutputUnavailable)?;
        let ticket = self.slots.write().begin_load(pad);
        debug!(pad, ticket, bytes = bytes.len(), "Decoding sample.");

        let decoded = tokio::task::spawn_blocking(move || context.decode(bytes))
            .await
            .map_err(|e| LoadError::Interrupted(e.to_string()))??;

        let sample = Arc::new(decoded);
        let name = name.map(str::to_string);
        if !self
            .slots
            .write()
            .finish_load(pad, ticket, sample.clone(), name)
        {
            info!(pad, ticket, "Discarding superseded sample.");
            return Err(LoadError::Superseded { pad });
        }

        info!(
            pad,
            duration = sample.duration().as_secs_f64(),
            memory_kb = sample.memory_size() / 1024,
            "Loaded sample."
        );
        Ok(sample.duration())
    }

    /// Starts a one-shot voice for the pad. Empty pads and a missing output are
    /// silent. A suspended context is resumed in the background and the voice
    /// starts once output is running.
    pub fn trigger(&self, pad: usize) {
        let context = match self.context() {
            Ok(context) => context,
            Err(_) => return,
        };
        let sample = match self.slots.read().get(pad) {
            Some(sample) => sample,
            None => {
                debug!(pad, "Pad is empty, nothing to play.");
                return;
            }
        };

        match context.start(Voice::new(pad, sample.clone())) {
            Ok(()) => debug!(pad, "Triggered pad."),
            Err(StartError::NotRunning) => Self::start_after_resume(context, pad, sample),
            Err(e) => warn!(pad, err = e.to_string(), "Unable to start voice."),
        }
    }

    fn start_after_resume(context: Arc<dyn OutputContext>, pad: usize, sample: Arc<DecodedSample>) {
        debug!(pad, "Playback context is suspended, resuming before playing.");
        thread::spawn(move || {
            if let Err(e) = context.resume() {
                warn!(pad, err = e.to_string(), "Unable to resume audio output.");
                return;
            }
            if let Err(e) = context.start(Voice::new(pad, sample)) {
                warn!(pad, err = e.to_string(), "Unable to start voice.");
            }
        });
    }

    /// The name the pad's sample was loaded under.
    pub fn sample_name(&self, pad: usize) -> Option<String> {
        self.slots.read().name(pad)
    }

    /// The length in seconds of the pad's sample, or 0 when it has none.
    pub fn sample_duration(&self, pad: usize) -> f64 {
        self.slots
            .read()
            .get(pad)
            .map(|sample| sample.duration().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl fmt::Debug for SampleEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = match &*self.context.lock() {
            ContextSlot::Absent => "absent".to_string(),
            ContextSlot::Ready(context) => format!("{:?}", context.state()),
            ContextSlot::Unavailable(reason) => format!("unavailable ({})", reason),
        };
        f.debug_struct("SampleEngine")
            .field("backend", &self.backend.to_string())
            .field("context", &context)
            .field("capacity", &self.capacity())
            .field("loaded", &self.loaded_count())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use crate::{
        audio::{mock, ContextState, OutputContext},
        samples::LoadError,
        testutil::{eventually, wav_bytes},
    };

    use super::SampleEngine;

    #[tokio::test]
    async fn trigger_empty_pad_is_silent() {
        let backend = Arc::new(mock::Backend::running());
        let engine = SampleEngine::new(backend.clone());
        engine.ensure_capacity(12);

        engine.trigger(3);
        engine.trigger(200);

        let context = backend.context().expect("context should exist");
        assert!(context.started_pads().is_empty());
        assert_eq!(0.0, engine.sample_duration(3));
        assert_eq!(0.0, engine.sample_duration(200));
    }

    #[tokio::test]
    async fn load_then_trigger_plays_one_voice() {
        let backend = Arc::new(mock::Backend::running());
        let engine = SampleEngine::new(backend.clone());
        engine.ensure_capacity(12);

        let duration = engine
            .load_sample(2, wav_bytes(1, 44100, 22050))
            .await
            .expect("load failed");
        assert_eq!(0.5, duration.as_secs_f64());
        assert_eq!(0.5, engine.sample_duration(2));

        engine.trigger(2);
        engine.trigger(2);

        let context = backend.context().expect("context should exist");
        assert_eq!(vec![2, 2], context.started_pads());
        let voices = context.started();
        assert_eq!(2, voices[0].sample().channels());
        assert!(Arc::ptr_eq(voices[0].sample(), voices[1].sample()));
    }

    #[tokio::test]
    async fn load_grows_capacity() {
        let backend = Arc::new(mock::Backend::running());
        let engine = SampleEngine::new(backend);
        assert_eq!(0, engine.capacity());

        engine
            .load_sample(20, wav_bytes(2, 44100, 441))
            .await
            .expect("load failed");
        assert_eq!(21, engine.capacity());
        assert_eq!(1, engine.loaded_count());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_sample() {
        let backend = Arc::new(mock::Backend::running());
        let engine = SampleEngine::new(backend);
        engine.ensure_capacity(12);

        engine
            .load_sample(0, wav_bytes(1, 44100, 4410))
            .await
            .expect("load failed");
        let result = engine.load_sample(0, b"not audio at all".to_vec()).await;

        assert!(matches!(result, Err(LoadError::Decode(_))));
        assert!((engine.sample_duration(0) - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn trigger_on_suspended_context_resumes_first() {
        let backend = Arc::new(mock::Backend::new());
        let engine = SampleEngine::new(backend.clone());
        engine
            .load_sample(1, wav_bytes(1, 44100, 441))
            .await
            .expect("load failed");

        let context = backend.context().expect("context should exist");
        assert_eq!(ContextState::Suspended, context.state());

        engine.trigger(1);
        eventually(
            || context.started_pads() == vec![1],
            "voice never started after resume",
        );
        assert_eq!(ContextState::Running, context.state());
        assert_eq!(1, context.resume_count());
    }

    #[tokio::test]
    async fn resume_output_starts_context() {
        let backend = Arc::new(mock::Backend::new());
        let engine = SampleEngine::new(backend.clone());

        engine.resume_output().await;
        engine.resume_output().await;

        let context = backend.context().expect("context should exist");
        assert_eq!(ContextState::Running, context.state());
        assert_eq!(1, context.resume_count());
        assert_eq!(1, backend.open_count());
    }

    #[test]
    fn concurrent_triggers_create_one_context() {
        let backend = Arc::new(mock::Backend::new());
        let engine = Arc::new(SampleEngine::new(backend.clone()));
        engine.ensure_capacity(12);

        let handles: Vec<_> = (0..8)
            .map(|pad| {
                let engine = engine.clone();
                thread::spawn(move || engine.trigger(pad))
            })
            .collect();
        for handle in handles {
            handle.join().expect("trigger thread panicked");
        }

        assert_eq!(1, backend.open_count());
    }

    #[tokio::test]
    async fn load_rejects_unaddressable_pad() {
        let backend = Arc::new(mock::Backend::running());
        let engine = SampleEngine::new(backend);

        let result = engine.load_sample(usize::MAX, wav_bytes(1, 44100, 441)).await;

        assert!(matches!(
            result,
            Err(LoadError::PadOutOfRange { pad: usize::MAX, .. })
        ));
        assert_eq!(0, engine.capacity());
        engine.trigger(usize::MAX);
        assert_eq!(0.0, engine.sample_duration(usize::MAX));
    }

    #[tokio::test]
    async fn name_is_replaced_with_sample() {
        let backend = Arc::new(mock::Backend::running());
        let engine = SampleEngine::new(backend);

        engine
            .load_named_sample(0, Some("kick.wav"), wav_bytes(1, 44100, 441))
            .await
            .expect("load failed");
        assert_eq!(Some("kick.wav".to_string()), engine.sample_name(0));

        let result = engine
            .load_named_sample(0, Some("notes.txt"), b"not audio".to_vec())
            .await;
        assert!(result.is_err());
        assert_eq!(Some("kick.wav".to_string()), engine.sample_name(0));

        engine
            .load_sample(0, wav_bytes(1, 44100, 882))
            .await
            .expect("load failed");
        assert_eq!(None, engine.sample_name(0));
    }

    #[tokio::test]
    async fn missing_output_is_reported_on_load_only() {
        let backend = Arc::new(mock::Backend::unavailable());
        let engine = SampleEngine::new(backend.clone());
        engine.ensure_capacity(12);

        engine.resume_output().await;
        engine.trigger(0);
        let result = engine.load_sample(0, wav_bytes(1, 44100, 441)).await;

        assert!(matches!(result, Err(LoadError::OutputUnavailable(_))));
        assert_eq!(0, backend.open_count());
        assert_eq!(0.0, engine.sample_duration(0));
    }
}
