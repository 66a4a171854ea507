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
//! The pad grid: note learning, note routing and the user actions that feed
//! the sample engine.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    midi::NoteOn,
    samples::{LoadError, SampleEngine},
};

mod learn;
mod mapping;

pub use learn::LearningState;
pub use mapping::MappingTable;

/// Raised by user actions on the instrument.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("pad {pad} does not exist (the instrument has {pads} pads)")]
    NoSuchPad { pad: usize, pads: usize },

    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to load sample into pad {pad}: {source}")]
    Load {
        pad: usize,
        #[source]
        source: LoadError,
    },
}

/// What a pad shows to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadView {
    pub index: usize,
    pub sample_name: Option<String>,
    pub midi_note: Option<u8>,
    pub is_learning: bool,
}

impl fmt::Display for PadView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pad {}", self.index + 1)?;
        match &self.sample_name {
            Some(name) => write!(f, " [{}]", name)?,
            None => write!(f, " [empty]")?,
        }
        match self.midi_note {
            Some(note) => write!(f, " note {}", note)?,
            None => write!(f, " unmapped")?,
        }
        if self.is_learning {
            write!(f, " (learning)")?;
        }
        Ok(())
    }
}

/// State that note events and UI actions mutate together.
struct PadState {
    mappings: MappingTable,
    learning: LearningState,
}

/// A fixed grid of pads. The instrument is the only writer of the mapping
/// table and learning state. All audio work is delegated to the sample engine.
pub struct Instrument {
    pads: usize,
    engine: Arc<SampleEngine>,
    state: Mutex<PadState>,
}

impl Instrument {
    /// Creates an instrument with the given number of pads, all empty and unmapped.
    pub fn new(pads: usize, engine: Arc<SampleEngine>) -> Instrument {
        engine.ensure_capacity(pads);
        Instrument {
            pads,
            engine,
            state: Mutex::new(PadState {
                mappings: MappingTable::new(pads),
                learning: LearningState::Idle,
            }),
        }
    }

    /// The number of pads.
    pub fn len(&self) -> usize {
        self.pads
    }

    pub fn is_empty(&self) -> bool {
        self.pads == 0
    }

    pub fn engine(&self) -> &Arc<SampleEngine> {
        &self.engine
    }

    fn check_pad(&self, pad: usize) -> Result<(), InstrumentError> {
        if pad >= self.pads {
            return Err(InstrumentError::NoSuchPad {
                pad,
                pads: self.pads,
            });
        }
        Ok(())
    }

    /// Starts learning a note for the pad, or cancels learning if the pad was
    /// already waiting for one. Returns the new state.
    pub fn toggle_learn(&self, pad: usize) -> Result<LearningState, InstrumentError> {
        self.check_pad(pad)?;
        let mut state = self.state.lock();
        state.learning = state.learning.toggle(pad);
        info!(pad, state = format!("{:?}", state.learning), "Toggled learning.");
        Ok(state.learning)
    }

    /// The current learning state.
    pub fn learning(&self) -> LearningState {
        self.state.lock().learning
    }

    /// Handles a raw MIDI message. Everything but a qualifying note-on is ignored.
    pub fn handle_midi(&self, raw: &[u8]) {
        match NoteOn::parse(raw) {
            Some(note_on) => self.handle_note_on(note_on.note),
            None => debug!(message = format!("{:02X?}", raw), "Ignoring MIDI message."),
        }
    }

    /// Completes learning with the note, or triggers the pad mapped to it.
    pub fn handle_note_on(&self, note: u8) {
        let target = {
            let mut state = self.state.lock();
            match state.learning.awaiting() {
                Some(pad) => {
                    // Clearing the note elsewhere, mapping it and leaving learn
                    // mode happen under one lock.
                    let previous = state.mappings.assign(pad, note);
                    state.learning = LearningState::Idle;
                    info!(pad, note, previous_pad = previous, "Learned note.");
                    None
                }
                None => state.mappings.pad_for(note),
            }
        };

        match target {
            Some(pad) => self.engine.trigger(pad),
            None => debug!(note, "Note is not mapped to a pad."),
        }
    }

    /// Reads the file and loads it into the pad. The file name becomes the pad's
    /// display name on success. On failure the pad is left unchanged.
    pub async fn drop_file(&self, pad: usize, path: &Path) -> Result<Duration, InstrumentError> {
        self.check_pad(pad)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| InstrumentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.drop_bytes(pad, &name, bytes).await
    }

    /// Loads already-read bytes into the pad under the given display name.
    pub async fn drop_bytes(
        &self,
        pad: usize,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<Duration, InstrumentError> {
        self.check_pad(pad)?;
        let duration = self
            .engine
            .load_named_sample(pad, Some(name), bytes)
            .await
            .map_err(|source| InstrumentError::Load { pad, source })?;

        info!(
            pad,
            sample = name,
            duration = duration.as_secs_f64(),
            "Sample assigned to pad."
        );
        Ok(duration)
    }

    /// A click: make sure output is running, then play the pad.
    pub async fn click(&self, pad: usize) -> Result<(), InstrumentError> {
        self.check_pad(pad)?;
        self.engine.resume_output().await;
        self.engine.trigger(pad);
        Ok(())
    }

    /// The note mapped to the pad.
    pub fn mapping(&self, pad: usize) -> Option<u8> {
        self.state.lock().mappings.note(pad)
    }

    /// The display name of the pad's sample.
    pub fn sample_name(&self, pad: usize) -> Option<String> {
        self.engine.sample_name(pad)
    }

    /// The observable state of one pad.
    pub fn pad(&self, pad: usize) -> Result<PadView, InstrumentError> {
        self.check_pad(pad)?;
        let name = self.engine.sample_name(pad);
        let state = self.state.lock();
        Ok(Self::view(&state, pad, name))
    }

    /// The observable state of every pad.
    pub fn pads(&self) -> Vec<PadView> {
        let names: Vec<_> = (0..self.pads)
            .map(|pad| self.engine.sample_name(pad))
            .collect();
        let state = self.state.lock();
        names
            .into_iter()
            .enumerate()
            .map(|(pad, name)| Self::view(&state, pad, name))
            .collect()
    }

    fn view(state: &PadState, pad: usize, sample_name: Option<String>) -> PadView {
        PadView {
            index: pad,
            sample_name,
            midi_note: state.mappings.note(pad),
            is_learning: state.learning.is_awaiting(pad),
        }
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Instrument")
            .field("pads", &self.pads)
            .field("mappings", &state.mappings)
            .field("learning", &state.learning)
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::{io::Write, sync::Arc};

    use crate::{
        audio::{mock, ContextState, OutputContext},
        config::DEFAULT_PADS,
        samples::{LoadError, SampleEngine},
        testutil::wav_bytes,
    };

    use super::{Instrument, InstrumentError, LearningState};

    fn instrument(backend: Arc<mock::Backend>) -> Instrument {
        Instrument::new(DEFAULT_PADS, Arc::new(SampleEngine::new(backend)))
    }

    #[tokio::test]
    async fn learn_load_trigger_and_relearn() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend.clone());

        instrument
            .drop_bytes(2, "kick.wav", wav_bytes(1, 44100, 4410))
            .await
            .expect("drop failed");
        assert_eq!(Some("kick.wav".to_string()), instrument.sample_name(2));
        assert!(instrument.engine().sample_duration(2) > 0.0);

        instrument.toggle_learn(2).expect("toggle failed");
        assert!(instrument.pad(2).expect("pad exists").is_learning);
        instrument.handle_midi(&[0x90, 40, 100]);
        assert_eq!(Some(40), instrument.mapping(2));
        assert_eq!(LearningState::Idle, instrument.learning());

        // A learned note triggers exactly one voice on its pad.
        instrument.handle_midi(&[0x90, 40, 90]);
        let context = backend.context().expect("context should exist");
        assert_eq!(vec![2], context.started_pads());

        // Relearning the same note on another pad moves it.
        instrument.toggle_learn(5).expect("toggle failed");
        instrument.handle_midi(&[0x90, 40, 127]);
        assert_eq!(None, instrument.mapping(2));
        assert_eq!(Some(40), instrument.mapping(5));

        // Pad 5 is empty, so the note is silent now.
        instrument.handle_midi(&[0x90, 40, 64]);
        assert_eq!(vec![2], context.started_pads());
    }

    #[tokio::test]
    async fn learn_can_be_cancelled() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend);

        instrument.toggle_learn(3).expect("toggle failed");
        instrument.toggle_learn(3).expect("toggle failed");
        assert_eq!(LearningState::Idle, instrument.learning());

        instrument.handle_note_on(60);
        assert!(instrument.pads().iter().all(|pad| pad.midi_note.is_none()));
    }

    #[tokio::test]
    async fn ignored_messages_change_nothing() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend.clone());
        instrument
            .drop_bytes(0, "snare.wav", wav_bytes(1, 44100, 441))
            .await
            .expect("drop failed");

        instrument.toggle_learn(0).expect("toggle failed");
        // Zero velocity, note-off and control change never complete learning.
        instrument.handle_midi(&[0x90, 38, 0]);
        instrument.handle_midi(&[0x80, 38, 64]);
        instrument.handle_midi(&[0xB0, 1, 127]);
        assert_eq!(LearningState::AwaitingPad(0), instrument.learning());
        assert_eq!(None, instrument.mapping(0));

        instrument.handle_midi(&[0x90, 38, 1]);
        instrument.handle_midi(&[0x90, 38, 0]);
        instrument.handle_midi(&[0x80, 38, 0]);
        let context = backend.context().expect("context should exist");
        assert!(context.started_pads().is_empty());
    }

    #[tokio::test]
    async fn unmapped_notes_never_trigger() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend.clone());
        for pad in 0..DEFAULT_PADS {
            instrument
                .drop_bytes(pad, &format!("pad{}.wav", pad), wav_bytes(1, 44100, 441))
                .await
                .expect("drop failed");
        }
        instrument.toggle_learn(2).expect("toggle failed");
        instrument.handle_midi(&[0x90, 40, 100]);
        assert_eq!(Some(40), instrument.mapping(2));

        // Neighbouring notes, note 0 on channel 16 and pad indices as notes.
        instrument.handle_midi(&[0x90, 41, 100]);
        instrument.handle_midi(&[0x90, 39, 127]);
        instrument.handle_midi(&[0x9F, 0, 100]);
        instrument.handle_midi(&[0x90, 2, 100]);

        let context = backend.context().expect("context should exist");
        assert!(context.started_pads().is_empty());

        instrument.handle_midi(&[0x9F, 40, 100]);
        assert_eq!(vec![2], context.started_pads());
    }

    #[tokio::test]
    async fn concurrent_drops_keep_name_with_sample() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend);

        let (older, newer) = tokio::join!(
            instrument.drop_bytes(3, "long.wav", wav_bytes(1, 44100, 44100)),
            instrument.drop_bytes(3, "short.wav", wav_bytes(1, 44100, 441)),
        );

        assert!(matches!(
            older,
            Err(InstrumentError::Load {
                pad: 3,
                source: LoadError::Superseded { pad: 3 }
            })
        ));
        assert!(newer.is_ok());
        assert_eq!(Some("short.wav".to_string()), instrument.sample_name(3));
        assert!((instrument.engine().sample_duration(3) - 0.01).abs() < 1e-9);
        let view = instrument.pad(3).expect("pad exists");
        assert_eq!(Some("short.wav".to_string()), view.sample_name);
    }

    #[tokio::test]
    async fn failed_drop_leaves_pad_unchanged() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend);
        instrument
            .drop_bytes(4, "clap.wav", wav_bytes(2, 44100, 441))
            .await
            .expect("drop failed");

        let result = instrument
            .drop_bytes(4, "notes.txt", b"these are not samples".to_vec())
            .await;

        assert!(matches!(
            result,
            Err(InstrumentError::Load {
                pad: 4,
                source: LoadError::Decode(_)
            })
        ));
        assert_eq!(Some("clap.wav".to_string()), instrument.sample_name(4));
        assert!((instrument.engine().sample_duration(4) - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn drop_file_reads_from_disk() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend);
        let mut file = tempfile::Builder::new()
            .prefix("hat")
            .suffix(".wav")
            .tempfile()
            .expect("failed to create temp file");
        file.write_all(&wav_bytes(1, 22050, 2205))
            .expect("write failed");

        let duration = instrument
            .drop_file(7, file.path())
            .await
            .expect("drop failed");

        assert!((duration.as_secs_f64() - 0.1).abs() < 1e-4);
        let name = instrument.sample_name(7).expect("name recorded");
        assert!(name.starts_with("hat") && name.ends_with(".wav"));

        let missing = instrument
            .drop_file(7, &file.path().with_extension("missing"))
            .await;
        assert!(matches!(missing, Err(InstrumentError::Read { .. })));
    }

    #[tokio::test]
    async fn click_resumes_then_plays() {
        let backend = Arc::new(mock::Backend::new());
        let instrument = instrument(backend.clone());
        instrument
            .drop_bytes(0, "tom.wav", wav_bytes(1, 44100, 441))
            .await
            .expect("drop failed");

        instrument.click(0).await.expect("click failed");

        let context = backend.context().expect("context should exist");
        assert_eq!(ContextState::Running, context.state());
        assert_eq!(vec![0], context.started_pads());

        // Clicking an empty pad is silent.
        instrument.click(1).await.expect("click failed");
        assert_eq!(vec![0], context.started_pads());
    }

    #[tokio::test]
    async fn pads_out_of_range_are_rejected() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend);

        assert!(matches!(
            instrument.toggle_learn(DEFAULT_PADS),
            Err(InstrumentError::NoSuchPad { pad: 12, pads: 12 })
        ));
        assert!(instrument.click(12).await.is_err());
        assert!(instrument.drop_bytes(99, "x.wav", Vec::new()).await.is_err());
        assert!(instrument.pad(12).is_err());
    }

    #[test]
    fn pad_view_display() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = instrument(backend);
        instrument.toggle_learn(0).expect("toggle failed");
        instrument.handle_note_on(36);
        instrument.toggle_learn(1).expect("toggle failed");

        let pads = instrument.pads();
        assert_eq!(DEFAULT_PADS, pads.len());
        assert_eq!("Pad 1 [empty] note 36", pads[0].to_string());
        assert_eq!("Pad 2 [empty] unmapped (learning)", pads[1].to_string());
    }
}
