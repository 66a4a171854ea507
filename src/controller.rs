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
use std::{io, path::PathBuf, sync::Arc};

use tokio::{
    sync::mpsc::{self, Sender},
    task::{JoinError, JoinHandle},
};
use tracing::{error, info, info_span, warn, Instrument as _};

use crate::{instrument::Instrument, midi};

pub mod keyboard;

/// How many driver events may queue before the driver blocks.
const EVENT_BUFFER: usize = 16;

/// How many MIDI messages may queue before the input callback blocks.
const MIDI_BUFFER: usize = 256;

/// Controller events produced by a UI driver.
#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    /// Loads the file into the pad.
    Load { pad: usize, path: PathBuf },

    /// Plays the pad, resuming output first.
    Hit(usize),

    /// Toggles note learning for the pad.
    Learn(usize),

    /// Prints the state of every pad.
    Show,
}

pub trait Driver: Send + Sync + 'static {
    /// Produces events until the user is done. Closing the sender stops the controller.
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Routes driver events and MIDI input to an instrument.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver and MIDI inputs.
    pub fn new(
        instrument: Arc<Instrument>,
        driver: Arc<dyn Driver>,
        midi_devices: Vec<Arc<dyn midi::Device>>,
    ) -> Controller {
        let events = Controller::route_events(instrument, driver, midi_devices);
        Controller {
            handle: tokio::spawn(events.instrument(info_span!("controller"))),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    async fn route_events(
        instrument: Arc<Instrument>,
        driver: Arc<dyn Driver>,
        midi_devices: Vec<Arc<dyn midi::Device>>,
    ) {
        let (midi_tx, mut midi_rx) = mpsc::channel(MIDI_BUFFER);
        for device in midi_devices.iter() {
            match device.watch_events(midi_tx.clone()) {
                Ok(()) => info!(device = device.name(), "Listening to MIDI input."),
                Err(e) => warn!(
                    device = device.name(),
                    err = e.to_string(),
                    "Unable to watch MIDI input."
                ),
            }
        }
        // Only the watchers hold senders from here on.
        drop(midi_tx);
        let mut midi_open = true;

        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
        let join_handle = driver.monitor_events(events_tx);

        info!(
            pads = instrument.len(),
            midi_inputs = midi_devices.len(),
            "Controller started."
        );

        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(event) => Controller::handle_event(&instrument, event),
                    None => break,
                },
                message = midi_rx.recv(), if midi_open => match message {
                    Some(message) => instrument.handle_midi(&message.data),
                    None => midi_open = false,
                },
            }
        }

        info!("Controller closing.");
        for device in midi_devices.iter() {
            device.stop_watch_events();
        }
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(err = e.to_string(), "Driver stopped with an error."),
            Err(e) => error!("Error waiting for event monitor to stop: {}", e),
        }
    }

    /// Learning and display happen inline. Loads and hits run as their own tasks so
    /// a slow decode never holds up note input.
    fn handle_event(instrument: &Arc<Instrument>, event: Event) {
        info!(event = format!("{:?}", event), "Received event.");

        match event {
            Event::Load { pad, path } => {
                let instrument = instrument.clone();
                tokio::spawn(async move {
                    if let Err(e) = instrument.drop_file(pad, &path).await {
                        error!(pad, err = e.to_string(), "Error loading sample.");
                    }
                });
            }
            Event::Hit(pad) => {
                let instrument = instrument.clone();
                tokio::spawn(async move {
                    if let Err(e) = instrument.click(pad).await {
                        error!(pad, err = e.to_string(), "Error playing pad.");
                    }
                });
            }
            Event::Learn(pad) => {
                if let Err(e) = instrument.toggle_learn(pad) {
                    error!(pad, err = e.to_string(), "Error toggling learning.");
                }
            }
            Event::Show => {
                for pad in instrument.pads() {
                    println!("{}", pad);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{io, io::Write, sync::Arc};

    use parking_lot::Mutex;
    use tokio::{
        sync::mpsc::{self, Receiver, Sender},
        task::JoinHandle,
    };

    use crate::{
        audio::mock,
        config::DEFAULT_PADS,
        instrument::{Instrument, LearningState},
        midi,
        samples::SampleEngine,
        testutil::{eventually, wav_bytes},
    };

    use super::{Controller, Driver, Event};

    /// A driver fed by the test through a channel.
    struct TestDriver {
        events: Mutex<Option<Receiver<Event>>>,
    }

    impl TestDriver {
        fn new() -> (Sender<Event>, TestDriver) {
            let (tx, rx) = mpsc::channel(8);
            (
                tx,
                TestDriver {
                    events: Mutex::new(Some(rx)),
                },
            )
        }
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.lock().take();
            tokio::spawn(async move {
                if let Some(mut events) = events {
                    while let Some(event) = events.recv().await {
                        if events_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(())
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn routes_driver_and_midi_events() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = Arc::new(Instrument::new(
            DEFAULT_PADS,
            Arc::new(SampleEngine::new(backend.clone())),
        ));
        instrument
            .drop_bytes(2, "kick.wav", wav_bytes(1, 44100, 441))
            .await
            .expect("drop failed");

        let device = midi::test::Device::get("mock-pads");
        let input: Arc<dyn midi::Device> = Arc::new(device.clone());
        let (events_tx, driver) = TestDriver::new();
        let mut controller = Controller::new(instrument.clone(), Arc::new(driver), vec![input]);
        eventually(|| device.is_watched(), "MIDI device was never watched");

        events_tx.send(Event::Learn(2)).await.expect("send failed");
        eventually(
            || instrument.learning() == LearningState::AwaitingPad(2),
            "learning never started",
        );

        assert!(device.mock_event(&[0x90, 40, 100]));
        eventually(|| instrument.mapping(2) == Some(40), "note never learned");

        let context = backend.context().expect("context should exist");
        assert!(device.mock_event(&[0x90, 40, 100]));
        eventually(|| context.started_pads() == vec![2], "note never played");

        events_tx.send(Event::Hit(2)).await.expect("send failed");
        eventually(
            || context.started_pads() == vec![2, 2],
            "hit never played",
        );

        drop(events_tx);
        controller.join().await.expect("controller failed");
        assert!(!device.is_watched());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_event_reads_file() {
        let backend = Arc::new(mock::Backend::running());
        let instrument = Arc::new(Instrument::new(
            DEFAULT_PADS,
            Arc::new(SampleEngine::new(backend)),
        ));
        let mut file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .expect("failed to create temp file");
        file.write_all(&wav_bytes(2, 44100, 441))
            .expect("write failed");

        let (events_tx, driver) = TestDriver::new();
        let mut controller = Controller::new(instrument.clone(), Arc::new(driver), Vec::new());

        events_tx
            .send(Event::Load {
                pad: 11,
                path: file.path().to_path_buf(),
            })
            .await
            .expect("send failed");
        // Out of range pads are logged and skipped.
        events_tx.send(Event::Learn(40)).await.expect("send failed");

        eventually(
            || instrument.sample_name(11).is_some(),
            "sample was never loaded",
        );
        assert_eq!(LearningState::Idle, instrument.learning());

        drop(events_tx);
        controller.join().await.expect("controller failed");
    }
}
