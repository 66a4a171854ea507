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
use std::{error::Error, io, path::PathBuf, sync::Arc};

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use drumpad::{
    audio,
    config::Drumpad,
    controller::{keyboard, Controller},
    instrument::Instrument,
    midi,
    samples::SampleEngine,
};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A twelve pad sample player with MIDI note learning."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Starts the drumpad, reading commands from the keyboard.
    Start {
        /// The path to the drumpad config. Defaults are used when omitted.
        config_path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start { config_path } => {
            let config = match config_path {
                Some(path) => Drumpad::deserialize(&PathBuf::from(path))?,
                None => Drumpad::default(),
            };

            let backend = audio::get_backend(&config.audio());
            info!(backend = backend.to_string(), "Using audio output.");
            let engine = Arc::new(SampleEngine::new(backend));
            let instrument = Arc::new(Instrument::new(config.pads(), engine));
            let midi_devices = midi::discover(&config.midi());

            let driver = Arc::new(keyboard::Driver::new(config.pads()));
            let mut controller = Controller::new(instrument, driver, midi_devices);
            controller.join().await?;
        }
    }

    Ok(())
}
