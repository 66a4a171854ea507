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
use std::{io, path::PathBuf};

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const HIT: &str = "hit";
const LEARN: &str = "learn";
const LOAD: &str = "load";
const PADS: &str = "pads";
const QUIT: &str = "quit";

/// A driver that reads pad commands from the keyboard. Pads are numbered from 1.
pub struct Driver {
    pads: usize,
}

impl Driver {
    pub fn new(pads: usize) -> Driver {
        Driver { pads }
    }

    /// Reads and dispatches one command. Returns false once the user quits or
    /// input ends.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        pads: usize,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} N, {} N, {} N PATH, {}, {}): ",
            HIT, LEARN, LOAD, PADS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let event = match parse_command(input.trim(), pads) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(false),
            Err(reason) => {
                warn!(input = input.trim(), reason, "Unrecognized input");
                return Ok(true);
            }
        };
        events_tx.blocking_send(event).map_err(io::Error::other)?;
        Ok(true)
    }
}

/// Parses a command line. Ok(None) means quit.
fn parse_command(input: &str, pads: usize) -> Result<Option<Event>, String> {
    let (command, rest) = input
        .split_once(char::is_whitespace)
        .unwrap_or((input, ""));

    match command.to_lowercase().as_str() {
        HIT => Ok(Some(Event::Hit(parse_pad(rest, pads)?))),
        LEARN => Ok(Some(Event::Learn(parse_pad(rest, pads)?))),
        LOAD => {
            let (pad, path) = rest
                .trim()
                .split_once(char::is_whitespace)
                .ok_or("load needs a pad and a file")?;
            Ok(Some(Event::Load {
                pad: parse_pad(pad, pads)?,
                path: PathBuf::from(path.trim()),
            }))
        }
        PADS => Ok(Some(Event::Show)),
        QUIT => Ok(None),
        _ => Err(format!("unknown command {}", command)),
    }
}

fn parse_pad(input: &str, pads: usize) -> Result<usize, String> {
    let number: usize = input
        .trim()
        .parse()
        .map_err(|_| format!("{} is not a pad number", input.trim()))?;
    if number == 0 || number > pads {
        return Err(format!("pad must be between 1 and {}", pads));
    }
    Ok(number - 1)
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let pads = self.pads;
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, pads, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}
