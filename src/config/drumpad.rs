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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use super::{audio::Audio, error::ConfigError, midi::Midi};

/// The number of pads on the instrument when not configured.
pub const DEFAULT_PADS: usize = 12;

/// The largest supported pad count, one pad per MIDI note.
pub const MAX_PADS: usize = 128;

/// The top level drumpad configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Drumpad {
    /// The number of pads.
    pads: Option<usize>,

    /// The audio output configuration.
    audio: Option<Audio>,

    /// The MIDI input configuration.
    midi: Option<Midi>,
}

impl Drumpad {
    /// Loads and validates the configuration at the given path. The format is
    /// inferred from the file extension.
    pub fn deserialize(path: &Path) -> Result<Drumpad, ConfigError> {
        let drumpad: Drumpad = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        drumpad.validate()?;
        Ok(drumpad)
    }

    /// Checks that configured values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pads = self.pads();
        if pads == 0 || pads > MAX_PADS {
            return Err(ConfigError::Invalid(format!(
                "pads must be between 1 and {}, got {}",
                MAX_PADS, pads
            )));
        }
        if self.audio().sample_rate() == Some(0) {
            return Err(ConfigError::Invalid(
                "audio sample_rate must be greater than zero".to_string(),
            ));
        }
        if self.audio().buffer_size() == Some(0) {
            return Err(ConfigError::Invalid(
                "audio buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the number of pads (default: 12).
    pub fn pads(&self) -> usize {
        self.pads.unwrap_or(DEFAULT_PADS)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// Returns the MIDI configuration.
    pub fn midi(&self) -> Midi {
        self.midi.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use config::{Config, File, FileFormat};

    use super::{Drumpad, DEFAULT_PADS};
    use crate::config::ConfigError;

    fn parse(yaml: &str) -> Drumpad {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .expect("failed to build config")
            .try_deserialize()
            .expect("failed to deserialize config")
    }

    #[test]
    fn full_config() {
        let drumpad = parse(
            r#"
            pads: 16
            audio:
              device: "UltraLite-mk5"
              sample_rate: 48000
              buffer_size: 256
            midi:
              inputs:
                - "Launchpad"
                - "nanoPAD"
            "#,
        );

        assert!(drumpad.validate().is_ok());
        assert_eq!(16, drumpad.pads());
        assert_eq!("UltraLite-mk5", drumpad.audio().device());
        assert_eq!(Some(48000), drumpad.audio().sample_rate());
        assert_eq!(Some(256), drumpad.audio().buffer_size());
        assert_eq!(
            Some(&["Launchpad".to_string(), "nanoPAD".to_string()][..]),
            drumpad.midi().inputs()
        );
    }

    #[test]
    fn defaults() {
        let drumpad = parse("audio: {}\n");

        assert!(drumpad.validate().is_ok());
        assert_eq!(DEFAULT_PADS, drumpad.pads());
        assert_eq!("default", drumpad.audio().device());
        assert_eq!(None, drumpad.audio().sample_rate());
        assert_eq!(None, drumpad.midi().inputs());
    }

    #[test]
    fn invalid_pads() {
        assert!(matches!(
            parse("pads: 0\n").validate(),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse("pads: 129\n").validate(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn deserialize_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("failed to create temp file");
        writeln!(file, "pads: 8\naudio:\n  device: mock-output").expect("write failed");

        let drumpad = Drumpad::deserialize(file.path()).expect("failed to load config");
        assert_eq!(8, drumpad.pads());
        assert_eq!("mock-output", drumpad.audio().device());
    }

    #[test]
    fn deserialize_rejects_invalid_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("failed to create temp file");
        writeln!(file, "pads: 500").expect("write failed");

        assert!(matches!(
            Drumpad::deserialize(file.path()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
