//! Startup settings: loads optional ~/.pulseshape/config.yaml.
//!
//! Settings are read once and never written back. Every field is optional;
//! anything missing takes its default.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::geometry::{CursorMode, EasingMass, ShapeKind};
use crate::instrument::VoiceKind;
use crate::metronome::{MetronomeConfig, Signature, Subdivision};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub metronome: MetronomeSettings,
    pub display: DisplaySettings,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetronomeSettings {
    pub signature: Signature,
    pub subdivisions: Subdivision,
    pub bpm: f64,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        let config = MetronomeConfig::default();
        Self {
            signature: config.signature,
            subdivisions: config.subdivisions,
            bpm: config.bpm,
        }
    }
}

impl MetronomeSettings {
    pub fn config(&self) -> MetronomeConfig {
        MetronomeConfig {
            signature: self.signature,
            subdivisions: self.subdivisions,
            bpm: self.bpm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub shape: ShapeKind,
    pub cursor_mode: CursorMode,
    pub cursor_mass: EasingMass,
    /// Display frames per second driving the progress poll.
    pub frame_rate: u32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            shape: ShapeKind::default(),
            cursor_mode: CursorMode::default(),
            cursor_mass: EasingMass::default(),
            frame_rate: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub voice: VoiceKind,
    pub volume: f32,
    /// Frames per rendered block.
    pub block_size: u32,
    /// How far ahead of playback blocks are rendered.
    pub lookahead_ms: u32,
    /// Seed for voices with a noise component.
    pub seed: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            voice: VoiceKind::default(),
            volume: 0.8,
            block_size: 512,
            lookahead_ms: 100,
            seed: 42,
        }
    }
}

impl Settings {
    /// ~/.pulseshape/config.yaml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pulseshape").join("config.yaml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file gives the defaults; a missing explicit file
    /// or malformed YAML is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("no settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = serde_yaml::from_str(&content)?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn defaults_match_the_app() {
        let s = Settings::default();
        assert_eq!(s.metronome.signature, Signature::Four);
        assert_eq!(s.metronome.subdivisions, Subdivision::One);
        assert_eq!(s.metronome.bpm, 90.0);
        assert_eq!(s.display.cursor_mode, CursorMode::Mass);
        assert_eq!(s.display.cursor_mass.get(), 5);
        assert_eq!(s.audio.block_size, 512);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let s: Settings = serde_yaml::from_str("metronome:\n  bpm: 120\n").unwrap();
        assert_eq!(s.metronome.bpm, 120.0);
        assert_eq!(s.metronome.signature, Signature::Four);
        assert_eq!(s.audio, AudioSettings::default());
    }

    #[test]
    fn empty_mapping_is_all_defaults() {
        let s: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
metronome:
  signature: 7
  subdivisions: 3
  bpm: 66
display:
  shape: circle
  cursor_mode: linear
  cursor_mass: 2
  frame_rate: 120
audio:
  voice: woodblock
  volume: 0.5
  block_size: 256
  lookahead_ms: 50
  seed: 7
"#
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.metronome.signature, Signature::Seven);
        assert_eq!(s.metronome.subdivisions, Subdivision::Three);
        assert_eq!(s.display.shape, ShapeKind::Circle);
        assert_eq!(s.display.frame_rate, 120);
        assert_eq!(s.audio.voice, VoiceKind::Woodblock);
        assert_eq!(s.audio.seed, 7);
        assert_eq!(s.metronome.config().bpm, 66.0);
    }

    #[test]
    fn unsupported_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "metronome:\n  subdivisions: 5").unwrap();
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        assert!(matches!(Settings::load(Some(&path)), Err(Error::Io(_))));
    }
}
