//! Click voices: synthesized sounds the scheduler triggers at each slot.

pub mod envelope;
pub mod membrane;
pub mod pitch;
pub mod woodblock;

pub use membrane::Membrane;
pub use pitch::{midi_to_freq, note_frequency, parse_note_name};
pub use woodblock::Woodblock;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::engine::{ClickNote, RenderContext};

/// Common interface for click voices.
///
/// A voice renders one click into interleaved sample data. Unknown note
/// names render as silence.
pub trait Voice: Send {
    /// Render a single click into interleaved samples.
    fn render(&self, note: &ClickNote, ctx: &RenderContext) -> Vec<f32>;

    /// Human-readable name for this voice.
    fn name(&self) -> &str;
}

/// Selectable click voice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceKind {
    #[default]
    Membrane,
    Woodblock,
}

impl VoiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoiceKind::Membrane => "membrane",
            VoiceKind::Woodblock => "woodblock",
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "membrane" => Ok(VoiceKind::Membrane),
            "woodblock" => Ok(VoiceKind::Woodblock),
            other => Err(format!("unknown voice '{other}'")),
        }
    }
}

/// Build the voice for `kind`. `seed` feeds voices with a noise component.
pub fn build_voice(kind: VoiceKind, seed: u64) -> Box<dyn Voice> {
    match kind {
        VoiceKind::Membrane => Box::new(Membrane::new()),
        VoiceKind::Woodblock => Box::new(Woodblock::new(seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_by_kind() {
        assert_eq!(build_voice(VoiceKind::Membrane, 0).name(), "membrane");
        assert_eq!(build_voice(VoiceKind::Woodblock, 0).name(), "woodblock");
    }

    #[test]
    fn parse_kind() {
        assert_eq!("Woodblock".parse::<VoiceKind>(), Ok(VoiceKind::Woodblock));
        assert!("cowbell".parse::<VoiceKind>().is_err());
    }

    #[test]
    fn kind_from_yaml() {
        let kind: VoiceKind = serde_yaml::from_str("woodblock").unwrap();
        assert_eq!(kind, VoiceKind::Woodblock);
    }
}
