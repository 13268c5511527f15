//! Time signature, subdivision and tempo settings.
//!
//! `Signature` and `Subdivision` are closed sets. Integers coming from the
//! CLI or a settings file are validated once at the boundary, so nothing
//! inside the core ever holds an unsupported value.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::clock::NoteValue;
use crate::error::{Error, Result};

/// Beats per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u32")]
pub enum Signature {
    Three,
    #[default]
    Four,
    Five,
    Six,
    Seven,
}

impl Signature {
    pub const ALL: [Signature; 5] = [
        Signature::Three,
        Signature::Four,
        Signature::Five,
        Signature::Six,
        Signature::Seven,
    ];

    pub fn beats(self) -> u32 {
        match self {
            Signature::Three => 3,
            Signature::Four => 4,
            Signature::Five => 5,
            Signature::Six => 6,
            Signature::Seven => 7,
        }
    }
}

impl TryFrom<u32> for Signature {
    type Error = Error;

    fn try_from(beats: u32) -> Result<Self> {
        Signature::ALL
            .into_iter()
            .find(|s| s.beats() == beats)
            .ok_or(Error::InvalidSignature(beats))
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let beats: u32 = s.trim().parse().map_err(|_| Error::InvalidSignature(0))?;
        Signature::try_from(beats)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/4", self.beats())
    }
}

/// Subdivisions per beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "u32")]
pub enum Subdivision {
    #[default]
    One,
    Two,
    Three,
    Four,
    Six,
}

impl Subdivision {
    pub const ALL: [Subdivision; 5] = [
        Subdivision::One,
        Subdivision::Two,
        Subdivision::Three,
        Subdivision::Four,
        Subdivision::Six,
    ];

    pub fn count(self) -> u32 {
        match self {
            Subdivision::One => 1,
            Subdivision::Two => 2,
            Subdivision::Three => 3,
            Subdivision::Four => 4,
            Subdivision::Six => 6,
        }
    }

    /// Slot length of a sequence with this many subdivisions per beat.
    pub fn note_value(self) -> NoteValue {
        match self {
            Subdivision::One => NoteValue::Quarter,
            Subdivision::Two => NoteValue::Eighth,
            Subdivision::Three => NoteValue::EighthTriplet,
            Subdivision::Four => NoteValue::Sixteenth,
            Subdivision::Six => NoteValue::SixteenthTriplet,
        }
    }
}

impl TryFrom<u32> for Subdivision {
    type Error = Error;

    fn try_from(count: u32) -> Result<Self> {
        Subdivision::ALL
            .into_iter()
            .find(|s| s.count() == count)
            .ok_or(Error::InvalidSubdivisions(count))
    }
}

impl FromStr for Subdivision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let count: u32 = s.trim().parse().map_err(|_| Error::InvalidSubdivisions(0))?;
        Subdivision::try_from(count)
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count())
    }
}

/// Validate a tempo.
pub fn check_bpm(bpm: f64) -> Result<f64> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(Error::InvalidBpm(bpm))
    }
}

/// Initial metronome settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetronomeConfig {
    pub signature: Signature,
    pub subdivisions: Subdivision,
    pub bpm: f64,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            signature: Signature::default(),
            subdivisions: Subdivision::default(),
            bpm: 90.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_enumerated_signatures() {
        for beats in 3u32..=7 {
            assert_eq!(Signature::try_from(beats).unwrap().beats(), beats);
        }
    }

    #[test]
    fn rejects_other_signatures() {
        for beats in [0u32, 1, 2, 8, 12] {
            assert!(matches!(
                Signature::try_from(beats),
                Err(Error::InvalidSignature(b)) if b == beats
            ));
        }
    }

    #[test]
    fn rejects_five_subdivisions() {
        assert!(matches!(
            Subdivision::try_from(5u32),
            Err(Error::InvalidSubdivisions(5))
        ));
        assert_eq!(Subdivision::try_from(6u32).unwrap(), Subdivision::Six);
    }

    #[test]
    fn note_values() {
        let strings: Vec<&str> = Subdivision::ALL
            .iter()
            .map(|s| s.note_value().as_str())
            .collect();
        assert_eq!(strings, vec!["4n", "8n", "8t", "16n", "16t"]);
    }

    #[test]
    fn slots_fill_exactly_one_beat() {
        for sub in Subdivision::ALL {
            assert_eq!(
                sub.note_value().ticks() * sub.count() as u64,
                crate::clock::TICKS_PER_BEAT
            );
        }
    }

    #[test]
    fn parse_from_strings() {
        assert_eq!(" 7 ".parse::<Signature>().unwrap(), Signature::Seven);
        assert!("four".parse::<Signature>().is_err());
        assert_eq!("3".parse::<Subdivision>().unwrap(), Subdivision::Three);
    }

    #[test]
    fn deserialize_validates() {
        let sig: Signature = serde_yaml::from_str("6").unwrap();
        assert_eq!(sig, Signature::Six);
        assert!(serde_yaml::from_str::<Subdivision>("5").is_err());
    }

    #[test]
    fn bpm_must_be_positive_and_finite() {
        assert_eq!(check_bpm(120.0).unwrap(), 120.0);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(check_bpm(bad).is_err());
        }
    }

    #[test]
    fn defaults() {
        let config = MetronomeConfig::default();
        assert_eq!(config.signature, Signature::Four);
        assert_eq!(config.subdivisions, Subdivision::One);
        assert_eq!(config.bpm, 90.0);
    }
}
