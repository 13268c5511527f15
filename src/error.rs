//! Crate-wide error type.

use crate::audio::AudioError;

/// Result alias carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the metronome, its collaborators and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Beats per cycle outside the supported set.
    #[error("invalid time signature {0}: expected one of 3, 4, 5, 6, 7")]
    InvalidSignature(u32),
    /// Subdivisions per beat outside the supported set.
    #[error("invalid subdivision count {0}: expected one of 1, 2, 3, 4, 6")]
    InvalidSubdivisions(u32),
    /// Tempo that is zero, negative or not finite.
    #[error("invalid tempo {0}: expected a positive number of beats per minute")]
    InvalidBpm(f64),
    /// Easing mass outside `0..=7`.
    #[error("invalid easing mass {0}: expected 0 to 7")]
    InvalidEasingMass(u8),
    /// A polygon needs at least three sides.
    #[error("cannot build a polygon of {0} sides (need at least 3)")]
    TooFewSides(usize),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("settings: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
}
