//! Pulseshape: a visual metronome timing core.
//!
//! A pulsing shape, a sweeping cursor and sample-accurate clicks, all driven
//! by one musical clock.

pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod instrument;
pub mod metronome;
pub mod render;

pub use error::{Error, Result};
