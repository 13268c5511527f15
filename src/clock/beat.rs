//! Musical time in integer ticks.
//!
//! 960 PPQN divides evenly by every slot length the metronome schedules
//! (quarter, eighth, eighth triplet, sixteenth, sixteenth triplet), so slot
//! boundaries never accumulate floating-point error. Conversion to frames
//! happens only at the rendering boundary.

/// Ticks per quarter note (beat).
pub const TICKS_PER_BEAT: u64 = 960;

/// Musical time measured in ticks at [`TICKS_PER_BEAT`] resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Beat {
    ticks: u64,
}

impl Beat {
    /// The start of the timeline.
    pub const ZERO: Beat = Beat { ticks: 0 };

    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Whole beats (quarter notes).
    pub fn from_beats(beats: u32) -> Self {
        Self {
            ticks: beats as u64 * TICKS_PER_BEAT,
        }
    }

    pub fn ticks(self) -> u64 {
        self.ticks
    }

    /// Fraction of a `cycle` already covered at this position, in `[0, 1)`.
    ///
    /// Returns 0 for an empty cycle.
    pub fn fraction_of(self, cycle: Beat) -> f64 {
        if cycle.ticks == 0 {
            return 0.0;
        }
        (self.ticks % cycle.ticks) as f64 / cycle.ticks as f64
    }
}
