//! Note values used as sequence slot lengths.

use std::fmt;

use super::beat::TICKS_PER_BEAT;

/// Length of one sequence slot, written the way transports spell it
/// (`4n`, `8n`, `8t`, `16n`, `16t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteValue {
    Quarter,
    Eighth,
    EighthTriplet,
    Sixteenth,
    SixteenthTriplet,
    /// Used for click note lengths only.
    SixtyFourth,
}

impl NoteValue {
    /// Slot length in ticks.
    pub fn ticks(self) -> u64 {
        match self {
            NoteValue::Quarter => TICKS_PER_BEAT,
            NoteValue::Eighth => TICKS_PER_BEAT / 2,
            NoteValue::EighthTriplet => TICKS_PER_BEAT / 3,
            NoteValue::Sixteenth => TICKS_PER_BEAT / 4,
            NoteValue::SixteenthTriplet => TICKS_PER_BEAT / 6,
            NoteValue::SixtyFourth => TICKS_PER_BEAT / 16,
        }
    }

    /// Duration in seconds at the given tempo.
    pub fn seconds(self, bpm: f64) -> f64 {
        self.ticks() as f64 / TICKS_PER_BEAT as f64 * 60.0 / bpm
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteValue::Quarter => "4n",
            NoteValue::Eighth => "8n",
            NoteValue::EighthTriplet => "8t",
            NoteValue::Sixteenth => "16n",
            NoteValue::SixteenthTriplet => "16t",
            NoteValue::SixtyFourth => "64n",
        }
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplets_fit_three_per_parent() {
        assert_eq!(NoteValue::EighthTriplet.ticks() * 3, TICKS_PER_BEAT);
        assert_eq!(NoteValue::SixteenthTriplet.ticks() * 6, TICKS_PER_BEAT);
    }

    #[test]
    fn transport_spelling() {
        assert_eq!(NoteValue::Quarter.to_string(), "4n");
        assert_eq!(NoteValue::EighthTriplet.to_string(), "8t");
        assert_eq!(NoteValue::SixteenthTriplet.to_string(), "16t");
    }

    #[test]
    fn sixty_fourth_at_120_bpm() {
        // A quarter is 0.5 s at 120 BPM; a 64th is a sixteenth of that.
        assert!((NoteValue::SixtyFourth.seconds(120.0) - 0.03125).abs() < 1e-12);
    }
}
