//! Position within the cycle, broken down by beat and subdivision.

use crate::engine::TickPosition;

use super::config::{Signature, Subdivision};

/// One consistent reading of where the cursor is.
///
/// Every field derives from `progress` and the current signature and
/// subdivisions; a snapshot is always computed whole.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetronomeProgress {
    /// Position within the cycle, `[0, 1)`.
    pub progress: f64,
    /// Beat the cursor is in, `[0, signature)`.
    pub division_index: u32,
    /// Position within that beat, `[0, 1)`.
    pub progress_in_division: f64,
    /// Subdivision within the beat, `[0, subdivisions)`.
    pub subdivision_index_in_division: u32,
    /// Subdivision within the cycle, `[0, signature * subdivisions)`.
    pub subdivision_index: u32,
    /// Position within that subdivision, `[0, 1)`.
    pub progress_in_subdivision: f64,
}

/// Split `x * parts` into a whole part in `[0, parts)` and a fraction in `[0, 1)`.
fn split(x: f64, parts: u32) -> (u32, f64) {
    let scaled = x * parts as f64;
    let index = (scaled.floor() as u32).min(parts - 1);
    let fraction = (scaled - index as f64).clamp(0.0, 1.0 - f64::EPSILON);
    (index, fraction)
}

impl MetronomeProgress {
    /// Snapshot for a raw cycle position. Values outside `[0, 1)` wrap;
    /// non-finite values read as 0.
    pub fn compute(progress: f64, signature: Signature, subdivisions: Subdivision) -> Self {
        let progress = if progress.is_finite() {
            progress.rem_euclid(1.0)
        } else {
            0.0
        };
        let subs = subdivisions.count();

        let (division_index, progress_in_division) = split(progress, signature.beats());
        let (subdivision_index_in_division, progress_in_subdivision) =
            split(progress_in_division, subs);

        Self {
            progress,
            division_index,
            progress_in_division,
            subdivision_index_in_division,
            subdivision_index: division_index * subs + subdivision_index_in_division,
            progress_in_subdivision,
        }
    }

    /// Snapshot exactly at the start of a scheduled slot.
    pub fn at_tick(tick: TickPosition, signature: Signature, subdivisions: Subdivision) -> Self {
        let beats = signature.beats();
        let subs = subdivisions.count();
        let division_index = tick.division_index.min(beats - 1);
        let subdivision_index_in_division = tick.subdivision_index.min(subs - 1);
        let subdivision_index = division_index * subs + subdivision_index_in_division;

        Self {
            progress: subdivision_index as f64 / (beats * subs) as f64,
            division_index,
            progress_in_division: subdivision_index_in_division as f64 / subs as f64,
            subdivision_index_in_division,
            subdivision_index,
            progress_in_subdivision: 0.0,
        }
    }

    /// The zero reading published on stop.
    pub fn zero() -> Self {
        Self::default()
    }
}
