//! The click pattern for one cycle.

use crate::engine::{ClickNote, SequenceEvent, TickPosition};

use super::config::{Signature, Subdivision};

pub const ACCENT_NOTE: &str = "A2";
pub const CLICK_NOTE: &str = "C2";
pub const BEAT_VELOCITY: f32 = 0.8;
pub const SUBDIVISION_VELOCITY: f32 = 0.2;

/// The note for a slot: accented on the first beat, full velocity on every
/// other beat, soft on subdivisions.
pub fn click_for(tick: TickPosition) -> ClickNote {
    match (tick.division_index, tick.subdivision_index) {
        (0, 0) => ClickNote::new(ACCENT_NOTE, BEAT_VELOCITY),
        (_, 0) => ClickNote::new(CLICK_NOTE, BEAT_VELOCITY),
        _ => ClickNote::new(CLICK_NOTE, SUBDIVISION_VELOCITY),
    }
}

/// `signature * subdivisions` events in play order.
pub fn sequence_events(signature: Signature, subdivisions: Subdivision) -> Vec<SequenceEvent> {
    (0..signature.beats())
        .flat_map(|division_index| {
            (0..subdivisions.count()).map(move |subdivision_index| {
                let tick = TickPosition {
                    division_index,
                    subdivision_index,
                };
                SequenceEvent {
                    note: click_for(tick),
                    tick,
                }
            })
        })
        .collect()
}
