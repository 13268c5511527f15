//! Repeating click sequence: an ordered list of events played one per slot.
//!
//! A `Sequence` is pure data: it knows where its slots fall on the transport
//! timeline and how far through its loop a given position is. The scheduler
//! owns the callback that turns slots into sound.

use crate::clock::{Beat, NoteValue};

/// The note a slot triggers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickNote {
    /// Note name, e.g. `"A2"`.
    pub name: String,
    /// Velocity in `0.0..=1.0`.
    pub velocity: f32,
}

impl ClickNote {
    pub fn new(name: impl Into<String>, velocity: f32) -> Self {
        Self {
            name: name.into(),
            velocity,
        }
    }
}

/// Where in the bar a slot sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickPosition {
    /// Beat within the bar.
    pub division_index: u32,
    /// Subdivision within that beat.
    pub subdivision_index: u32,
}

/// One scheduled unit of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEvent {
    pub note: ClickNote,
    pub tick: TickPosition,
}

/// Handle to a sequence owned by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(pub u64);

/// Where a sequence starts relative to the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceStart {
    /// Slot 0 at transport position zero.
    Beginning,
    /// Aligned so that the sequence's progress at the audible position is
    /// the given fraction of its loop.
    Progress(f64),
}

/// A slot of a sequence falling inside a rendered window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index into the sequence's events.
    pub index: usize,
    /// Transport position of the slot.
    pub at: Beat,
}

#[derive(Debug, Clone)]
pub struct Sequence {
    events: Vec<SequenceEvent>,
    note_value: NoteValue,
    /// Transport tick of slot 0. May be negative when aligned mid-loop
    /// close to the start of the timeline.
    anchor: Option<i64>,
}

impl Sequence {
    /// A stopped sequence.
    pub fn new(events: Vec<SequenceEvent>, note_value: NoteValue) -> Self {
        Self {
            events,
            note_value,
            anchor: None,
        }
    }

    pub fn events(&self) -> &[SequenceEvent] {
        &self.events
    }

    pub fn note_value(&self) -> NoteValue {
        self.note_value
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.anchor.is_some()
    }

    /// One full pass over all events.
    pub fn loop_length(&self) -> Beat {
        Beat::from_ticks(self.events.len() as u64 * self.note_value.ticks())
    }

    /// Start so that the sequence is at `start` when the transport is at `position`.
    pub fn start(&mut self, start: SequenceStart, position: Beat) {
        let anchor = match start {
            SequenceStart::Beginning => 0,
            SequenceStart::Progress(progress) => {
                let loop_ticks = self.loop_length().ticks() as f64;
                let offset = (progress.clamp(0.0, 1.0) * loop_ticks).round() as i64;
                position.ticks() as i64 - offset
            }
        };
        self.anchor = Some(anchor);
    }

    pub fn stop(&mut self) {
        self.anchor = None;
    }

    /// Fraction of the loop played at `position`, in `[0, 1)`.
    ///
    /// Zero while stopped or before the anchor is reached.
    pub fn progress(&self, position: Beat) -> f64 {
        let (Some(anchor), loop_ticks) = (self.anchor, self.loop_length().ticks() as i64) else {
            return 0.0;
        };
        let elapsed = position.ticks() as i64 - anchor;
        if loop_ticks == 0 || elapsed < 0 {
            return 0.0;
        }
        elapsed.rem_euclid(loop_ticks) as f64 / loop_ticks as f64
    }

    /// Slots whose position falls in `[from, to)`, in time order.
    pub fn slots_in(&self, from: Beat, to: Beat) -> Vec<Slot> {
        let Some(anchor) = self.anchor else {
            return Vec::new();
        };
        if self.events.is_empty() || to <= from {
            return Vec::new();
        }

        let slot = self.note_value.ticks() as i64;
        let start = (from.ticks() as i64).max(anchor);
        let end = to.ticks() as i64;

        // First slot index at or after `start`.
        let mut k = (start - anchor + slot - 1).div_euclid(slot);
        let mut slots = Vec::new();
        loop {
            let at = anchor + k * slot;
            if at >= end {
                break;
            }
            slots.push(Slot {
                index: k.rem_euclid(self.events.len() as i64) as usize,
                at: Beat::from_ticks(at as u64),
            });
            k += 1;
        }
        slots
    }
}
