//! Draw-sync queue: defers callbacks from audio time to the next display frame.
//!
//! Slot callbacks run when a block is rendered, which is ahead of what the
//! listener hears. Anything visual is queued here against the audio frame it
//! belongs to and only runs once that frame is audible, on the next
//! `run_due` call made from the display loop.

use std::fmt;

use super::AudioTime;

/// A deferred visual callback.
pub type DrawCallback = Box<dyn FnOnce()>;

struct Pending {
    at: AudioTime,
    order: u64,
    callback: DrawCallback,
}

#[derive(Default)]
pub struct DrawQueue {
    pending: Vec<Pending>,
    next_order: u64,
}

impl DrawQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `callback` to run at the first frame at or after `at`.
    pub fn schedule(&mut self, callback: DrawCallback, at: AudioTime) {
        self.pending.push(Pending {
            at,
            order: self.next_order,
            callback,
        });
        self.next_order += 1;
    }

    /// Run every callback whose time is at or before `now`, oldest first.
    /// Callbacks scheduled for the same time run in scheduling order.
    ///
    /// Returns the number of callbacks run.
    pub fn run_due(&mut self, now: AudioTime) -> usize {
        let (mut due, rest): (Vec<Pending>, Vec<Pending>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.at <= now);
        self.pending = rest;

        due.sort_by_key(|p| (p.at, p.order));
        let count = due.len();
        for pending in due {
            (pending.callback)();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Debug for DrawQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawQueue")
            .field("pending", &self.pending.len())
            .finish()
    }
}
