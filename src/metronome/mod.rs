//! Metronome: owns musical time and publishes it to the display.
//!
//! A [`Metronome`] drives an [`AudioScheduler`] it owns: it keeps the
//! transport's tempo and time signature in step with its own settings,
//! rebuilds the click sequence when the bar layout changes, and turns the
//! scheduler's clock into two kinds of events:
//!
//! - `progress`, published from [`Metronome::frame`] once per display frame
//!   while running, for smooth cursor motion;
//! - `tick` / `subdivisionTick` / `subdivisionOnlyTick`, fired once per
//!   sequence slot. The slot callback sounds the click at its exact audio
//!   time and defers the event to the first display frame at or after that
//!   time, so the display never runs ahead of what is heard.

pub mod config;
pub mod events;
pub mod pattern;
pub mod progress;

use std::rc::Rc;

use tracing::debug;

pub use config::{check_bpm, MetronomeConfig, Signature, Subdivision};
pub use events::{
    in_listener, route_panics_to_tracing, Emitter, EventKind, Listeners, MetronomeEvent,
    SubdivisionTick, Subscription, Tick,
};
pub use progress::MetronomeProgress;

use crate::clock::PlayState;
use crate::engine::{
    AudioScheduler, ScheduledSlot, SequenceId, SequenceStart, SlotCallback, SlotContext,
    TickPosition,
};
use crate::error::Result;

/// Handle of the armed display-frame poll. Re-armed with a fresh id every
/// frame, cleared on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollHandle(u64);

/// Everything a view needs in one immutable reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetronomeState {
    pub signature: Signature,
    pub subdivisions: Subdivision,
    pub bpm: f64,
    pub running: bool,
    pub progress: MetronomeProgress,
}

pub struct Metronome<S: AudioScheduler> {
    scheduler: S,
    signature: Signature,
    subdivisions: Subdivision,
    bpm: f64,
    sequence: SequenceId,
    poll: Option<PollHandle>,
    next_poll: u64,
    emitter: Rc<Emitter>,
}

impl<S: AudioScheduler> Metronome<S> {
    /// Configure `scheduler` and create the click sequence, stopped.
    pub fn new(mut scheduler: S, config: MetronomeConfig) -> Result<Self> {
        let bpm = check_bpm(config.bpm)?;
        scheduler.set_time_signature(config.signature.beats());
        scheduler.set_bpm(bpm);

        let emitter = Rc::new(Emitter::new());
        let sequence = create_sequence(
            &mut scheduler,
            &emitter,
            config.signature,
            config.subdivisions,
        );
        scheduler.start_sequence(sequence, SequenceStart::Beginning);

        Ok(Self {
            scheduler,
            signature: config.signature,
            subdivisions: config.subdivisions,
            bpm,
            sequence,
            poll: None,
            next_poll: 0,
            emitter,
        })
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn subdivisions(&self) -> Subdivision {
        self.subdivisions
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Transport started and the display poll armed.
    pub fn running(&self) -> bool {
        self.scheduler.state() == PlayState::Started && self.poll.is_some()
    }

    pub fn poll_handle(&self) -> Option<PollHandle> {
        self.poll
    }

    /// Current position, computed from the sequence's progress on each call.
    pub fn progress(&self) -> MetronomeProgress {
        MetronomeProgress::compute(
            self.scheduler.sequence_progress(self.sequence),
            self.signature,
            self.subdivisions,
        )
    }

    pub fn state(&self) -> MetronomeState {
        MetronomeState {
            signature: self.signature,
            subdivisions: self.subdivisions,
            bpm: self.bpm,
            running: self.running(),
            progress: self.progress(),
        }
    }

    pub fn set_signature(&mut self, signature: Signature) {
        if signature == self.signature {
            return;
        }
        debug!(from = %self.signature, to = %signature, "signature changed");
        self.signature = signature;
        self.scheduler.set_time_signature(signature.beats());
        self.rebuild_sequence();
    }

    pub fn set_subdivisions(&mut self, subdivisions: Subdivision) {
        if subdivisions == self.subdivisions {
            return;
        }
        debug!(from = %self.subdivisions, to = %subdivisions, "subdivisions changed");
        self.subdivisions = subdivisions;
        self.rebuild_sequence();
    }

    /// Forwarded to the transport; the sequence is untouched.
    pub fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        let bpm = check_bpm(bpm)?;
        debug!(bpm, "tempo changed");
        self.bpm = bpm;
        self.scheduler.set_bpm(bpm);
        Ok(())
    }

    /// Start the transport and the display poll. Each is only started if it
    /// is not already running.
    pub fn start(&mut self) {
        if self.scheduler.state() != PlayState::Started {
            self.scheduler
                .start_sequence(self.sequence, SequenceStart::Beginning);
            self.scheduler.start();
            debug!("transport started");
        }
        if self.poll.is_none() {
            self.poll = Some(self.arm_poll());
        }
    }

    /// Stop the transport and cancel the display poll. Publishes a zero
    /// progress reading first when the transport was running.
    pub fn stop(&mut self) {
        if self.scheduler.state() == PlayState::Started {
            self.emitter
                .dispatch(&MetronomeEvent::Progress(MetronomeProgress::zero()));
            self.scheduler.stop_sequence(self.sequence);
            self.scheduler.stop();
            debug!("transport stopped");
        }
        if let Some(handle) = self.poll.take() {
            debug!(?handle, "poll cancelled");
        }
    }

    /// One display frame: run due draw-sync callbacks, then publish progress
    /// and re-arm if the poll is active.
    pub fn frame(&mut self) {
        self.scheduler.flush_draw();
        if self.poll.is_some() {
            let progress = self.progress();
            self.emitter.dispatch(&MetronomeEvent::Progress(progress));
            self.poll = Some(self.arm_poll());
        }
    }

    pub fn on_progress(
        &self,
        listener: impl FnMut(&MetronomeProgress) + 'static,
    ) -> Subscription {
        self.emitter.progress.subscribe(listener)
    }

    pub fn on_tick(&self, listener: impl FnMut(&Tick) + 'static) -> Subscription {
        self.emitter.tick.subscribe(listener)
    }

    pub fn on_subdivision_tick(
        &self,
        listener: impl FnMut(&SubdivisionTick) + 'static,
    ) -> Subscription {
        self.emitter.subdivision_tick.subscribe(listener)
    }

    pub fn on_subdivision_only_tick(
        &self,
        listener: impl FnMut(&SubdivisionTick) + 'static,
    ) -> Subscription {
        self.emitter.subdivision_only_tick.subscribe(listener)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.emitter.listener_count(kind)
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn arm_poll(&mut self) -> PollHandle {
        let handle = PollHandle(self.next_poll);
        self.next_poll += 1;
        handle
    }

    /// Replace the sequence with one for the current layout. A running
    /// transport keeps its place in the bar.
    fn rebuild_sequence(&mut self) {
        self.scheduler.dispose_sequence(self.sequence);

        let start = match self.scheduler.state() {
            PlayState::Started => SequenceStart::Progress(self.scheduler.progress()),
            PlayState::Stopped => SequenceStart::Beginning,
        };
        self.sequence = create_sequence(
            &mut self.scheduler,
            &self.emitter,
            self.signature,
            self.subdivisions,
        );
        self.scheduler.start_sequence(self.sequence, start);
        debug!(
            signature = %self.signature,
            subdivisions = %self.subdivisions,
            ?start,
            "sequence rebuilt"
        );
    }
}

fn create_sequence<S: AudioScheduler>(
    scheduler: &mut S,
    emitter: &Rc<Emitter>,
    signature: Signature,
    subdivisions: Subdivision,
) -> SequenceId {
    scheduler.create_sequence(
        pattern::sequence_events(signature, subdivisions),
        subdivisions.note_value(),
        slot_callback(Rc::clone(emitter), signature, subdivisions),
    )
}

/// Sound the click now; publish its tick once it is audible.
fn slot_callback(
    emitter: Rc<Emitter>,
    signature: Signature,
    subdivisions: Subdivision,
) -> SlotCallback {
    Box::new(move |ctx: &mut SlotContext<'_>, slot: &ScheduledSlot<'_>| {
        ctx.trigger(&slot.event.note);
        let emitter = Rc::clone(&emitter);
        let tick = slot.event.tick;
        ctx.schedule_draw(
            Box::new(move || emit_tick(&emitter, tick, signature, subdivisions)),
            slot.time,
        );
    })
}

/// `tick` for the first slot of a beat, `subdivisionOnlyTick` otherwise,
/// then `subdivisionTick` for every slot.
fn emit_tick(
    emitter: &Emitter,
    tick: TickPosition,
    signature: Signature,
    subdivisions: Subdivision,
) {
    let progress = MetronomeProgress::at_tick(tick, signature, subdivisions);
    let slot = SubdivisionTick {
        subdivision_index: progress.subdivision_index,
        division_index: progress.division_index,
        progress,
    };

    if tick.subdivision_index == 0 {
        emitter.dispatch(&MetronomeEvent::Tick(Tick {
            division_index: progress.division_index,
            progress,
        }));
    } else {
        emitter.dispatch(&MetronomeEvent::SubdivisionOnlyTick(slot));
    }
    emitter.dispatch(&MetronomeEvent::SubdivisionTick(slot));
}
