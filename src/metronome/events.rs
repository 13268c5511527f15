//! Typed metronome events and their listener lists.
//!
//! Every event kind has its own payload type and its own observer list.
//! Emission walks a snapshot of the list taken when it begins, so listeners
//! may subscribe or unsubscribe from inside a callback without disturbing
//! the pass in flight. A panicking listener is logged once and skipped; with
//! [`route_panics_to_tracing`] installed the panic hook stays quiet for it.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{error, warn};

use super::progress::MetronomeProgress;

thread_local! {
    static IN_LISTENER: Cell<bool> = const { Cell::new(false) };
}

/// True while a listener is running on this thread.
pub fn in_listener() -> bool {
    IN_LISTENER.with(Cell::get)
}

/// Marks the current thread as inside a listener until dropped.
struct ListenerScope {
    outer: bool,
}

impl ListenerScope {
    fn enter() -> Self {
        Self {
            outer: IN_LISTENER.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        IN_LISTENER.with(|flag| flag.set(self.outer));
    }
}

/// Replace the default panic hook with one that reports through `tracing`.
///
/// Listener panics are reported by the emitter that caught them, so the hook
/// skips those.
pub fn route_panics_to_tracing() {
    panic::set_hook(Box::new(|info| {
        if !in_listener() {
            error!(panic = %info, "panicked");
        }
    }));
}

/// A beat downbeat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub division_index: u32,
    pub progress: MetronomeProgress,
}

/// Any slot of the sequence, beat or subdivision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubdivisionTick {
    /// Subdivision within the cycle.
    pub subdivision_index: u32,
    pub division_index: u32,
    pub progress: MetronomeProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Progress,
    Tick,
    SubdivisionTick,
    SubdivisionOnlyTick,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Progress => "progress",
            EventKind::Tick => "tick",
            EventKind::SubdivisionTick => "subdivisionTick",
            EventKind::SubdivisionOnlyTick => "subdivisionOnlyTick",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the metronome publishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetronomeEvent {
    /// Continuous position, once per display frame while running.
    Progress(MetronomeProgress),
    /// First slot of a beat.
    Tick(Tick),
    /// Every slot.
    SubdivisionTick(SubdivisionTick),
    /// Slots that are not the first of their beat.
    SubdivisionOnlyTick(SubdivisionTick),
}

impl MetronomeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MetronomeEvent::Progress(_) => EventKind::Progress,
            MetronomeEvent::Tick(_) => EventKind::Tick,
            MetronomeEvent::SubdivisionTick(_) => EventKind::SubdivisionTick,
            MetronomeEvent::SubdivisionOnlyTick(_) => EventKind::SubdivisionOnlyTick,
        }
    }
}

type Callback<T> = Rc<RefCell<dyn FnMut(&T)>>;
type Entries<T> = Rc<RefCell<Vec<(u64, Callback<T>)>>>;

/// Listeners for one event kind, called in registration order.
pub struct Listeners<T> {
    kind: EventKind,
    entries: Entries<T>,
    next_id: Cell<u64>,
}

impl<T: 'static> Listeners<T> {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            entries: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let callback: Callback<T> = Rc::new(RefCell::new(callback));
        self.entries.borrow_mut().push((id, callback));

        let entries: Weak<RefCell<Vec<(u64, Callback<T>)>>> = Rc::downgrade(&self.entries);
        Subscription {
            kind: self.kind,
            cancel: Some(Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries.borrow_mut().retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Call every listener registered when emission begins.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();

        for callback in snapshot {
            let Ok(mut callback) = callback.try_borrow_mut() else {
                warn!(event = %self.kind, "listener re-entered its own event, skipped");
                continue;
            };
            let outcome = {
                let _scope = ListenerScope::enter();
                panic::catch_unwind(AssertUnwindSafe(|| (&mut *callback)(value)))
            };
            if let Err(payload) = outcome {
                error!(
                    event = %self.kind,
                    panic = %panic_message(payload.as_ref()),
                    "listener panicked"
                );
            }
        }
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("kind", &self.kind)
            .field("len", &self.entries.borrow().len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by every `on_*` registration.
///
/// Dropping it leaves the listener registered; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription {
    kind: EventKind,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .finish()
    }
}

/// One observer list per event kind.
#[derive(Debug)]
pub struct Emitter {
    pub progress: Listeners<MetronomeProgress>,
    pub tick: Listeners<Tick>,
    pub subdivision_tick: Listeners<SubdivisionTick>,
    pub subdivision_only_tick: Listeners<SubdivisionTick>,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            progress: Listeners::new(EventKind::Progress),
            tick: Listeners::new(EventKind::Tick),
            subdivision_tick: Listeners::new(EventKind::SubdivisionTick),
            subdivision_only_tick: Listeners::new(EventKind::SubdivisionOnlyTick),
        }
    }

    /// Route an event to the listeners of its kind.
    pub fn dispatch(&self, event: &MetronomeEvent) {
        match event {
            MetronomeEvent::Progress(p) => self.progress.emit(p),
            MetronomeEvent::Tick(t) => self.tick.emit(t),
            MetronomeEvent::SubdivisionTick(t) => self.subdivision_tick.emit(t),
            MetronomeEvent::SubdivisionOnlyTick(t) => self.subdivision_only_tick.emit(t),
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Progress => self.progress.len(),
            EventKind::Tick => self.tick.len(),
            EventKind::SubdivisionTick => self.subdivision_tick.len(),
            EventKind::SubdivisionOnlyTick => self.subdivision_only_tick.len(),
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
