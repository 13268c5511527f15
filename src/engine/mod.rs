//! Audio transport engine: look-ahead click scheduler and draw-sync queue.
//!
//! [`AudioScheduler`] is everything the metronome core needs from an audio
//! engine: tempo and time signature, a transport that starts and stops,
//! repeating sequences that call back at each slot, and draw-sync flushing.
//! [`Scheduler`] is the concrete engine. It renders interleaved blocks ahead
//! of playback; the caller ships them to an output (see [`crate::audio`]) and
//! reports back how far playback has got with
//! [`set_audible_frames`](Scheduler::set_audible_frames). Keeping the output
//! out of the scheduler keeps all timing logic testable without hardware.

pub mod draw;
pub mod sequence;

use std::collections::BTreeMap;
use std::fmt;

pub use draw::{DrawCallback, DrawQueue};
pub use sequence::{
    ClickNote, Sequence, SequenceEvent, SequenceId, SequenceStart, Slot, TickPosition,
};

use crate::clock::{Beat, NoteValue, PlayState, Transport};
use crate::instrument::Voice;

/// A point on the audio clock, in frames since the engine started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AudioTime {
    frame: u64,
}

impl AudioTime {
    pub fn from_frame(frame: u64) -> Self {
        Self { frame }
    }

    pub fn frame(self) -> u64 {
        self.frame
    }
}

/// Audio format and tempo handed to voices.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub sample_rate: u32,
    pub channels: u16,
    pub bpm: f64,
}

/// A sequence slot being played.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledSlot<'a> {
    /// Audio time the slot sounds at.
    pub time: AudioTime,
    /// Transport position of the slot.
    pub position: Beat,
    /// Index of the event within its sequence.
    pub index: usize,
    pub event: &'a SequenceEvent,
}

/// What a slot callback may do: sound a note, or defer work to the display.
pub struct SlotContext<'a> {
    voice: &'a dyn Voice,
    render: RenderContext,
    output: &'a mut [f32],
    overlap: &'a mut Vec<f32>,
    offset_samples: usize,
    draw: &'a mut DrawQueue,
}

impl SlotContext<'_> {
    /// Render `note` with the scheduler's voice, starting exactly at the slot.
    pub fn trigger(&mut self, note: &ClickNote) {
        let rendered = self.voice.render(note, &self.render);
        mix_into(self.output, self.overlap, self.offset_samples, &rendered);
    }

    /// Run `callback` on the first display frame at or after `at`.
    pub fn schedule_draw(&mut self, callback: DrawCallback, at: AudioTime) {
        self.draw.schedule(callback, at);
    }
}

/// Called by the scheduler at each slot of a started sequence.
pub type SlotCallback = Box<dyn FnMut(&mut SlotContext<'_>, &ScheduledSlot<'_>)>;

/// The audio transport as seen by the metronome core.
pub trait AudioScheduler {
    fn set_time_signature(&mut self, beats_per_bar: u32);
    fn set_bpm(&mut self, bpm: f64);
    fn bpm(&self) -> f64;

    fn start(&mut self);
    /// Stop and rewind the transport to zero.
    fn stop(&mut self);
    fn state(&self) -> PlayState;
    /// Bar-relative progress at the audible position, in `[0, 1)`.
    fn progress(&self) -> f64;

    fn create_sequence(
        &mut self,
        events: Vec<SequenceEvent>,
        note_value: NoteValue,
        callback: SlotCallback,
    ) -> SequenceId;
    fn start_sequence(&mut self, id: SequenceId, start: SequenceStart);
    fn stop_sequence(&mut self, id: SequenceId);
    /// Drop the sequence and its callback. Unknown ids are ignored.
    fn dispose_sequence(&mut self, id: SequenceId);
    /// Loop progress at the audible position, 0 for stopped or unknown sequences.
    fn sequence_progress(&self, id: SequenceId) -> f64;

    /// Run draw-sync callbacks whose audio time has become audible.
    fn flush_draw(&mut self) -> usize;
}

/// Format and block size for a [`Scheduler`].
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub bpm: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Clamped to at least one frame.
    pub block_size_frames: u32,
}

struct SequenceEntry {
    sequence: Sequence,
    callback: SlotCallback,
}

/// Look-ahead block renderer driving click sequences off a [`Transport`].
pub struct Scheduler {
    transport: Transport,
    sequences: BTreeMap<SequenceId, SequenceEntry>,
    next_sequence: u64,
    voice: Box<dyn Voice>,
    draw: DrawQueue,
    block_size_frames: u32,
    /// Samples that spilled past the previous block boundary.
    overlap_buffer: Vec<f32>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, voice: Box<dyn Voice>) -> Self {
        Self {
            transport: Transport::new(config.bpm, config.sample_rate, config.channels),
            sequences: BTreeMap::new(),
            next_sequence: 0,
            voice,
            draw: DrawQueue::new(),
            block_size_frames: config.block_size_frames.max(1),
            overlap_buffer: Vec::new(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn sample_rate(&self) -> u32 {
        self.transport.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.transport.channels()
    }

    pub fn block_size_frames(&self) -> u32 {
        self.block_size_frames
    }

    /// Frames rendered so far.
    pub fn rendered_frames(&self) -> u64 {
        self.transport.head_frames()
    }

    /// Report how far the output has played. Drives progress and draw-sync.
    pub fn set_audible_frames(&mut self, frames: u64) {
        self.transport.set_audible_frames(frames);
    }

    pub fn audible_time(&self) -> AudioTime {
        AudioTime::from_frame(self.transport.audible_frames())
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(&id).map(|entry| &entry.sequence)
    }

    /// Draw callbacks still waiting for their audio time.
    pub fn pending_draws(&self) -> usize {
        self.draw.len()
    }

    /// Whether a click tail is still ringing into the next block.
    pub fn has_tail(&self) -> bool {
        !self.overlap_buffer.is_empty()
    }

    /// Render the next block of interleaved samples.
    ///
    /// Always returns `block_size_frames * channels` samples: silence (plus
    /// any ringing click tail) while the transport is stopped, so the audio
    /// clock keeps advancing. Slot callbacks run for every slot inside the
    /// block's window, in time order across sequences.
    pub fn render_block(&mut self) -> Vec<f32> {
        let channels = self.transport.channels() as usize;
        let block_samples = self.block_size_frames as usize * channels;
        let mut output = vec![0.0f32; block_samples];

        // Mix in overlap from previous block
        let overlap_len = self.overlap_buffer.len().min(block_samples);
        for (out, &ovl) in output[..overlap_len]
            .iter_mut()
            .zip(&self.overlap_buffer[..overlap_len])
        {
            *out += ovl;
        }
        if self.overlap_buffer.len() > block_samples {
            self.overlap_buffer.drain(..block_samples);
        } else {
            self.overlap_buffer.clear();
        }

        let block_start = self.transport.head_frames();
        let start_ticks = self.transport.precise_ticks();
        let Some((from, to)) = self.transport.advance_by_frames(self.block_size_frames) else {
            return output;
        };

        let render = RenderContext {
            sample_rate: self.transport.sample_rate(),
            channels: self.transport.channels(),
            bpm: self.transport.bpm(),
        };

        let mut due: Vec<(Beat, SequenceId, usize)> = self
            .sequences
            .iter()
            .flat_map(|(&id, entry)| {
                entry
                    .sequence
                    .slots_in(from, to)
                    .into_iter()
                    .map(move |slot| (slot.at, id, slot.index))
            })
            .collect();
        due.sort_by_key(|&(at, id, _)| (at, id));

        let last_frame = self.block_size_frames.saturating_sub(1) as u64;
        for (at, id, index) in due {
            let offset_frames = self
                .transport
                .frames_for_ticks(at.ticks() as f64 - start_ticks)
                .min(last_frame);
            let Some(SequenceEntry { sequence, callback }) = self.sequences.get_mut(&id) else {
                continue;
            };
            let slot = ScheduledSlot {
                time: AudioTime::from_frame(block_start + offset_frames),
                position: at,
                index,
                event: &sequence.events()[index],
            };
            let mut ctx = SlotContext {
                voice: self.voice.as_ref(),
                render,
                output: &mut output,
                overlap: &mut self.overlap_buffer,
                offset_samples: offset_frames as usize * channels,
                draw: &mut self.draw,
            };
            callback(&mut ctx, &slot);
        }

        output
    }
}

impl AudioScheduler for Scheduler {
    fn set_time_signature(&mut self, beats_per_bar: u32) {
        self.transport.set_time_signature(beats_per_bar);
    }

    fn set_bpm(&mut self, bpm: f64) {
        self.transport.set_bpm(bpm);
    }

    fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    fn start(&mut self) {
        self.transport.start();
    }

    fn stop(&mut self) {
        self.transport.stop();
    }

    fn state(&self) -> PlayState {
        self.transport.state()
    }

    fn progress(&self) -> f64 {
        self.transport.progress()
    }

    fn create_sequence(
        &mut self,
        events: Vec<SequenceEvent>,
        note_value: NoteValue,
        callback: SlotCallback,
    ) -> SequenceId {
        let id = SequenceId(self.next_sequence);
        self.next_sequence += 1;
        self.sequences.insert(
            id,
            SequenceEntry {
                sequence: Sequence::new(events, note_value),
                callback,
            },
        );
        id
    }

    fn start_sequence(&mut self, id: SequenceId, start: SequenceStart) {
        let position = self.transport.audible_position();
        if let Some(entry) = self.sequences.get_mut(&id) {
            entry.sequence.start(start, position);
        }
    }

    fn stop_sequence(&mut self, id: SequenceId) {
        if let Some(entry) = self.sequences.get_mut(&id) {
            entry.sequence.stop();
        }
    }

    fn dispose_sequence(&mut self, id: SequenceId) {
        self.sequences.remove(&id);
    }

    fn sequence_progress(&self, id: SequenceId) -> f64 {
        if self.transport.state() == PlayState::Stopped {
            return 0.0;
        }
        self.sequences
            .get(&id)
            .map(|entry| entry.sequence.progress(self.transport.audible_position()))
            .unwrap_or(0.0)
    }

    fn flush_draw(&mut self) -> usize {
        self.draw.run_due(self.audible_time())
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("transport", &self.transport)
            .field("sequences", &self.sequences.len())
            .field("voice", &self.voice.name())
            .field("draw", &self.draw)
            .finish()
    }
}

/// Mix `rendered` into `output` from `offset`, spilling past the end of the
/// block into `overlap`.
fn mix_into(output: &mut [f32], overlap: &mut Vec<f32>, offset: usize, rendered: &[f32]) {
    let block_samples = output.len();
    for (i, &sample) in rendered.iter().enumerate() {
        let pos = offset + i;
        if pos < block_samples {
            output[pos] += sample;
        } else {
            let overlap_pos = pos - block_samples;
            if overlap_pos >= overlap.len() {
                overlap.resize(overlap_pos + 1, 0.0);
            }
            overlap[overlap_pos] += sample;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SAMPLE_RATE: u32 = 44100;
    const CHANNELS: u16 = 2;
    const BLOCK_SIZE: u32 = 1024;
    const BPM: f64 = 120.0;

    /// One frame at the note's velocity.
    struct Impulse;

    impl Voice for Impulse {
        fn render(&self, note: &ClickNote, ctx: &RenderContext) -> Vec<f32> {
            vec![note.velocity; ctx.channels as usize]
        }

        fn name(&self) -> &str {
            "impulse"
        }
    }

    /// A fixed number of frames at the note's velocity.
    struct Held(usize);

    impl Voice for Held {
        fn render(&self, note: &ClickNote, ctx: &RenderContext) -> Vec<f32> {
            vec![note.velocity; self.0 * ctx.channels as usize]
        }

        fn name(&self) -> &str {
            "held"
        }
    }

    fn scheduler(voice: Box<dyn Voice>) -> Scheduler {
        Scheduler::new(
            SchedulerConfig {
                bpm: BPM,
                sample_rate: SAMPLE_RATE,
                channels: CHANNELS,
                block_size_frames: BLOCK_SIZE,
            },
            voice,
        )
    }

    fn quarters(count: u32) -> Vec<SequenceEvent> {
        (0..count)
            .map(|beat| SequenceEvent {
                note: ClickNote::new("C2", 0.5),
                tick: TickPosition {
                    division_index: beat,
                    subdivision_index: 0,
                },
            })
            .collect()
    }

    fn triggering() -> SlotCallback {
        Box::new(|ctx: &mut SlotContext<'_>, slot: &ScheduledSlot<'_>| {
            ctx.trigger(&slot.event.note)
        })
    }

    #[test]
    fn stopped_renders_silence_and_keeps_time() {
        let mut s = scheduler(Box::new(Impulse));
        let block = s.render_block();
        assert_eq!(block.len(), BLOCK_SIZE as usize * CHANNELS as usize);
        assert!(block.iter().all(|&x| x == 0.0));
        assert_eq!(s.rendered_frames(), BLOCK_SIZE as u64);
    }

    #[test]
    fn downbeat_lands_on_first_frame() {
        let mut s = scheduler(Box::new(Impulse));
        let id = s.create_sequence(quarters(4), NoteValue::Quarter, triggering());
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();
        let block = s.render_block();
        assert!((block[0] - 0.5).abs() < f32::EPSILON);
        assert!((block[1] - 0.5).abs() < f32::EPSILON);
        assert!(block[2..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn second_beat_at_its_frame() {
        // One beat at 120 BPM / 44100 Hz is 22050 frames.
        let mut s = scheduler(Box::new(Impulse));
        let id = s.create_sequence(quarters(4), NoteValue::Quarter, triggering());
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();

        let mut hits = Vec::new();
        for block_index in 0..30u64 {
            let block = s.render_block();
            for (i, chunk) in block.chunks(CHANNELS as usize).enumerate() {
                if chunk[0] != 0.0 {
                    hits.push(block_index * BLOCK_SIZE as u64 + i as u64);
                }
            }
        }
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], 0);
        assert!((hits[1] as i64 - 22050).abs() <= 1, "got {}", hits[1]);
    }

    #[test]
    fn long_clicks_spill_into_next_block() {
        let mut s = scheduler(Box::new(Held(BLOCK_SIZE as usize + 512)));
        let id = s.create_sequence(quarters(4), NoteValue::Quarter, triggering());
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();

        let first = s.render_block();
        assert!(first.iter().all(|&x| (x - 0.5).abs() < f32::EPSILON));
        assert!(s.has_tail());

        s.stop();
        let second = s.render_block();
        let spilled = 512 * CHANNELS as usize;
        assert!(second[..spilled].iter().all(|&x| (x - 0.5).abs() < f32::EPSILON));
        assert!(second[spilled..].iter().all(|&x| x == 0.0));
        assert!(!s.has_tail());
    }

    #[test]
    fn slot_callback_sees_time_and_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut s = scheduler(Box::new(Impulse));
        let id = s.create_sequence(
            quarters(4),
            NoteValue::Quarter,
            Box::new(move |_ctx: &mut SlotContext<'_>, slot: &ScheduledSlot<'_>| {
                sink.borrow_mut()
                    .push((slot.time.frame(), slot.event.tick.division_index))
            }),
        );
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();
        for _ in 0..90 {
            s.render_block();
        }
        let seen = seen.borrow();
        let divisions: Vec<u32> = seen.iter().map(|&(_, d)| d).collect();
        assert_eq!(divisions, vec![0, 1, 2, 3, 0]);
        assert!((seen[2].0 as i64 - 44100).abs() <= 1);
    }

    #[test]
    fn draw_callbacks_wait_for_audible_time() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&fired);
        let mut s = scheduler(Box::new(Impulse));
        let id = s.create_sequence(
            quarters(4),
            NoteValue::Quarter,
            Box::new(move |ctx: &mut SlotContext<'_>, slot: &ScheduledSlot<'_>| {
                let sink = Rc::clone(&sink);
                let division = slot.event.tick.division_index;
                ctx.schedule_draw(Box::new(move || sink.borrow_mut().push(division)), slot.time);
            }),
        );
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();

        // Render a full beat ahead without anything being heard yet.
        for _ in 0..22 {
            s.render_block();
        }
        assert_eq!(s.pending_draws(), 2);
        assert_eq!(s.flush_draw(), 1); // frame 0 is audible from the start
        assert_eq!(*fired.borrow(), vec![0]);

        s.set_audible_frames(22049);
        assert_eq!(s.flush_draw(), 0);
        s.set_audible_frames(22051);
        assert_eq!(s.flush_draw(), 1);
        assert_eq!(*fired.borrow(), vec![0, 1]);
    }

    #[test]
    fn disposed_sequences_go_quiet() {
        let mut s = scheduler(Box::new(Impulse));
        let id = s.create_sequence(quarters(4), NoteValue::Quarter, triggering());
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();
        s.dispose_sequence(id);
        assert!(s.sequence(id).is_none());
        assert_eq!(s.sequence_progress(id), 0.0);
        assert!(s.render_block().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn sequence_progress_tracks_audible_position() {
        let mut s = scheduler(Box::new(Impulse));
        let id = s.create_sequence(quarters(4), NoteValue::Quarter, triggering());
        s.start_sequence(id, SequenceStart::Beginning);
        s.start();
        // 2.5 beats = 55125 frames.
        while s.rendered_frames() < 60000 {
            s.render_block();
        }
        s.set_audible_frames(55125);
        assert!((s.sequence_progress(id) - 0.625).abs() < 1e-3);
        assert!((s.progress() - 0.625).abs() < 1e-3);

        s.stop();
        assert_eq!(s.sequence_progress(id), 0.0);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut s = scheduler(Box::new(Impulse));
        let a = s.create_sequence(quarters(3), NoteValue::Quarter, triggering());
        s.dispose_sequence(a);
        let b = s.create_sequence(quarters(3), NoteValue::Quarter, triggering());
        assert_ne!(a, b);
    }

    #[test]
    fn zero_block_size_still_advances() {
        let mut s = Scheduler::new(
            SchedulerConfig {
                bpm: BPM,
                sample_rate: SAMPLE_RATE,
                channels: CHANNELS,
                block_size_frames: 0,
            },
            Box::new(Impulse),
        );
        assert_eq!(s.block_size_frames(), 1);
        assert_eq!(s.render_block().len(), CHANNELS as usize);
        assert_eq!(s.rendered_frames(), 1);
    }
}
