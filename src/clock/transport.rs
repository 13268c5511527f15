//! Transport: tempo, time signature, play state and drift-free position.
//!
//! Two frame counters are tracked. The render head advances every time a
//! block is rendered (started or not) and is the timeline audio events are
//! scheduled on. The audible position trails the head by the look-ahead and
//! is what progress queries report, since that is what the listener hears.
//! Every block rendered while started leaves an anchor behind, so the audible
//! position is found at the tempo the block was rendered with.

use std::collections::VecDeque;

use super::beat::{Beat, TICKS_PER_BEAT};

/// Transport play state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Started,
}

/// Where a rendered block started, and at what tempo it was rendered.
#[derive(Debug, Clone, Copy)]
struct BlockAnchor {
    frame: u64,
    ticks: f64,
    bpm: f64,
}

/// Musical transport: tempo, bar length and playback position.
#[derive(Debug)]
pub struct Transport {
    bpm: f64,
    beats_per_bar: u32,
    sample_rate: u32,
    channels: u16,
    state: PlayState,
    position_ticks: u64,
    /// Fractional tick accumulator for drift-free advancement.
    tick_remainder: f64,
    head_frames: u64,
    audible_frames: u64,
    /// Blocks not yet fully heard, oldest first.
    anchors: VecDeque<BlockAnchor>,
}

impl Transport {
    /// A stopped transport at position zero in 4/4.
    pub fn new(bpm: f64, sample_rate: u32, channels: u16) -> Self {
        Self {
            bpm,
            beats_per_bar: 4,
            sample_rate,
            channels,
            state: PlayState::Stopped,
            position_ticks: 0,
            tick_remainder: 0.0,
            head_frames: 0,
            audible_frames: 0,
            anchors: VecDeque::new(),
        }
    }

    /// Start advancing from the current position.
    pub fn start(&mut self) {
        self.state = PlayState::Started;
    }

    /// Stop and rewind to zero.
    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.position_ticks = 0;
        self.tick_remainder = 0.0;
        self.anchors.clear();
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Takes effect on the next `advance_by_frames` call.
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    pub fn time_signature(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn set_time_signature(&mut self, beats_per_bar: u32) {
        self.beats_per_bar = beats_per_bar.max(1);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Length of one bar at the current time signature.
    pub fn bar(&self) -> Beat {
        Beat::from_beats(self.beats_per_bar)
    }

    /// Position at the render head.
    pub fn position(&self) -> Beat {
        Beat::from_ticks(self.position_ticks)
    }

    /// Frames rendered so far, started or not.
    pub fn head_frames(&self) -> u64 {
        self.head_frames
    }

    pub fn audible_frames(&self) -> u64 {
        self.audible_frames
    }

    /// Report how many frames the output has actually played.
    ///
    /// Clamped to the render head: nothing can be heard before it is rendered.
    pub fn set_audible_frames(&mut self, frames: u64) {
        self.audible_frames = frames.min(self.head_frames);
        while self
            .anchors
            .get(1)
            .is_some_and(|next| next.frame <= self.audible_frames)
        {
            self.anchors.pop_front();
        }
    }

    /// Ticks covered by `frames` audio frames at the current tempo.
    pub fn ticks_for_frames(&self, frames: u64) -> f64 {
        ticks_at(frames, self.bpm, self.sample_rate)
    }

    /// Frames spanned by `ticks` ticks at the current tempo, rounded.
    pub fn frames_for_ticks(&self, ticks: f64) -> u64 {
        let seconds = ticks.max(0.0) / TICKS_PER_BEAT as f64 * 60.0 / self.bpm;
        (seconds * self.sample_rate as f64).round() as u64
    }

    /// Render head position including the fractional tick.
    pub fn precise_ticks(&self) -> f64 {
        self.position_ticks as f64 + self.tick_remainder
    }

    /// Position at the audible frame, or zero while stopped.
    ///
    /// Measured from the start of the block holding the audible frame, at
    /// that block's tempo.
    pub fn audible_position(&self) -> Beat {
        if self.state == PlayState::Stopped {
            return Beat::ZERO;
        }
        let Some(anchor) = self
            .anchors
            .iter()
            .rev()
            .find(|anchor| anchor.frame <= self.audible_frames)
        else {
            return Beat::ZERO;
        };
        let heard = self.audible_frames - anchor.frame;
        let ticks = anchor.ticks + ticks_at(heard, anchor.bpm, self.sample_rate);
        Beat::from_ticks(ticks.max(0.0).floor() as u64)
    }

    /// Bar-relative progress at the audible position, in `[0, 1)`.
    pub fn progress(&self) -> f64 {
        self.audible_position().fraction_of(self.bar())
    }

    /// Advance the render head by `num_frames`.
    ///
    /// Returns the `[from, to)` range of musical time covered, or `None`
    /// while stopped (the head still advances so the audio clock keeps
    /// running through silence).
    pub fn advance_by_frames(&mut self, num_frames: u32) -> Option<(Beat, Beat)> {
        let block_start = self.head_frames;
        self.head_frames += num_frames as u64;
        if self.state == PlayState::Stopped {
            return None;
        }
        self.anchors.push_back(BlockAnchor {
            frame: block_start,
            ticks: self.precise_ticks(),
            bpm: self.bpm,
        });

        let from = Beat::from_ticks(self.position_ticks);

        let total = self.tick_remainder + self.ticks_for_frames(num_frames as u64);
        let whole_ticks = total.floor() as u64;
        self.tick_remainder = total - whole_ticks as f64;
        self.position_ticks += whole_ticks;

        Some((from, Beat::from_ticks(self.position_ticks)))
    }
}

fn ticks_at(frames: u64, bpm: f64, sample_rate: u32) -> f64 {
    (frames as f64 / sample_rate as f64) * (bpm / 60.0) * TICKS_PER_BEAT as f64
}
