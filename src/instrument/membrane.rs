//! Membrane click: a sine drop from several octaves above the note.

use std::f64::consts::PI;

use tracing::warn;

use crate::clock::NoteValue;
use crate::engine::{ClickNote, RenderContext};

use super::envelope::ClickEnvelope;
use super::pitch::note_frequency;
use super::Voice;

/// Ceiling for the start of the sweep.
const MAX_SWEEP_HZ: f64 = 8000.0;

/// Pitch-swept sine click, held for a 64th note.
///
/// The frequency starts `octaves` above the note and falls exponentially to
/// it over `pitch_decay` seconds.
pub struct Membrane {
    pub octaves: f64,
    pub pitch_decay: f64,
    pub envelope: ClickEnvelope,
}

impl Membrane {
    pub fn new() -> Self {
        Self {
            octaves: 10.0,
            pitch_decay: 0.05,
            envelope: ClickEnvelope {
                attack: 0.001,
                decay: 0.4,
                release: 0.3,
            },
        }
    }

    fn frequency_at(&self, base: f64, t: f64) -> f64 {
        let sweep = (-t / self.pitch_decay.max(1e-6)).exp();
        base * 2.0f64.powf(self.octaves * sweep)
    }
}

impl Default for Membrane {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for Membrane {
    fn render(&self, note: &ClickNote, ctx: &RenderContext) -> Vec<f32> {
        if note.velocity <= 0.0 {
            return Vec::new();
        }
        let Some(base) = note_frequency(&note.name) else {
            warn!(note = %note.name, "unknown note, click skipped");
            return Vec::new();
        };

        let duration_secs = NoteValue::SixtyFourth.seconds(ctx.bpm);
        let total_secs = self.envelope.total_duration(duration_secs);
        let num_samples = (total_secs * ctx.sample_rate as f64) as usize;
        let ceiling = MAX_SWEEP_HZ.min(ctx.sample_rate as f64 / 2.0);

        let velocity = note.velocity as f64;
        let mut output = Vec::with_capacity(num_samples * ctx.channels as usize);
        let mut phase = 0.0_f64;

        for i in 0..num_samples {
            let t = i as f64 / ctx.sample_rate as f64;
            let freq = self.frequency_at(base, t).min(ceiling);
            phase = (phase + freq / ctx.sample_rate as f64).fract();

            let env = self.envelope.amplitude(t, duration_secs);
            let sample = ((phase * 2.0 * PI).sin() * env * velocity) as f32;
            for _ in 0..ctx.channels {
                output.push(sample);
            }
        }

        output
    }

    fn name(&self) -> &str {
        "membrane"
    }
}
