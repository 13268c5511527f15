//! Woodblock click: two inharmonic partials over a short noise transient.

use std::f64::consts::PI;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::engine::{ClickNote, RenderContext};

use super::envelope::ClickEnvelope;
use super::pitch::note_frequency;
use super::Voice;

/// Partials are pitched four octaves above the click note.
const TRANSPOSE: f64 = 16.0;
const SECOND_PARTIAL: f64 = 2.76;
const TRANSIENT_SECS: f64 = 0.004;

pub struct Woodblock {
    seed: u64,
    envelope: ClickEnvelope,
}

impl Woodblock {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            envelope: ClickEnvelope {
                attack: 0.0005,
                decay: 0.06,
                release: 0.03,
            },
        }
    }
}

impl Voice for Woodblock {
    fn render(&self, note: &ClickNote, ctx: &RenderContext) -> Vec<f32> {
        if note.velocity <= 0.0 {
            return Vec::new();
        }
        let Some(base) = note_frequency(&note.name) else {
            warn!(note = %note.name, "unknown note, click skipped");
            return Vec::new();
        };

        let sr = ctx.sample_rate as f64;
        let nyquist = sr / 2.0;
        let f1 = (base * TRANSPOSE).min(nyquist);
        let f2 = (base * TRANSPOSE * SECOND_PARTIAL).min(nyquist);

        let duration_secs = self.envelope.decay;
        let num_samples = (self.envelope.total_duration(duration_secs) * sr) as usize;
        let transient_samples = (TRANSIENT_SECS * sr) as usize;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let velocity = note.velocity as f64;
        let mut output = Vec::with_capacity(num_samples * ctx.channels as usize);

        for i in 0..num_samples {
            let t = i as f64 / sr;
            let env = self.envelope.amplitude(t, duration_secs);
            let body = (2.0 * PI * f1 * t).sin() * 0.7 + (2.0 * PI * f2 * t).sin() * 0.3;

            let noise = if i < transient_samples {
                let fade = 1.0 - i as f64 / transient_samples as f64;
                rng.gen_range(-1.0f64..1.0) * fade * 0.5
            } else {
                0.0
            };

            let sample = ((body * env + noise) * velocity).clamp(-1.0, 1.0) as f32;
            for _ in 0..ctx.channels {
                output.push(sample);
            }
        }

        output
    }

    fn name(&self) -> &str {
        "woodblock"
    }
}
