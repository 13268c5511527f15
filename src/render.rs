//! Offline rendering: play the metronome into a buffer or a WAV file.
//!
//! Offline there is no output device, so the audible position is the render
//! head: each block counts as heard as soon as it is rendered, and one
//! display frame runs per block.

use std::path::Path;

use tracing::debug;

use crate::engine::Scheduler;
use crate::error::Result;
use crate::metronome::Metronome;

/// Frames spanned by `bars` bars at the metronome's tempo and signature.
pub fn frames_for_bars(metronome: &Metronome<Scheduler>, bars: u32) -> u64 {
    let beats = bars as f64 * metronome.signature().beats() as f64;
    let seconds = beats * 60.0 / metronome.bpm();
    (seconds * metronome.scheduler().sample_rate() as f64).round() as u64
}

/// Blocks to render so that `lookahead` frames sit ahead of `played`,
/// limited to what the output queue can accept.
///
/// Rendering moves the render head and fires slot callbacks, so a block must
/// never be rendered unless it is certain to be played.
pub fn lookahead_blocks(
    scheduler: &Scheduler,
    played: u64,
    lookahead: u64,
    queue_space: usize,
) -> usize {
    let wanted = (played + lookahead).saturating_sub(scheduler.rendered_frames());
    let block = scheduler.block_size_frames() as u64;
    let blocks = wanted.div_ceil(block);
    usize::try_from(blocks).unwrap_or(usize::MAX).min(queue_space)
}

/// Run one block: render it, mark it heard, run a display frame.
pub fn render_step(metronome: &mut Metronome<Scheduler>) -> Vec<f32> {
    let block = metronome.scheduler_mut().render_block();
    let rendered = metronome.scheduler().rendered_frames();
    metronome.scheduler_mut().set_audible_frames(rendered);
    metronome.frame();
    block
}

/// Start the metronome, render `bars` bars, stop, and let the last click ring
/// out. Returns interleaved samples.
pub fn render_bars(metronome: &mut Metronome<Scheduler>, bars: u32) -> Vec<f32> {
    let target = metronome.scheduler().rendered_frames() + frames_for_bars(metronome, bars);
    let mut output = Vec::new();

    metronome.start();
    while metronome.scheduler().rendered_frames() < target {
        output.extend(render_step(metronome));
    }
    metronome.stop();

    while metronome.scheduler().has_tail() {
        output.extend(render_step(metronome));
    }
    metronome.frame();

    debug!(
        bars,
        frames = output.len() / metronome.scheduler().channels().max(1) as usize,
        "offline render finished"
    );
    output
}

/// Write interleaved samples as a 32-bit float WAV.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}
