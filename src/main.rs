//! Pulseshape: play the metronome live or render it to a WAV file.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use kurbo::Point;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pulseshape::audio::AudioEngine;
use pulseshape::config::Settings;
use pulseshape::engine::{Scheduler, SchedulerConfig};
use pulseshape::geometry::{largest_square, Shape};
use pulseshape::instrument::build_voice;
use pulseshape::metronome::{route_panics_to_tracing, Metronome, Signature, Subdivision};
use pulseshape::render;

/// Drawing area the cursor is laid out in.
const VIEW_SIZE: f64 = 400.0;
const VIEW_PADDING: f64 = 32.0;

/// Longest wait for queued audio to play out after stopping.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const QUEUE_POLL: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(author, version, about = "A visual metronome", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Overrides {
    /// Settings file (default: ~/.pulseshape/config.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tempo in beats per minute.
    #[arg(long, global = true)]
    bpm: Option<f64>,

    /// Beats per bar: 3, 4, 5, 6 or 7.
    #[arg(long, global = true)]
    signature: Option<Signature>,

    /// Clicks per beat: 1, 2, 3, 4 or 6.
    #[arg(long, global = true)]
    subdivisions: Option<Subdivision>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play through the default output device until Ctrl-C.
    Live {
        /// Stop after this many bars.
        #[arg(long)]
        bars: Option<u32>,
    },
    /// Render bars of clicks to a WAV file.
    Render {
        /// Output WAV path.
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 4)]
        bars: u32,

        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn load_settings(overrides: &Overrides) -> pulseshape::Result<Settings> {
    let mut settings = Settings::load(overrides.config.as_deref())?;
    if let Some(bpm) = overrides.bpm {
        settings.metronome.bpm = bpm;
    }
    if let Some(signature) = overrides.signature {
        settings.metronome.signature = signature;
    }
    if let Some(subdivisions) = overrides.subdivisions {
        settings.metronome.subdivisions = subdivisions;
    }
    Ok(settings)
}

fn build_metronome(
    settings: &Settings,
    sample_rate: u32,
    channels: u16,
) -> pulseshape::Result<Metronome<Scheduler>> {
    let scheduler = Scheduler::new(
        SchedulerConfig {
            bpm: settings.metronome.bpm,
            sample_rate,
            channels,
            block_size_frames: settings.audio.block_size,
        },
        build_voice(settings.audio.voice, settings.audio.seed),
    );
    Metronome::new(scheduler, settings.metronome.config())
}

/// Log ticks with the cursor's place on the shape.
fn attach_logging(metronome: &Metronome<Scheduler>, settings: &Settings) -> pulseshape::Result<()> {
    let view = largest_square(VIEW_SIZE, VIEW_SIZE, VIEW_PADDING);
    let shape = Shape::build(settings.display.shape, view, metronome.signature())?;
    let easing = settings
        .display
        .cursor_mode
        .easing(settings.display.cursor_mass);

    let cursor = Rc::new(Cell::new(Point::ORIGIN));
    let on_progress = Rc::clone(&cursor);
    let progress_shape = shape.clone();
    // Listeners live as long as the metronome.
    let _ = metronome.on_progress(move |progress| {
        on_progress.set(progress_shape.cursor_point(progress, easing));
    });

    let vertices = shape.division_points();
    let _ = metronome.on_tick(move |tick| {
        let vertex = vertices
            .get(tick.division_index as usize)
            .copied()
            .unwrap_or(Point::ORIGIN);
        info!(
            beat = tick.division_index + 1,
            x = vertex.x.round(),
            y = vertex.y.round(),
            "tick"
        );
    });

    let _ = metronome.on_subdivision_only_tick(move |tick| {
        let at = cursor.get();
        debug!(
            subdivision = tick.subdivision_index,
            x = at.x.round(),
            y = at.y.round(),
            "subdivision"
        );
    });
    Ok(())
}

fn run_live(settings: &Settings, bars: Option<u32>) -> pulseshape::Result<()> {
    let mut engine = AudioEngine::new()?;
    engine.set_volume(settings.audio.volume)?;

    let mut metronome = build_metronome(settings, engine.sample_rate(), engine.channels())?;
    attach_logging(&metronome, settings)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            warn!(%e, "could not install Ctrl-C handler");
        }
    }

    let lookahead =
        settings.audio.lookahead_ms as u64 * engine.sample_rate() as u64 / 1000;
    let target = bars.map(|bars| {
        metronome.scheduler().rendered_frames() + render::frames_for_bars(&metronome, bars)
    });
    let frame_interval = Duration::from_secs_f64(1.0 / settings.display.frame_rate.max(1) as f64);

    info!(
        bpm = metronome.bpm(),
        signature = %metronome.signature(),
        subdivisions = %metronome.subdivisions(),
        voice = %settings.audio.voice,
        "metronome started"
    );
    metronome.start();

    while !stop.load(Ordering::SeqCst) {
        let frame_start = Instant::now();

        fill_lookahead(&mut metronome, &mut engine, lookahead)?;
        metronome
            .scheduler_mut()
            .set_audible_frames(engine.played_frames());
        metronome.frame();

        if target.is_some_and(|target| engine.played_frames() >= target) {
            break;
        }
        if let Some(rest) = frame_interval.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    let interrupted = stop.load(Ordering::SeqCst);
    metronome.stop();
    if interrupted {
        // Silence at once; flushed frames still count as played.
        if let Err(e) = engine.flush() {
            warn!(%e, "could not flush queued audio");
        }
    } else {
        ring_out(&mut metronome, &mut engine)?;
    }
    wait_for_playback(&mut metronome, &engine);
    info!("metronome stopped");
    Ok(())
}

/// Render blocks until `lookahead` frames are queued ahead of playback.
///
/// Only as many blocks as the queue can take are rendered, so every block
/// that moves the render head is also played.
fn fill_lookahead(
    metronome: &mut Metronome<Scheduler>,
    engine: &mut AudioEngine,
    lookahead: u64,
) -> pulseshape::Result<()> {
    let blocks = render::lookahead_blocks(
        metronome.scheduler(),
        engine.played_frames(),
        lookahead,
        engine.queue_space(),
    );
    for _ in 0..blocks {
        let block = metronome.scheduler_mut().render_block();
        engine.send_block(block)?;
    }
    Ok(())
}

/// Send the ringing click tails, waiting for room in the queue.
fn ring_out(metronome: &mut Metronome<Scheduler>, engine: &mut AudioEngine) -> pulseshape::Result<()> {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while metronome.scheduler().has_tail() {
        if engine.queue_space() == 0 {
            if Instant::now() >= deadline {
                warn!("output queue stalled, click tails cut short");
                break;
            }
            thread::sleep(QUEUE_POLL);
            continue;
        }
        let block = metronome.scheduler_mut().render_block();
        engine.send_block(block)?;
    }
    Ok(())
}

/// Keep running display frames until everything rendered has played.
fn wait_for_playback(metronome: &mut Metronome<Scheduler>, engine: &AudioEngine) {
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    let rendered = metronome.scheduler().rendered_frames();
    while engine.played_frames() < rendered && Instant::now() < deadline {
        metronome
            .scheduler_mut()
            .set_audible_frames(engine.played_frames());
        metronome.frame();
        thread::sleep(QUEUE_POLL);
    }
    metronome
        .scheduler_mut()
        .set_audible_frames(engine.played_frames());
    metronome.frame();
}

fn run_render(
    settings: &Settings,
    output: &Path,
    bars: u32,
    sample_rate: u32,
) -> pulseshape::Result<()> {
    const CHANNELS: u16 = 2;

    let mut metronome = build_metronome(settings, sample_rate, CHANNELS)?;
    attach_logging(&metronome, settings)?;

    let samples = render::render_bars(&mut metronome, bars);
    render::write_wav(output, &samples, sample_rate, CHANNELS)?;

    info!(
        path = %output.display(),
        bars,
        seconds = samples.len() as f64 / CHANNELS as f64 / sample_rate as f64,
        "render written"
    );
    Ok(())
}

fn main() {
    init_tracing();
    route_panics_to_tracing();
    let cli = Cli::parse();

    let result = load_settings(&cli.overrides).and_then(|settings| match &cli.command {
        Commands::Live { bars } => run_live(&settings, *bars),
        Commands::Render {
            output,
            bars,
            sample_rate,
        } => run_render(&settings, output, *bars, *sample_rate),
    });

    if let Err(e) = result {
        error!(%e, "pulseshape failed");
        std::process::exit(1);
    }
}
