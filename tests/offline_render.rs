//! Rendering bars of clicks offline and writing them to disk.

use pulseshape::engine::{Scheduler, SchedulerConfig};
use pulseshape::instrument::{build_voice, VoiceKind};
use pulseshape::metronome::{Metronome, MetronomeConfig, Signature, Subdivision};
use pulseshape::render::{frames_for_bars, render_bars, write_wav};

const SAMPLE_RATE: u32 = 44100;
const CHANNELS: u16 = 2;

fn metronome(voice: VoiceKind, subdivisions: Subdivision) -> Metronome<Scheduler> {
    let scheduler = Scheduler::new(
        SchedulerConfig {
            bpm: 120.0,
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            block_size_frames: 441,
        },
        build_voice(voice, 7),
    );
    Metronome::new(
        scheduler,
        MetronomeConfig {
            signature: Signature::Four,
            subdivisions,
            bpm: 120.0,
        },
    )
    .unwrap()
}

/// Peak of the left channel over `frames`.
fn peak(samples: &[f32], frames: std::ops::Range<usize>) -> f32 {
    let channels = CHANNELS as usize;
    frames
        .filter_map(|f| samples.get(f * channels))
        .fold(0.0f32, |acc, s| acc.max(s.abs()))
}

#[test]
fn clicks_land_on_every_beat() {
    let mut m = metronome(VoiceKind::Membrane, Subdivision::One);
    let samples = render_bars(&mut m, 1);
    assert!(samples.len() >= frames_for_bars(&m, 1) as usize * CHANNELS as usize);

    // 120 BPM: a beat every 22050 frames.
    for beat in 0..4 {
        let at = beat * 22050;
        assert!(peak(&samples, at..at + 200) > 0.05, "no click on beat {beat}");
    }
}

#[test]
fn the_downbeat_is_accented() {
    let mut m = metronome(VoiceKind::Membrane, Subdivision::Two);
    let samples = render_bars(&mut m, 1);

    let downbeat = peak(&samples, 0..2000);
    let offbeat = peak(&samples, 11025..13025);
    assert!(offbeat > 0.0);
    assert!(downbeat > offbeat);
}

#[test]
fn render_ends_with_nothing_left_over() {
    let mut m = metronome(VoiceKind::Membrane, Subdivision::Six);
    let samples = render_bars(&mut m, 1);
    let bar = frames_for_bars(&m, 1) as usize * CHANNELS as usize;
    assert!(samples.len() >= bar);
    assert!(!m.running());
    assert!(!m.scheduler().has_tail());
    assert_eq!(m.scheduler().pending_draws(), 0);
}

#[test]
fn woodblock_renders_are_reproducible() {
    let first = render_bars(&mut metronome(VoiceKind::Woodblock, Subdivision::Three), 1);
    let second = render_bars(&mut metronome(VoiceKind::Woodblock, Subdivision::Three), 1);
    assert_eq!(first, second);
    assert!(first.iter().any(|s| s.abs() > 0.05));
}

#[test]
fn rendered_bars_round_trip_through_wav() {
    let mut m = metronome(VoiceKind::Membrane, Subdivision::Four);
    let samples = render_bars(&mut m, 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bars.wav");
    write_wav(&path, &samples, SAMPLE_RATE, CHANNELS).unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, CHANNELS);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.len() as usize, samples.len());
}

#[test]
fn restarting_begins_at_the_downbeat() {
    let mut m = metronome(VoiceKind::Membrane, Subdivision::One);
    render_bars(&mut m, 1);
    let again = render_bars(&mut m, 1);
    assert!(peak(&again, 0..200) > 0.05);
    assert!(m.progress().progress == 0.0);
}
