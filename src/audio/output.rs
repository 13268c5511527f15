//! Output callback: runs on the cpal audio thread.
//!
//! Drains commands, copies queued samples to the device buffer with volume
//! and a hard ceiling, and publishes how many frames have been consumed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::Consumer;
use ringbuf::HeapCons;

use super::command::AudioCommand;

/// Consumed samples are compacted away past this many.
const COMPACT_THRESHOLD: usize = 8192;

/// Hard output ceiling.
pub const CEILING: f32 = 0.95;

/// State that lives on the audio thread. Accessed only from the cpal callback.
pub struct OutputCallback {
    consumer: HeapCons<AudioCommand>,
    playback_buffer: Vec<f32>,
    read_pos: usize,
    volume: f32,
    channels: u16,
    /// Frames consumed (played or flushed) since the stream started.
    consumed: Arc<AtomicU64>,
}

impl OutputCallback {
    pub fn new(
        consumer: HeapCons<AudioCommand>,
        channels: u16,
        sample_rate: u32,
        consumed: Arc<AtomicU64>,
    ) -> Self {
        Self {
            consumer,
            playback_buffer: Vec::with_capacity(sample_rate as usize * channels as usize),
            read_pos: 0,
            volume: 1.0,
            channels,
            consumed,
        }
    }

    fn queued_samples(&self) -> usize {
        self.playback_buffer.len() - self.read_pos
    }

    fn add_consumed(&self, samples: usize) {
        let frames = samples / self.channels.max(1) as usize;
        self.consumed.fetch_add(frames as u64, Ordering::Release);
    }

    /// Fill `output` with queued samples, silence on underrun.
    pub fn process(&mut self, output: &mut [f32]) {
        while let Some(cmd) = self.consumer.try_pop() {
            match cmd {
                AudioCommand::Block(data) => {
                    self.playback_buffer.extend_from_slice(&data);
                }
                AudioCommand::SetVolume(v) => {
                    self.volume = v.clamp(0.0, 1.0);
                }
                AudioCommand::Flush => {
                    self.add_consumed(self.queued_samples());
                    self.playback_buffer.clear();
                    self.read_pos = 0;
                }
            }
        }

        let copy_len = output.len().min(self.queued_samples());
        for (out, &src) in output[..copy_len]
            .iter_mut()
            .zip(&self.playback_buffer[self.read_pos..self.read_pos + copy_len])
        {
            *out = (src * self.volume).clamp(-CEILING, CEILING);
        }
        self.read_pos += copy_len;
        self.add_consumed(copy_len);

        for sample in output[copy_len..].iter_mut() {
            *sample = 0.0;
        }

        if self.read_pos >= COMPACT_THRESHOLD {
            self.playback_buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringbuf::{
        traits::{Producer, Split},
        HeapRb,
    };

    fn setup() -> (
        ringbuf::HeapProd<AudioCommand>,
        OutputCallback,
        Arc<AtomicU64>,
    ) {
        let rb = HeapRb::<AudioCommand>::new(16);
        let (prod, cons) = rb.split();
        let consumed = Arc::new(AtomicU64::new(0));
        let callback = OutputCallback::new(cons, 2, 44100, Arc::clone(&consumed));
        (prod, callback, consumed)
    }

    #[test]
    fn silence_on_underrun() {
        let (_prod, mut callback, consumed) = setup();
        let mut output = vec![9.0f32; 64];
        callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(consumed.load(Ordering::Acquire), 0);
    }

    #[test]
    fn plays_blocks_and_counts_frames() {
        let (mut prod, mut callback, consumed) = setup();
        prod.try_push(AudioCommand::Block(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]))
            .unwrap();

        let mut output = vec![0.0f32; 4];
        callback.process(&mut output);
        assert_eq!(output, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(consumed.load(Ordering::Acquire), 2);

        callback.process(&mut output);
        assert_eq!(output, vec![0.5, 0.6, 0.0, 0.0]);
        assert_eq!(consumed.load(Ordering::Acquire), 3);
    }

    #[test]
    fn volume_and_ceiling() {
        let (mut prod, mut callback, _) = setup();
        prod.try_push(AudioCommand::SetVolume(0.5)).unwrap();
        prod.try_push(AudioCommand::Block(vec![0.4, -0.4, 4.0, -4.0]))
            .unwrap();

        let mut output = vec![0.0f32; 4];
        callback.process(&mut output);
        assert!((output[0] - 0.2).abs() < 1e-6);
        assert!((output[1] + 0.2).abs() < 1e-6);
        assert_eq!(output[2], CEILING);
        assert_eq!(output[3], -CEILING);
    }

    #[test]
    fn flush_counts_dropped_frames() {
        let (mut prod, mut callback, consumed) = setup();
        prod.try_push(AudioCommand::Block(vec![0.5; 200])).unwrap();
        let mut output = vec![0.0f32; 40];
        callback.process(&mut output);
        assert_eq!(consumed.load(Ordering::Acquire), 20);

        prod.try_push(AudioCommand::Flush).unwrap();
        callback.process(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(consumed.load(Ordering::Acquire), 100);
    }

    #[test]
    fn compacts_long_sessions() {
        let (mut prod, mut callback, consumed) = setup();
        let mut output = vec![0.0f32; 1024];
        for _ in 0..12 {
            prod.try_push(AudioCommand::Block(vec![0.1; 1024])).unwrap();
            callback.process(&mut output);
        }
        assert!(callback.playback_buffer.len() < COMPACT_THRESHOLD);
        assert_eq!(consumed.load(Ordering::Acquire), 12 * 512);
    }
}
