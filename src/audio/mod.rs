//! Audio output: cpal stream fed through a lock-free command queue.
//!
//! The host loop renders blocks ahead of time with the scheduler and sends
//! them here as [`AudioCommand`]s. The output thread drains them in its
//! callback and counts consumed frames, which the host reads back with
//! [`AudioEngine::played_frames`] to tell the scheduler what is audible.

pub mod command;
pub mod output;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Observer, Producer, Split},
    HeapRb,
};
use tracing::{error, info};

pub use command::AudioCommand;

use output::OutputCallback;

/// Command queue capacity.
const RING_BUFFER_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The output thread is not draining commands fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
}

/// Owns the cpal stream and the producer side of the command queue.
pub struct AudioEngine {
    /// Playing for as long as the engine lives.
    _stream: cpal::Stream,
    producer: ringbuf::HeapProd<AudioCommand>,
    consumed: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl AudioEngine {
    /// Open the default output device at its default configuration.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        Self::build_with_device(&device, config.sample_rate().0, config.channels())
    }

    /// Open the default output device with an explicit format.
    pub fn with_config(sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        Self::build_with_device(&device, sample_rate, channels)
    }

    fn build_with_device(
        device: &cpal::Device,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, AudioError> {
        let rb = HeapRb::<AudioCommand>::new(RING_BUFFER_CAPACITY);
        let (producer, consumer) = rb.split();
        let consumed = Arc::new(AtomicU64::new(0));

        let mut callback =
            OutputCallback::new(consumer, channels, sample_rate, Arc::clone(&consumed));

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback.process(data);
                },
                |err: cpal::StreamError| error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        info!(sample_rate, channels, "audio output started");

        Ok(Self {
            _stream: stream,
            producer,
            consumed,
            sample_rate,
            channels,
        })
    }

    /// Queue a rendered block of interleaved samples.
    pub fn send_block(&mut self, samples: Vec<f32>) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Block(samples))
            .map_err(|_| AudioError::BufferFull)
    }

    /// Set output volume (clamped to 0.0..=1.0 on the audio thread).
    pub fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::SetVolume(volume))
            .map_err(|_| AudioError::BufferFull)
    }

    /// Drop queued audio that has not played yet.
    pub fn flush(&mut self) -> Result<(), AudioError> {
        self.producer
            .try_push(AudioCommand::Flush)
            .map_err(|_| AudioError::BufferFull)
    }

    /// Frames the output thread has consumed, flushed frames included.
    pub fn played_frames(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Commands that can be queued right now without being rejected.
    pub fn queue_space(&self) -> usize {
        self.producer.vacant_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires audio device; run manually with `cargo test -- --ignored`
    fn engine_opens_default_device() {
        let engine = AudioEngine::new().expect("no audio device");
        assert!(engine.sample_rate() > 0);
        assert!(engine.channels() > 0);
    }

    #[test]
    #[ignore] // Requires audio device
    fn blocks_are_consumed() {
        let mut engine = AudioEngine::new().expect("no audio device");
        let frames = 4096usize;
        engine
            .send_block(vec![0.0; frames * engine.channels() as usize])
            .expect("queue full");
        std::thread::sleep(std::time::Duration::from_millis(500));
        assert!(engine.played_frames() >= frames as u64);
    }

    #[test]
    #[ignore] // Requires audio device
    fn volume_and_flush() {
        let mut engine = AudioEngine::new().expect("no audio device");
        assert!(engine.set_volume(0.5).is_ok());
        assert!(engine.flush().is_ok());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            AudioError::BufferFull.to_string(),
            "audio command ring buffer is full"
        );
        assert_eq!(
            AudioError::DeviceConfig("test".to_string()).to_string(),
            "device config error: test"
        );
    }
}
