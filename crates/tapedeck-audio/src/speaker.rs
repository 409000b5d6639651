//! Process-wide audio output.
//!
//! A [`Speaker`] opens the device once at a fixed sample rate and keeps its stream running
//! for the life of the process. Tracks are handed to it one at a time with
//! [`Speaker::play`]; anything not already at the speaker rate goes through the resampler.

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};

use crate::config::EngineConfig;
use crate::decode::DecodedTrack;
use crate::device;
use crate::playback::{self, DrainedHook, OutputShared, Voice};
use crate::resample;

pub struct Speaker {
    _stream: cpal::Stream,
    sample_rate: u32,
    shared: OutputShared,
    config: EngineConfig,
}

impl Speaker {
    /// Open the output device (default, or first name match for `device_needle`) as close to
    /// `sample_rate` as it allows and start the stream.
    ///
    /// The stream plays silence until a track is installed.
    pub fn open(
        device_needle: Option<&str>,
        sample_rate: u32,
        config: EngineConfig,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = device::pick_device(&host, device_needle)?;
        let supported = device::pick_output_config(&device, sample_rate)?;
        let mut stream_config: cpal::StreamConfig = supported.clone().into();
        if let Some(buf) = device::pick_buffer_size(&supported) {
            stream_config.buffer_size = buf;
        }

        let shared = OutputShared::default();
        let stream = playback::build_output_stream(
            &device,
            &stream_config,
            supported.sample_format(),
            &shared,
            config.refill_max_frames,
        )?;
        stream.play().context("start output stream")?;

        tracing::info!(
            device = %device.description().map(|d| d.to_string()).unwrap_or_default(),
            requested_hz = sample_rate,
            rate_hz = stream_config.sample_rate,
            channels = stream_config.channels,
            format = ?supported.sample_format(),
            "speaker opened"
        );

        Ok(Self {
            _stream: stream,
            sample_rate: stream_config.sample_rate,
            shared,
            config,
        })
    }

    /// Rate the device actually runs at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Replace whatever is playing with `track`. `on_drained` runs on the audio thread once
    /// the track plays out; it is dropped unfired if the track is cleared first.
    pub fn play(&self, track: DecodedTrack, on_drained: DrainedHook) -> Result<()> {
        let src_rate = track.spec.rate;
        let (queue, upstream) = if src_rate == self.sample_rate {
            tracing::debug!(rate_hz = src_rate, "resample skipped");
            (track.queue, None)
        } else {
            let out = resample::start_resampler(
                track.queue.clone(),
                src_rate,
                self.sample_rate,
                self.config.chunk_frames,
                self.config.buffer_seconds,
            )
            .inspect_err(|_| track.queue.discard())?;
            (out, Some(track.queue))
        };

        let voice = Voice::new(queue, upstream, on_drained);
        if let Some(prev) = self.shared.install(voice) {
            prev.discard();
        }
        Ok(())
    }

    /// Hold the output: the callback writes silence and leaves the queue untouched.
    pub fn lock(&self) {
        self.shared.locked.store(true, Ordering::Release);
    }

    pub fn unlock(&self) {
        self.shared.locked.store(false, Ordering::Release);
    }

    /// Audio played for the current track.
    pub fn elapsed(&self) -> Duration {
        frames_to_duration(self.shared.played_frames(), self.sample_rate)
    }

    /// Tear down the current track, if any, without firing its hook.
    pub fn clear(&self) {
        if let Some(voice) = self.shared.take() {
            voice.discard();
        }
    }
}

impl Drop for Speaker {
    fn drop(&mut self) {
        self.clear();
    }
}

/// List output devices on the default host.
pub fn list_devices() -> Result<()> {
    device::list_devices(&cpal::default_host())
}

fn frames_to_duration(frames: u64, rate: u32) -> Duration {
    if rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(frames.saturating_mul(1000) / u64::from(rate))
}
