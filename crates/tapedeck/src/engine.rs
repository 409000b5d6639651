//! Audio engine seam.
//!
//! [`AudioEngine`] is everything a playback session needs from the audio stack. The
//! production implementation, [`CpalEngine`], drives a `tapedeck_audio` [`Speaker`]; tests
//! substitute a scripted engine.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tapedeck_audio::config::EngineConfig;
use tapedeck_audio::decode::{self, DecodedTrack};
use tapedeck_audio::speaker::Speaker;

/// What the session learns about a track when it is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackInfo {
    pub sample_rate: u32,
    pub duration: Option<Duration>,
}

/// Run once when the started track plays out. Never runs if the track is stopped first.
pub type CompletionHook = Box<dyn FnOnce() + Send + 'static>;

pub trait AudioEngine {
    /// Open and probe `path`, ready to be started.
    fn open(&mut self, path: &Path) -> Result<TrackInfo>;
    /// Open the output device near `sample_rate`. Returns the rate it actually runs at.
    fn init_output(&mut self, sample_rate: u32) -> Result<u32>;
    /// Start the opened track.
    fn start(&mut self, on_complete: CompletionHook) -> Result<()>;
    /// Elapsed play time of the current track.
    fn position(&self) -> Duration;
    /// Pause lock: output goes silent and the track stops advancing.
    fn lock(&mut self);
    fn unlock(&mut self);
    /// Tear down the current track and any queued output.
    fn stop(&mut self);
}

/// Engine backed by the process-wide CPAL output.
pub struct CpalEngine {
    device: Option<String>,
    config: EngineConfig,
    speaker: Option<Speaker>,
    pending: Option<DecodedTrack>,
}

impl CpalEngine {
    pub fn new(device: Option<String>, config: EngineConfig) -> Self {
        Self {
            device,
            config,
            speaker: None,
            pending: None,
        }
    }
}

impl AudioEngine for CpalEngine {
    fn open(&mut self, path: &Path) -> Result<TrackInfo> {
        if let Some(stale) = self.pending.take() {
            stale.queue.discard();
        }
        let track = decode::open_track(path, self.config.buffer_seconds)?;
        let info = TrackInfo {
            sample_rate: track.spec.rate,
            duration: track.duration,
        };
        tracing::info!(
            path = ?path,
            rate_hz = info.sample_rate,
            channels = track.spec.channels.count(),
            codec = track.codec.unwrap_or("unknown"),
            "track ready"
        );
        self.pending = Some(track);
        Ok(info)
    }

    fn init_output(&mut self, sample_rate: u32) -> Result<u32> {
        if let Some(speaker) = &self.speaker {
            return Ok(speaker.sample_rate());
        }
        let speaker = Speaker::open(self.device.as_deref(), sample_rate, self.config.clone())?;
        let rate = speaker.sample_rate();
        self.speaker = Some(speaker);
        Ok(rate)
    }

    fn start(&mut self, on_complete: CompletionHook) -> Result<()> {
        let speaker = self
            .speaker
            .as_ref()
            .ok_or_else(|| anyhow!("output device not initialized"))?;
        let track = self
            .pending
            .take()
            .ok_or_else(|| anyhow!("no track opened"))?;
        speaker.play(track, on_complete)
    }

    fn position(&self) -> Duration {
        self.speaker
            .as_ref()
            .map(Speaker::elapsed)
            .unwrap_or_default()
    }

    fn lock(&mut self) {
        if let Some(speaker) = &self.speaker {
            speaker.lock();
        }
    }

    fn unlock(&mut self) {
        if let Some(speaker) = &self.speaker {
            speaker.unlock();
        }
    }

    fn stop(&mut self) {
        if let Some(stale) = self.pending.take() {
            stale.queue.discard();
        }
        if let Some(speaker) = &self.speaker {
            speaker.clear();
        }
    }
}
