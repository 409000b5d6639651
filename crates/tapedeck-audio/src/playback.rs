//! Output stage (CPAL callback).
//!
//! The callback plays whatever [`Voice`] is installed in the shared slot:
//! - refills a small local buffer from the voice queue without blocking
//! - maps source channels onto device channels (mono↔stereo, best-effort otherwise)
//! - converts `f32` to the device sample format
//! - fires the voice's completion hook once its queue is closed and drained
//!
//! While the pause lock is held the callback writes silence and does not touch the queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::queue::{PopStrategy, SampleQueue};

/// Hook run on the audio thread when a voice finishes naturally.
pub type DrainedHook = Box<dyn FnOnce() + Send + 'static>;

/// One track's worth of audio at the device rate.
pub struct Voice {
    queue: Arc<SampleQueue>,
    /// Earlier stages (decoder output when resampling) torn down with this voice.
    upstream: Option<Arc<SampleQueue>>,
    on_drained: Option<DrainedHook>,
    buf: Vec<f32>,
    pos: usize,
}

impl Voice {
    pub fn new(
        queue: Arc<SampleQueue>,
        upstream: Option<Arc<SampleQueue>>,
        on_drained: DrainedHook,
    ) -> Self {
        Self {
            queue,
            upstream,
            on_drained: Some(on_drained),
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Stop every stage feeding this voice. The completion hook is dropped unfired.
    pub fn discard(mut self) {
        self.on_drained = None;
        self.queue.discard();
        if let Some(up) = &self.upstream {
            up.discard();
        }
    }

    fn channels(&self) -> usize {
        self.queue.channels()
    }
}

/// State shared between the speaker and its callback.
#[derive(Clone, Default)]
pub struct OutputShared {
    pub slot: Arc<Mutex<Option<Voice>>>,
    pub locked: Arc<AtomicBool>,
    pub played_frames: Arc<AtomicU64>,
}

impl OutputShared {
    /// Make `voice` the one the callback plays and restart the played-frame count.
    ///
    /// Returns the voice it replaced; its hook has not fired.
    pub fn install(&self, voice: Voice) -> Option<Voice> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        self.played_frames.store(0, Ordering::Relaxed);
        slot.replace(voice)
    }

    /// Empty the slot, returning the voice that was in it.
    pub fn take(&self) -> Option<Voice> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn played_frames(&self) -> u64 {
        self.played_frames.load(Ordering::Relaxed)
    }

    /// One callback period: fill `data` from the installed voice, or silence.
    fn service<T>(&self, data: &mut [T], channels_out: usize, refill_max_frames: usize)
    where
        T: cpal::Sample + cpal::FromSample<f32>,
    {
        let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);
        if self.locked.load(Ordering::Acquire) {
            data.fill(silence);
            return;
        }

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(voice) = slot.as_mut() else {
            data.fill(silence);
            return;
        };

        let (filled, finished) = render(voice, data, channels_out, refill_max_frames);
        if filled > 0 {
            self.played_frames
                .fetch_add(filled as u64, Ordering::Relaxed);
        }

        if finished {
            let hook = slot.take().and_then(|mut v| v.on_drained.take());
            drop(slot);
            if let Some(hook) = hook {
                hook();
            }
        }
    }
}

/// Build a CPAL output stream that plays the voice in `shared.slot`.
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    shared: &OutputShared,
    refill_max_frames: usize,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, shared, refill_max_frames),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, shared, refill_max_frames),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, shared, refill_max_frames),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, shared, refill_max_frames),
        other => Err(anyhow!("unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &OutputShared,
    refill_max_frames: usize,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = usize::from(config.channels).max(1);
    let refill_max_frames = refill_max_frames.max(1);
    let shared = shared.clone();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| shared.service(data, channels_out, refill_max_frames),
        |err| tracing::warn!("stream error: {err}"),
        None,
    )?;

    Ok(stream)
}

/// Fill `data` from `voice`. Returns `(frames written, voice finished)`.
fn render<T>(
    voice: &mut Voice,
    data: &mut [T],
    channels_out: usize,
    refill_max_frames: usize,
) -> (usize, bool)
where
    T: cpal::Sample + cpal::FromSample<f32>,
{
    let frames = data.len() / channels_out;
    let silence = <T as cpal::Sample>::from_sample::<f32>(0.0);

    for frame in 0..frames {
        if voice.pos >= voice.buf.len() {
            voice.pos = 0;
            voice.buf.clear();
            match voice.queue.pop(PopStrategy::NonBlocking {
                max_frames: refill_max_frames,
            }) {
                Some(v) => voice.buf = v,
                None => {
                    data[frame * channels_out..].fill(silence);
                    return (frame, voice.queue.is_drained());
                }
            }
        }

        let src_channels = voice.channels();
        let src = &voice.buf[voice.pos..voice.pos + src_channels];
        for ch in 0..channels_out {
            data[frame * channels_out + ch] =
                <T as cpal::Sample>::from_sample::<f32>(map_channel(src, channels_out, ch));
        }
        voice.pos += src_channels;
    }
    (frames, false)
}

/// Pick the sample for output channel `dst_ch` from one source frame.
///
/// - mono → any: duplicate channel 0
/// - stereo → mono: average L/R
/// - otherwise: same index, clamped to the last source channel
fn map_channel(src: &[f32], dst_channels: usize, dst_ch: usize) -> f32 {
    match (src.len(), dst_channels) {
        (0, _) => 0.0,
        (1, _) => src[0],
        (2, 1) => 0.5 * (src[0] + src[1]),
        (n, _) => src[dst_ch.min(n - 1)],
    }
}
