//! Streaming resample stage.
//!
//! Converts a decoded track to the fixed rate the output device was opened at. Runs on its
//! own thread between two [`SampleQueue`]s.

use std::sync::Arc;
use std::thread;

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::queue::{PopStrategy, SampleQueue, capacity_for};

/// Start a resampler thread reading `srcq` at `src_rate` and writing `dst_rate` audio into
/// the returned queue.
///
/// The output queue is closed when the input is exhausted. If the output queue is closed
/// first (track torn down), the input queue is closed too so the decoder stops.
pub fn start_resampler(
    srcq: Arc<SampleQueue>,
    src_rate: u32,
    dst_rate: u32,
    chunk_frames: usize,
    buffer_seconds: f32,
) -> Result<Arc<SampleQueue>> {
    if src_rate == 0 || dst_rate == 0 {
        return Err(anyhow!("cannot resample {src_rate} Hz -> {dst_rate} Hz"));
    }
    let channels = srcq.channels();
    let chunk_frames = chunk_frames.max(1);
    let ratio = f64::from(dst_rate) / f64::from(src_rate);

    let sinc_len = 128;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };
    let resampler = Async::<f32>::new_sinc(
        ratio,
        1.1,
        &params,
        chunk_frames,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("resampler init: {e}"))?;

    let dstq = Arc::new(SampleQueue::new(
        channels,
        capacity_for(dst_rate, channels, buffer_seconds),
    ));

    let dstq_thread = dstq.clone();
    thread::spawn(move || {
        let mut stage = Stage {
            resampler: Box::new(resampler),
            channels,
            out: vec![0.0f32; channels * chunk_frames * 3],
        };

        let mut open = true;
        while let Some(chunk) = srcq.pop(PopStrategy::BlockingExact {
            frames: chunk_frames,
        }) {
            if !stage.run(&chunk, None, &dstq_thread) {
                open = false;
                break;
            }
        }

        while open {
            let Some(tail) = srcq.pop(PopStrategy::BlockingUpTo {
                max_frames: chunk_frames,
            }) else {
                break;
            };
            let frames = tail.len() / channels;
            open = stage.run(&tail, Some(frames), &dstq_thread);
        }

        if !open {
            srcq.close();
        }
        dstq_thread.close();
    });

    tracing::info!(from_hz = src_rate, to_hz = dst_rate, "resampling");
    Ok(dstq)
}

struct Stage {
    resampler: Box<dyn Resampler<f32>>,
    channels: usize,
    out: Vec<f32>,
}

impl Stage {
    /// Resample one chunk and push it downstream. `false` means stop: either the output
    /// queue closed or the resampler failed.
    fn run(&mut self, input: &[f32], partial_len: Option<usize>, dstq: &SampleQueue) -> bool {
        if dstq.is_closed() {
            return false;
        }
        let frames = input.len() / self.channels;
        let input_adapter = match InterleavedSlice::new(input, self.channels, frames) {
            Ok(a) => a,
            Err(e) => {
                tracing::error!("resampler input adapter: {e:#}");
                return false;
            }
        };

        let out_frames = self.out.len() / self.channels;
        let mut output_adapter =
            match InterleavedSlice::new_mut(&mut self.out, self.channels, out_frames) {
                Ok(a) => a,
                Err(e) => {
                    tracing::error!("resampler output adapter: {e:#}");
                    return false;
                }
            };

        let indexing = Indexing {
            input_offset: 0,
            output_offset: 0,
            active_channels_mask: None,
            partial_len,
        };

        let produced = match self.resampler.process_into_buffer(
            &input_adapter,
            &mut output_adapter,
            Some(&indexing),
        ) {
            Ok((_consumed, produced)) => produced,
            Err(e) => {
                tracing::error!("resampler process: {e:#}");
                return false;
            }
        };

        let samples = produced * self.channels;
        samples == 0 || dstq.push_blocking(&self.out[..samples])
    }
}
