//! Streaming decode stage.
//!
//! Uses Symphonia to probe a local file, then decodes packets into interleaved `f32` on a
//! background thread that feeds a bounded [`SampleQueue`].

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, DecoderOptions};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::queue::{SampleQueue, capacity_for};

/// A track whose decoder thread is running.
pub struct DecodedTrack {
    /// Source rate and channel layout.
    pub spec: SignalSpec,
    /// Decoded interleaved samples at `spec.rate`.
    pub queue: Arc<SampleQueue>,
    /// Total length when the container reports a frame count.
    pub duration: Option<Duration>,
    /// Codec label for logging.
    pub codec: Option<&'static str>,
}

/// Open `path`, probe it and start decoding on a background thread.
///
/// Probe failures (missing file, unknown container, no audio track) are returned
/// synchronously. Once running, the decoder stops on EOF or when the queue is closed; the
/// queue is always closed when the thread exits.
pub fn open_track(path: &Path, buffer_seconds: f32) -> Result<DecodedTrack> {
    let file = File::open(path).with_context(|| format!("open {:?}", path))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("probe {:?}", path))?;

    let format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track in {:?}", path))?;

    let codec_params = track.codec_params.clone();
    let channels = codec_params
        .channels
        .ok_or_else(|| anyhow!("unknown channel layout in {:?}", path))?;
    let rate = codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate in {:?}", path))?;

    let spec = SignalSpec::new(rate, channels);
    let duration = duration_from_codec_params(&codec_params);
    let codec = codec_label(&codec_params);

    let max_samples = capacity_for(rate, channels.count(), buffer_seconds);
    let queue = Arc::new(SampleQueue::new(channels.count(), max_samples));

    // Creating the decoder here keeps "unsupported codec" a synchronous open error.
    let decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .with_context(|| format!("create decoder for {:?}", path))?;

    let queue_for_thread = queue.clone();
    let label = path.display().to_string();
    thread::spawn(move || {
        if let Err(e) = decode_loop(format, decoder, &queue_for_thread) {
            tracing::warn!(track = %label, "decoder stopped: {e:#}");
        }
        queue_for_thread.close();
    });

    tracing::debug!(
        path = ?path,
        rate_hz = rate,
        channels = channels.count(),
        codec = codec.unwrap_or("unknown"),
        "track opened"
    );

    Ok(DecodedTrack {
        spec,
        queue,
        duration,
        codec,
    })
}

fn decode_loop(
    mut format: Box<dyn FormatReader>,
    mut decoder: Box<dyn symphonia::core::codecs::Decoder>,
    queue: &Arc<SampleQueue>,
) -> Result<()> {
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(_) => break, // EOF
        };

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                tracing::debug!("skipping corrupt packet: {e}");
                continue;
            }
            Err(e) => return Err(e).context("decode packet"),
        };

        let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);

        if !queue.push_blocking(buf.samples()) {
            // Queue closed by the output side: track was interrupted.
            break;
        }
    }
    Ok(())
}

/// Track length from the container's frame count, if it has one.
fn duration_from_codec_params(params: &CodecParameters) -> Option<Duration> {
    let frames = params.n_frames?;
    let rate = u64::from(params.sample_rate?);
    if rate == 0 {
        return None;
    }
    Some(Duration::from_millis(frames.saturating_mul(1000) / rate))
}

fn codec_label(params: &CodecParameters) -> Option<&'static str> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_ALAC => "ALAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_MP3, CODEC_TYPE_PCM_S16LE};

    #[test]
    fn duration_is_none_for_zero_rate() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(0);
        params.n_frames = Some(100);
        assert!(duration_from_codec_params(&params).is_none());
    }

    #[test]
    fn duration_from_frame_count() {
        let mut params = CodecParameters::new();
        params.sample_rate = Some(44_100);
        params.n_frames = Some(44_100 * 200 + 22_050);
        assert_eq!(
            duration_from_codec_params(&params),
            Some(Duration::from_millis(200_500))
        );
    }

    #[test]
    fn codec_label_maps_known_codecs() {
        let mut params = CodecParameters::new();
        params.codec = CODEC_TYPE_MP3;
        assert_eq!(codec_label(&params), Some("MP3"));
        params.codec = CODEC_TYPE_PCM_S16LE;
        assert_eq!(codec_label(&params), Some("PCM_S16"));
        assert_eq!(codec_label(&CodecParameters::new()), None);
    }

    #[test]
    fn open_track_reports_missing_file() {
        let path = std::env::temp_dir().join("tapedeck-does-not-exist.mp3");
        let err = open_track(&path, 2.0).err().expect("missing file must fail");
        assert!(format!("{err:#}").contains("open"));
    }
}
