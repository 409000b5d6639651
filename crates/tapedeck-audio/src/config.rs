/// Tuning parameters shared by the decode, resample and output stages.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Resampler input chunk size in frames.
    pub chunk_frames: usize,
    /// Max frames pulled from the queue per output callback refill.
    pub refill_max_frames: usize,
    /// Target buffer duration (seconds) for each stage queue.
    pub buffer_seconds: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            refill_max_frames: 4096,
            buffer_seconds: 2.0,
        }
    }
}
