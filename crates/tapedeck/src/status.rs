/// Playback status owned by the player loop for one play invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusState {
    /// Output is held by the device lock.
    pub paused: bool,
    /// Replay the current track when it ends.
    pub looping: bool,
    /// The current track was left via Next/Prev; a late completion must be ignored.
    pub interrupted: bool,
    /// The output device has been opened for this player.
    pub device_initialized: bool,
    /// Rate the device runs at once initialized; every track is resampled to it.
    pub output_sample_rate: Option<u32>,
}

/// Copy of the fields the menu renders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub paused: bool,
    pub looping: bool,
}

impl StatusState {
    /// Per-track reset at the start of every session. `looping` survives a replay.
    pub fn reset_for_track(&mut self) {
        self.paused = false;
        self.interrupted = false;
    }

    /// Leaving the track early via Next/Prev.
    pub fn clear_for_skip(&mut self) {
        self.looping = false;
        self.interrupted = true;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            paused: self.paused,
            looping: self.looping,
        }
    }
}
