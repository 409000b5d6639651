use std::path::PathBuf;
use std::time::Duration;

pub use tapedeck_audio::config::EngineConfig;

use crate::store::DEFAULT_STORE;

/// Everything a play or playlist command needs, resolved from the CLI.
#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub store_path: PathBuf,
    /// Output device name fragment; `None` means the host default.
    pub device: Option<String>,
    pub engine: EngineConfig,
    /// Progress line refresh interval.
    pub tick: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE),
            device: None,
            engine: EngineConfig::default(),
            tick: Duration::from_secs(1),
        }
    }
}

/// Blank device names select the default device.
pub fn normalize_device_name(device: Option<String>) -> Option<String> {
    device.and_then(|name| {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
