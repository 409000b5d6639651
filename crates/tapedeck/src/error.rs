use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("{0}")]
    Config(String),

    #[error("playlist store {path:?}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("playlist store {path:?} is not valid JSON: {source}")]
    StoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("playlist already exists: {0}")]
    PlaylistExists(String),

    #[error("playlist not found: {0}")]
    PlaylistNotFound(String),

    #[error("song {song:?} not found in playlist {playlist:?}")]
    TrackNotFound { playlist: String, song: String },

    #[error("track file {path:?}: {source}")]
    TrackFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot play {path:?}: {cause:#}")]
    Playback { path: PathBuf, cause: anyhow::Error },

    #[error("audio output: {0:#}")]
    Output(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DeckError {
    /// Open/decode failures a playlist can skip past.
    pub fn is_playback(&self) -> bool {
        matches!(self, DeckError::Playback { .. })
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_error_keeps_engine_context() {
        let err = DeckError::Playback {
            path: PathBuf::from("a.mp3"),
            cause: anyhow::anyhow!("probe failed").context("open \"a.mp3\""),
        };
        assert!(err.is_playback());
        let msg = err.to_string();
        assert!(msg.contains("a.mp3"));
        assert!(msg.contains("probe failed"));
    }

    #[test]
    fn config_error_is_not_playback() {
        assert!(!DeckError::Config("missing path".into()).is_playback());
    }

    #[test]
    fn missing_track_file_is_not_playback() {
        let err = DeckError::TrackFile {
            path: PathBuf::from("gone.mp3"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!err.is_playback());
        assert!(err.to_string().contains("gone.mp3"));
    }
}
