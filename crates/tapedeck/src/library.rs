//! Track and playlist model as stored in the playlist file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DeckError, Result};

/// A playable file and its display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Path")]
    pub path: PathBuf,
}

impl Track {
    /// Build a track for an existing file; the file name becomes the display name.
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            return Err(DeckError::Config("track path must not be empty".into()));
        }
        let meta = std::fs::metadata(path).map_err(|source| DeckError::TrackFile {
            path: path.to_path_buf(),
            source,
        })?;
        if !meta.is_file() {
            return Err(DeckError::TrackFile {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a regular file",
                ),
            });
        }
        Ok(Self {
            name: display_name(path),
            path: path.to_path_buf(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Songs", default, deserialize_with = "null_as_empty")]
    pub songs: Vec<Track>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            songs: Vec::new(),
        }
    }
}

// Playlists created by older builds store an empty song list as `null`.
fn null_as_empty<'de, D>(de: D) -> std::result::Result<Vec<Track>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Track>>::deserialize(de)?.unwrap_or_default())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_capitalized_keys_are_accepted() {
        let raw = r#"[{"Name":"road","Songs":[{"Name":"a.mp3","Path":"/music/a.mp3"}]}]"#;
        let lists: Vec<Playlist> = serde_json::from_str(raw).unwrap();
        assert_eq!(lists[0].name, "road");
        assert_eq!(lists[0].songs[0].path, PathBuf::from("/music/a.mp3"));
    }

    #[test]
    fn null_or_missing_songs_parse_as_empty() {
        let raw = r#"[{"name":"x"},{"Name":"y","Songs":null}]"#;
        let lists: Vec<Playlist> = serde_json::from_str(raw).unwrap();
        assert!(lists[0].songs.is_empty());
        assert!(lists[1].songs.is_empty());
    }

    #[test]
    fn serializes_lowercase_keys() {
        let json = serde_json::to_string(&Playlist::new("mix")).unwrap();
        assert_eq!(json, r#"{"name":"mix","songs":[]}"#);
    }

    #[test]
    fn from_path_uses_file_name() {
        let path = std::env::current_exe().unwrap();
        let track = Track::from_path(&path).unwrap();
        assert_eq!(
            track.name,
            path.file_name().unwrap().to_string_lossy().into_owned()
        );
    }

    #[test]
    fn from_path_rejects_missing_and_empty() {
        let missing = std::env::temp_dir().join("tapedeck-missing-track.flac");
        assert!(matches!(
            Track::from_path(&missing),
            Err(DeckError::TrackFile { .. })
        ));
        assert!(matches!(
            Track::from_path(&std::env::temp_dir()),
            Err(DeckError::TrackFile { .. })
        ));
        assert!(matches!(
            Track::from_path(Path::new("")),
            Err(DeckError::Config(_))
        ));
    }
}
