//! Playlist store: a flat JSON array of named playlists on disk.
//!
//! Every mutating command loads the file, validates against the loaded state and only then
//! writes. Writes go to a sibling temp file that is renamed over the store, so a failed
//! command leaves the previous contents in place.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeckError, Result};
use crate::library::{Playlist, Track};

pub const DEFAULT_STORE: &str = "playlists.json";

#[derive(Clone, Debug)]
pub struct PlaylistStore {
    path: PathBuf,
}

impl PlaylistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the store containing `[]` if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        tracing::info!(path = ?self.path, "creating empty playlist store");
        self.save(&[])
    }

    pub fn load(&self) -> Result<Vec<Playlist>> {
        let raw = fs::read(&self.path).map_err(|source| self.io_err(source))?;
        serde_json::from_slice(&raw).map_err(|source| DeckError::StoreFormat {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, playlists: &[Playlist]) -> Result<()> {
        let body = serde_json::to_vec(playlists).map_err(|source| DeckError::StoreFormat {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.temp_path();
        fs::write(&tmp, body).map_err(|source| self.io_err(source))?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.io_err(source));
        }
        Ok(())
    }

    pub fn create(&self, name: &str) -> Result<()> {
        let name = required(name, "playlist name")?;
        let mut lists = self.load()?;
        if lists.iter().any(|p| p.name == name) {
            return Err(DeckError::PlaylistExists(name.to_string()));
        }
        lists.push(Playlist::new(name));
        self.save(&lists)?;
        tracing::info!(playlist = name, "playlist created");
        Ok(())
    }

    /// Append the file at `path` to `playlist`. Returns the added track.
    pub fn add(&self, playlist: &str, path: &Path) -> Result<Track> {
        let playlist = required(playlist, "playlist name")?;
        if path.as_os_str().is_empty() {
            return Err(DeckError::Config("song path must not be empty".into()));
        }
        let track = Track::from_path(path)?;
        let mut lists = self.load()?;
        let target = find_mut(&mut lists, playlist)?;
        target.songs.push(track.clone());
        self.save(&lists)?;
        tracing::info!(playlist, song = %track.name, "song added");
        Ok(track)
    }

    /// Remove the first track named `song` from `playlist`.
    pub fn remove(&self, playlist: &str, song: &str) -> Result<()> {
        let playlist = required(playlist, "playlist name")?;
        let song = required(song, "song name")?;
        let mut lists = self.load()?;
        let target = find_mut(&mut lists, playlist)?;
        let idx = target
            .songs
            .iter()
            .position(|t| t.name == song)
            .ok_or_else(|| DeckError::TrackNotFound {
                playlist: playlist.to_string(),
                song: song.to_string(),
            })?;
        target.songs.remove(idx);
        self.save(&lists)?;
        tracing::info!(playlist, song, "song removed");
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let name = required(name, "playlist name")?;
        let mut lists = self.load()?;
        let before = lists.len();
        lists.retain(|p| p.name != name);
        if lists.len() == before {
            return Err(DeckError::PlaylistNotFound(name.to_string()));
        }
        self.save(&lists)?;
        tracing::info!(playlist = name, "playlist deleted");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Playlist>> {
        self.load()
    }

    /// Tracks of `name` in play order.
    pub fn resolve(&self, name: &str) -> Result<Vec<Track>> {
        let name = required(name, "playlist name")?;
        self.load()?
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.songs)
            .ok_or_else(|| DeckError::PlaylistNotFound(name.to_string()))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_STORE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: std::io::Error) -> DeckError {
        DeckError::StoreIo {
            path: self.path.clone(),
            source,
        }
    }
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DeckError::Config(format!("{what} must not be empty")));
    }
    Ok(value)
}

fn find_mut<'a>(lists: &'a mut [Playlist], name: &str) -> Result<&'a mut Playlist> {
    lists
        .iter_mut()
        .find(|p| p.name == name)
        .ok_or_else(|| DeckError::PlaylistNotFound(name.to_string()))
}
