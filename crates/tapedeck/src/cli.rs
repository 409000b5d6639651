use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{EngineConfig, PlayerConfig, normalize_device_name};
use crate::store::DEFAULT_STORE;

#[derive(Parser, Debug)]
#[command(name = "tapedeck", version, about = "Play audio files and playlists from the terminal")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Playlist store file
    #[arg(long, global = true, default_value = DEFAULT_STORE)]
    pub store: PathBuf,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Resampler input chunk size in frames (higher => more latency, lower => more overhead)
    #[arg(long, global = true, default_value_t = 1024)]
    pub chunk_frames: usize,

    /// Playback callback refill cap (frames). Larger reduces lock churn but can add latency.
    #[arg(long, global = true, default_value_t = 4096)]
    pub refill_max_frames: usize,

    /// Queue buffer target in seconds (per stage)
    #[arg(long, global = true, default_value_t = 2.0)]
    pub buffer_seconds: f32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a file, or a saved playlist with `play playlist <NAME>`
    #[command(visible_alias = "p", args_conflicts_with_subcommands = true)]
    Play(PlayArgs),

    /// Manage saved playlists
    #[command(visible_aliases = ["pl", "pll", "playl"])]
    Playlist {
        #[command(subcommand)]
        cmd: PlaylistCommand,
    },
}

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    #[command(subcommand)]
    pub source: Option<PlaySource>,

    /// Path to an audio file
    pub path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum PlaySource {
    /// Play a saved playlist from the top
    #[command(visible_aliases = ["pl", "pll", "playl"])]
    Playlist { name: String },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistCommand {
    /// Create an empty playlist
    #[command(visible_aliases = ["c", "cr"])]
    Create { name: String },

    /// Append a file to a playlist
    #[command(visible_aliases = ["a", "ad"])]
    Add { playlist: String, path: PathBuf },

    /// Remove a song (by name) from a playlist
    #[command(visible_aliases = ["r", "rm", "rem"])]
    Remove { playlist: String, song: String },

    /// Delete a playlist
    #[command(visible_aliases = ["d", "del"])]
    Delete { name: String },

    /// Show every playlist and its songs
    #[command(visible_aliases = ["l", "ls"])]
    Lists,
}

impl Args {
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            store_path: self.store.clone(),
            device: normalize_device_name(self.device.clone()),
            engine: EngineConfig {
                chunk_frames: self.chunk_frames,
                refill_max_frames: self.refill_max_frames,
                buffer_seconds: self.buffer_seconds,
            },
            ..PlayerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tapedeck").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn play_path_and_alias() {
        for argv in [["play", "a.mp3"], ["p", "a.mp3"]] {
            match parse(&argv).cmd {
                Some(Command::Play(PlayArgs { source: None, path })) => {
                    assert_eq!(path, Some(PathBuf::from("a.mp3")));
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn play_playlist_aliases() {
        for alias in ["playlist", "pl", "pll", "playl"] {
            match parse(&["play", alias, "road"]).cmd {
                Some(Command::Play(PlayArgs {
                    source: Some(PlaySource::Playlist { name }),
                    path: None,
                })) => assert_eq!(name, "road"),
                other => panic!("unexpected for {alias}: {other:?}"),
            }
        }
    }

    #[test]
    fn playlist_subcommand_aliases() {
        assert!(matches!(
            parse(&["pl", "cr", "mix"]).cmd,
            Some(Command::Playlist { cmd: PlaylistCommand::Create { .. } })
        ));
        assert!(matches!(
            parse(&["playl", "ad", "mix", "a.mp3"]).cmd,
            Some(Command::Playlist { cmd: PlaylistCommand::Add { .. } })
        ));
        assert!(matches!(
            parse(&["playlist", "rem", "mix", "a.mp3"]).cmd,
            Some(Command::Playlist { cmd: PlaylistCommand::Remove { .. } })
        ));
        assert!(matches!(
            parse(&["pll", "del", "mix"]).cmd,
            Some(Command::Playlist { cmd: PlaylistCommand::Delete { .. } })
        ));
        assert!(matches!(
            parse(&["pl", "ls"]).cmd,
            Some(Command::Playlist { cmd: PlaylistCommand::Lists })
        ));
    }

    #[test]
    fn missing_playlist_args_are_rejected() {
        assert!(Args::try_parse_from(["tapedeck", "playlist", "add", "mix"]).is_err());
    }

    #[test]
    fn global_options_build_player_config() {
        let args = parse(&[
            "--store",
            "/tmp/lists.json",
            "--device",
            " dac ",
            "--buffer-seconds",
            "0.5",
            "pl",
            "ls",
        ]);
        let cfg = args.player_config();
        assert_eq!(cfg.store_path, PathBuf::from("/tmp/lists.json"));
        assert_eq!(cfg.device.as_deref(), Some("dac"));
        assert_eq!(cfg.engine.buffer_seconds, 0.5);
        assert_eq!(cfg.engine.chunk_frames, 1024);
    }

    #[test]
    fn list_devices_needs_no_command() {
        let args = parse(&["--list-devices"]);
        assert!(args.list_devices);
        assert!(args.cmd.is_none());
    }
}
