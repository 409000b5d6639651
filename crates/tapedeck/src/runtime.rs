//! Command dispatch.
//!
//! Turns parsed CLI arguments into store operations or a play invocation (menu thread plus
//! player loop on the calling thread).

use std::io::{self, Write};
use std::thread;

use crate::cli::{Args, Command, PlayArgs, PlaySource, PlaylistCommand};
use crate::conduit;
use crate::config::PlayerConfig;
use crate::engine::CpalEngine;
use crate::error::{DeckError, Result};
use crate::library::Track;
use crate::menu::MenuController;
use crate::navigator::{self, PlayReport};
use crate::session::Player;
use crate::store::PlaylistStore;

/// Run one CLI invocation to completion.
pub fn run(args: Args) -> Result<()> {
    if args.list_devices {
        return list_devices();
    }
    let config = args.player_config();
    let Some(cmd) = args.cmd else {
        return Err(DeckError::Config(
            "no command given (try `tapedeck --help`)".into(),
        ));
    };

    let store = PlaylistStore::new(&config.store_path);
    store.ensure_exists()?;

    match cmd {
        Command::Play(play) => run_play(&config, &store, play),
        Command::Playlist { cmd } => run_playlist_command(&store, cmd, &mut io::stdout()),
    }
}

/// Print output devices to stdout.
pub fn list_devices() -> Result<()> {
    tapedeck_audio::speaker::list_devices().map_err(DeckError::Output)
}

fn run_play(config: &PlayerConfig, store: &PlaylistStore, play: PlayArgs) -> Result<()> {
    let report = match (play.source, play.path) {
        (Some(PlaySource::Playlist { name }), _) => {
            let tracks = store.resolve(&name)?;
            tracing::info!(playlist = %name, tracks = tracks.len(), "playing playlist");
            with_menu(config, |player| navigator::play_playlist(player, &tracks))?
        }
        (None, Some(path)) => {
            let track = Track::from_path(&path)?;
            with_menu(config, |player| navigator::play_single(player, &track))?
        }
        (None, None) => {
            return Err(DeckError::Config("nothing to play: give a file path".into()));
        }
    };
    tracing::info!(outcome = ?report.outcome, sessions = report.sessions, "playback ended");
    Ok(())
}

/// Start the menu on its own thread and run `play` with a player on this thread.
///
/// The menu thread is not joined: it may be parked on a stdin read, and dropping the player
/// closes its side of the conduit.
fn with_menu<F>(config: &PlayerConfig, play: F) -> Result<PlayReport>
where
    F: FnOnce(&mut Player<CpalEngine>) -> Result<PlayReport>,
{
    let (session_end, menu_end) = conduit::pair();
    thread::Builder::new()
        .name("menu".into())
        .spawn(move || {
            let mut menu = MenuController::new(menu_end, io::stdin().lock(), io::stdout());
            if let Err(e) = menu.run() {
                tracing::warn!("menu stopped: {e}");
            }
        })?;

    let engine = CpalEngine::new(config.device.clone(), config.engine.clone());
    let mut player = Player::new(engine, session_end, config.tick, Box::new(io::stdout()));
    play(&mut player)
}

/// Apply a playlist store command and print its result to `out`.
pub fn run_playlist_command<W: Write>(
    store: &PlaylistStore,
    cmd: PlaylistCommand,
    out: &mut W,
) -> Result<()> {
    match cmd {
        PlaylistCommand::Create { name } => {
            store.create(&name)?;
            writeln!(out, "made playlist {name}")?;
        }
        PlaylistCommand::Add { playlist, path } => {
            let track = store.add(&playlist, &path)?;
            writeln!(out, "added {} to {playlist}", track.name)?;
        }
        PlaylistCommand::Remove { playlist, song } => {
            store.remove(&playlist, &song)?;
            writeln!(out, "{song} removed from the playlist {playlist}")?;
        }
        PlaylistCommand::Delete { name } => {
            store.delete(&name)?;
            writeln!(out, "{name} deleted")?;
        }
        PlaylistCommand::Lists => {
            let lists = store.list()?;
            if lists.is_empty() {
                writeln!(out, "no playlists")?;
            }
            for playlist in lists {
                writeln!(out, "\n {}", playlist.name)?;
                for song in playlist.songs {
                    writeln!(out, "    {}", song.name)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_store(tag: &str) -> PlaylistStore {
        let root = std::env::temp_dir().join(format!(
            "tapedeck-runtime-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&root).unwrap();
        PlaylistStore::new(root.join("playlists.json"))
    }

    fn run_cmd(store: &PlaylistStore, cmd: PlaylistCommand) -> Result<String> {
        let mut out = Vec::new();
        run_playlist_command(store, cmd, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn lists_on_fresh_store_shows_nothing() {
        let store = temp_store("fresh");
        assert!(!store.path().exists());
        store.ensure_exists().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
        assert_eq!(run_cmd(&store, PlaylistCommand::Lists).unwrap(), "no playlists\n");
    }

    #[test]
    fn create_add_list_remove_delete() {
        let store = temp_store("cycle");
        store.ensure_exists().unwrap();
        let song = store.path().with_file_name("tune.ogg");
        fs::write(&song, b"OggS").unwrap();

        let out = run_cmd(&store, PlaylistCommand::Create { name: "road".into() }).unwrap();
        assert_eq!(out, "made playlist road\n");

        run_cmd(
            &store,
            PlaylistCommand::Add {
                playlist: "road".into(),
                path: song.clone(),
            },
        )
        .unwrap();
        let listed = run_cmd(&store, PlaylistCommand::Lists).unwrap();
        assert_eq!(listed, "\n road\n    tune.ogg\n");

        run_cmd(
            &store,
            PlaylistCommand::Remove {
                playlist: "road".into(),
                song: "tune.ogg".into(),
            },
        )
        .unwrap();
        run_cmd(&store, PlaylistCommand::Delete { name: "road".into() }).unwrap();
        assert_eq!(run_cmd(&store, PlaylistCommand::Lists).unwrap(), "no playlists\n");
    }

    #[test]
    fn failing_command_prints_nothing() {
        let store = temp_store("fail");
        store.ensure_exists().unwrap();
        let mut out = Vec::new();
        let err = run_playlist_command(
            &store,
            PlaylistCommand::Add {
                playlist: "nope".into(),
                path: PathBuf::from("/definitely/not/here.mp3"),
            },
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, DeckError::TrackFile { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn play_without_path_is_a_config_error() {
        let store = temp_store("nothing");
        store.ensure_exists().unwrap();
        let err = run_play(
            &PlayerConfig::default(),
            &store,
            PlayArgs {
                source: None,
                path: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DeckError::Config(_)));
    }

    #[test]
    fn play_unknown_playlist_fails_before_audio() {
        let store = temp_store("unknown");
        store.ensure_exists().unwrap();
        let err = run_play(
            &PlayerConfig::default(),
            &store,
            PlayArgs {
                source: Some(PlaySource::Playlist { name: "ghost".into() }),
                path: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DeckError::PlaylistNotFound(_)));
    }
}
