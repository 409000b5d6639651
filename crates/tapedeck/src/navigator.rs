//! Walks a track list one playback session at a time.

use crate::engine::AudioEngine;
use crate::error::Result;
use crate::library::Track;
use crate::session::{Player, StepResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaylistOutcome {
    /// Stepped past the last track.
    Finished,
    Quit,
    /// Stepped back from the first track.
    BeforeStart,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayReport {
    pub outcome: PlaylistOutcome,
    /// Sessions that started playing.
    pub sessions: usize,
}

/// Play `tracks` in order, honouring Next/Prev and per-track looping.
///
/// A track that cannot be opened is reported and skipped in the direction of the last step.
/// Skipping drops the loop flag, as Next/Prev do.
pub fn play_playlist<E: AudioEngine>(
    player: &mut Player<E>,
    tracks: &[Track],
) -> Result<PlayReport> {
    player.announce();

    let len = tracks.len() as isize;
    let mut idx: isize = 0;
    let mut sessions = 0;
    let mut last_step: isize = 1;

    while idx < len {
        let track = &tracks[idx as usize];
        let mut first_play = true;
        let mut step = last_step;

        while player.status().looping || first_play {
            first_play = false;
            match player.play_track(track) {
                Ok(StepResult::Quit) => {
                    return Ok(PlayReport {
                        outcome: PlaylistOutcome::Quit,
                        sessions: sessions + 1,
                    });
                }
                Ok(result) => {
                    sessions += 1;
                    step = result.offset();
                    last_step = step;
                }
                Err(e) if e.is_playback() => {
                    tracing::warn!(index = idx, track = %track.name, "skipping track: {e}");
                    player.notice(&format!("skipping {}: {e}", track.name))?;
                    player.clear_loop();
                    step = last_step;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        idx += step;
        if idx < 0 {
            return Ok(PlayReport {
                outcome: PlaylistOutcome::BeforeStart,
                sessions,
            });
        }
    }

    Ok(PlayReport {
        outcome: PlaylistOutcome::Finished,
        sessions,
    })
}

/// Play one track. Prev restarts it; Next or completion (without loop) ends playback.
pub fn play_single<E: AudioEngine>(player: &mut Player<E>, track: &Track) -> Result<PlayReport> {
    player.announce();

    let mut sessions = 0;
    let mut first_play = true;
    while player.status().looping || first_play {
        first_play = false;
        let result = player.play_track(track)?;
        sessions += 1;
        match result {
            StepResult::Quit => {
                return Ok(PlayReport {
                    outcome: PlaylistOutcome::Quit,
                    sessions,
                });
            }
            StepResult::Retreat => first_play = true,
            StepResult::Advance | StepResult::Continue => {}
        }
    }

    Ok(PlayReport {
        outcome: PlaylistOutcome::Finished,
        sessions,
    })
}
