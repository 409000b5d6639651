//! One track from open to a terminal outcome.
//!
//! [`Player::play_track`] opens the track, brings the output device up on first use, starts
//! playback with a completion hook and then services three wake sources until the track
//! ends or the menu moves on:
//! - completion of the track
//! - the progress tick
//! - commands forwarded by the menu
//!
//! Whatever the exit path, the pause lock is released and the engine is stopped before the
//! call returns.

use std::io::Write;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded, never, select, tick};

use crate::conduit::{Command, CommandRequest, SessionEnd};
use crate::engine::{AudioEngine, TrackInfo};
use crate::error::{DeckError, Result};
use crate::library::Track;
use crate::status::StatusState;

/// How a session (or a single command inside it) ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// Command handled, keep playing.
    Continue,
    Advance,
    Retreat,
    Quit,
}

impl StepResult {
    /// Signed index step applied by the navigator.
    pub fn offset(self) -> isize {
        match self {
            StepResult::Advance => 1,
            StepResult::Retreat => -1,
            StepResult::Continue | StepResult::Quit => 0,
        }
    }
}

enum Wake {
    Done(bool),
    Tick,
    Command(Option<CommandRequest>),
}

pub struct Player<E: AudioEngine> {
    engine: E,
    status: StatusState,
    conduit: SessionEnd,
    tick: Duration,
    out: Box<dyn Write>,
}

impl<E: AudioEngine> Player<E> {
    pub fn new(engine: E, conduit: SessionEnd, tick: Duration, out: Box<dyn Write>) -> Self {
        Self {
            engine,
            status: StatusState::default(),
            conduit,
            tick,
            out,
        }
    }

    pub fn status(&self) -> &StatusState {
        &self.status
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Hand the menu its first snapshot so it can render.
    pub fn announce(&self) {
        let _ = self.conduit.ready.try_send(self.status.snapshot());
    }

    /// Stop replaying the current track once it ends.
    pub fn clear_loop(&mut self) {
        self.status.looping = false;
    }

    /// Print a line on the terminal, outside any progress line.
    pub fn notice(&mut self, msg: &str) -> Result<()> {
        writeln!(self.out, "{msg}")?;
        self.out.flush()?;
        Ok(())
    }

    /// Play `track` until it completes or a command ends it.
    ///
    /// Returns `Advance` on natural completion or Next, `Retreat` on Prev and `Quit` on
    /// Quit. Open, device and start failures come back as [`DeckError::Playback`].
    pub fn play_track(&mut self, track: &Track) -> Result<StepResult> {
        let started = self.start(track);
        let result = match started {
            Ok((info, done)) => self.run(track, info, done),
            Err(e) => Err(e),
        };
        self.finish(result.is_ok() || matches!(result, Err(DeckError::Io(_))));
        result
    }

    fn start(&mut self, track: &Track) -> Result<(TrackInfo, Receiver<()>)> {
        let playback_err = |cause| DeckError::Playback {
            path: track.path.clone(),
            cause,
        };

        let info = self.engine.open(&track.path).map_err(playback_err)?;

        if !self.status.device_initialized {
            let rate = self
                .engine
                .init_output(info.sample_rate)
                .map_err(playback_err)?;
            self.status.device_initialized = true;
            self.status.output_sample_rate = Some(rate);
            tracing::info!(rate_hz = rate, "output initialized");
        }

        let (done_tx, done_rx) = bounded(1);
        self.status.reset_for_track();
        self.engine
            .start(Box::new(move || {
                let _ = done_tx.try_send(());
            }))
            .map_err(playback_err)?;

        tracing::info!(track = %track.name, duration = ?info.duration, "playing");
        Ok((info, done_rx))
    }

    fn run(
        &mut self,
        track: &Track,
        info: TrackInfo,
        mut done: Receiver<()>,
    ) -> Result<StepResult> {
        let total = info.duration.unwrap_or_default();
        let ticker = tick(self.tick);
        let mut commands = self.conduit.commands.clone();
        let mut printed_paused = false;

        loop {
            let wake = select! {
                recv(done) -> msg => Wake::Done(msg.is_ok()),
                recv(ticker) -> _ => Wake::Tick,
                recv(commands) -> req => Wake::Command(req.ok()),
            };

            match wake {
                Wake::Done(true) if !self.status.interrupted => return Ok(StepResult::Advance),
                Wake::Done(true) => {}
                // Hook dropped unfired: nothing will ever arrive.
                Wake::Done(false) => done = never(),
                Wake::Tick => {
                    if self.status.paused && printed_paused {
                        continue;
                    }
                    let line = format_progress(
                        &track.name,
                        self.engine.position(),
                        total,
                        self.status.paused,
                    );
                    write!(self.out, "{line}")?;
                    self.out.flush()?;
                    printed_paused = self.status.paused;
                }
                Wake::Command(Some(req)) => {
                    if req.command == Command::Pause && !self.status.paused {
                        printed_paused = false;
                    }
                    let step = self.dispatch(req);
                    if step != StepResult::Continue {
                        return Ok(step);
                    }
                }
                Wake::Command(None) => {
                    tracing::debug!("menu gone; playing on");
                    commands = never();
                }
            }
        }
    }

    fn dispatch(&mut self, req: CommandRequest) -> StepResult {
        tracing::debug!(command = ?req.command, "command");
        let step = match req.command {
            Command::Pause => {
                if self.status.paused {
                    self.engine.unlock();
                } else {
                    self.engine.lock();
                }
                self.status.paused = !self.status.paused;
                StepResult::Continue
            }
            Command::Loop => {
                self.status.looping = !self.status.looping;
                StepResult::Continue
            }
            Command::Next | Command::Prev => {
                self.status.clear_for_skip();
                self.release_pause();
                if req.command == Command::Next {
                    StepResult::Advance
                } else {
                    StepResult::Retreat
                }
            }
            Command::Quit => {
                self.release_pause();
                // Dropping the request unanswered tells the menu to stop.
                return StepResult::Quit;
            }
        };
        let _ = req.ack.send(self.status.snapshot());
        step
    }

    fn release_pause(&mut self) {
        if self.status.paused {
            self.engine.unlock();
            self.status.paused = false;
        }
    }

    fn finish(&mut self, end_line: bool) {
        self.release_pause();
        self.engine.stop();
        if end_line {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
    }
}

/// One progress line, `\r`-prefixed so each tick overwrites the last.
pub fn format_progress(name: &str, elapsed: Duration, total: Duration, paused: bool) -> String {
    let total_secs = total.as_secs();
    let mut elapsed_secs = (elapsed.as_millis() as u64).saturating_add(500) / 1000;
    if total_secs > 0 {
        elapsed_secs = elapsed_secs.min(total_secs);
    }
    let state = if paused { "▶️" } else { "⏸️" };
    format!(
        "\r {name} ⏮️   {state}   ⏭️    [{} - {}]",
        clock(elapsed_secs),
        clock(total_secs)
    )
}

fn clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
