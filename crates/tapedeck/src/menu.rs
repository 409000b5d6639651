//! Interactive control menu.
//!
//! Runs on its own thread next to the player loop. It renders from the snapshots the player
//! hands back and never looks at player state directly.

use std::io::{BufRead, Write};

use crate::conduit::{Command, CommandRequest, MenuEnd};
use crate::error::Result;
use crate::status::StatusSnapshot;

const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

pub struct MenuController<R, W> {
    conduit: MenuEnd,
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> MenuController<R, W> {
    pub fn new(conduit: MenuEnd, input: R, out: W) -> Self {
        Self {
            conduit,
            input,
            out,
        }
    }

    /// Render, read a choice, forward it, wait for the acknowledgment; repeat.
    ///
    /// Returns when the player side goes away or the input ends.
    pub fn run(&mut self) -> Result<()> {
        let Ok(mut snapshot) = self.conduit.ready.recv() else {
            return Ok(());
        };
        let mut line = String::new();

        loop {
            render_menu(&mut self.out, snapshot)?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                tracing::debug!("menu input closed");
                return Ok(());
            }
            let Ok(choice) = line.trim().parse::<i64>() else {
                continue;
            };

            let (req, ack) = CommandRequest::new(Command::from_choice(choice));
            if self.conduit.commands.send(req).is_err() {
                return Ok(());
            }
            match ack.recv() {
                Ok(next) => snapshot = next,
                Err(_) => return Ok(()),
            }
        }
    }
}

pub fn render_menu<W: Write>(out: &mut W, snapshot: StatusSnapshot) -> std::io::Result<()> {
    let pause = if snapshot.paused {
        "Unpause ▶️"
    } else {
        "Pause ⏸️"
    };
    let looping = if snapshot.looping {
        "Unloop 🔁"
    } else {
        "Loop 🔁"
    };
    write!(
        out,
        "{CLEAR_SCREEN}1.{pause}\n2.{looping}\n3.Next ⏭️\n4.Previous ⏮️\n5.Exit ⏹️\n"
    )?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conduit::{self, SessionEnd};
    use std::io::Cursor;
    use std::thread;

    fn menu(input: &str) -> (SessionEnd, MenuController<Cursor<Vec<u8>>, Vec<u8>>) {
        let (session, menu_end) = conduit::pair();
        let input = Cursor::new(input.as_bytes().to_vec());
        (session, MenuController::new(menu_end, input, Vec::new()))
    }

    fn output(menu: &MenuController<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(menu.out.clone()).unwrap()
    }

    #[test]
    fn render_flips_labels() {
        let mut out = Vec::new();
        render_menu(&mut out, StatusSnapshot::default()).unwrap();
        let plain = String::from_utf8(out).unwrap();
        assert!(plain.starts_with(CLEAR_SCREEN));
        let items = "1.Pause ⏸️\n2.Loop 🔁\n3.Next ⏭️\n4.Previous ⏮️\n5.Exit ⏹️\n";
        assert_eq!(plain, format!("{CLEAR_SCREEN}{items}"));

        let mut out = Vec::new();
        render_menu(
            &mut out,
            StatusSnapshot {
                paused: true,
                looping: true,
            },
        )
        .unwrap();
        let flipped = String::from_utf8(out).unwrap();
        assert!(flipped.contains("1.Unpause ▶️"));
        assert!(flipped.contains("2.Unloop 🔁"));
    }

    #[test]
    fn garbage_input_rerenders_without_forwarding() {
        let (session, mut menu) = menu("abc\n\n");
        session.ready.send(StatusSnapshot::default()).unwrap();
        menu.run().unwrap();

        assert_eq!(output(&menu).matches(CLEAR_SCREEN).count(), 3);
        assert!(session.commands.try_recv().is_err());
    }

    #[test]
    fn acknowledgments_drive_the_next_render() {
        let (session, mut menu) = menu("1\n2\n");
        session.ready.send(StatusSnapshot::default()).unwrap();

        let player = thread::spawn(move || {
            let first = session.commands.recv().unwrap();
            assert_eq!(first.command, Command::Pause);
            first
                .ack
                .send(StatusSnapshot {
                    paused: true,
                    looping: false,
                })
                .unwrap();

            let second = session.commands.recv().unwrap();
            assert_eq!(second.command, Command::Loop);
            second
                .ack
                .send(StatusSnapshot {
                    paused: true,
                    looping: true,
                })
                .unwrap();
            session
        });

        menu.run().unwrap();
        let _session = player.join().unwrap();

        let out = output(&menu);
        assert_eq!(out.matches(CLEAR_SCREEN).count(), 3);
        assert!(out.contains("1.Unpause ▶️\n2.Loop 🔁"));
        assert!(out.contains("1.Unpause ▶️\n2.Unloop 🔁"));
    }

    #[test]
    fn unanswered_request_stops_the_menu() {
        let (session, mut menu) = menu("5\n1\n1\n");
        session.ready.send(StatusSnapshot::default()).unwrap();

        let player = thread::spawn(move || {
            let req = session.commands.recv().unwrap();
            assert_eq!(req.command, Command::Quit);
            drop(req);
            session
        });

        menu.run().unwrap();
        let _session = player.join().unwrap();
        assert_eq!(output(&menu).matches(CLEAR_SCREEN).count(), 1);
    }

    #[test]
    fn closed_conduit_stops_the_menu() {
        let (session, mut menu) = menu("3\n4\n");
        session.ready.send(StatusSnapshot::default()).unwrap();
        drop(session);

        menu.run().unwrap();
        assert_eq!(output(&menu).matches(CLEAR_SCREEN).count(), 1);
    }

    #[test]
    fn no_ready_token_means_no_menu() {
        let (session, mut menu) = menu("1\n");
        drop(session);
        menu.run().unwrap();
        assert!(output(&menu).is_empty());
    }
}
