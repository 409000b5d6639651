//! Rendezvous between the player loop and the menu.
//!
//! The player hands the menu one initial snapshot on `ready`. After that the two sides
//! alternate strictly: the menu sends one [`CommandRequest`] and waits on its reply channel;
//! the player answers each request at most once. Dropping a request unanswered is how the
//! player tells the menu it is gone.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::status::StatusSnapshot;

/// Transport commands the menu can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Pause,
    Loop,
    Next,
    Prev,
    Quit,
}

impl Command {
    /// Map a menu choice to a command. Anything outside 1–4 exits.
    pub fn from_choice(choice: i64) -> Self {
        match choice {
            1 => Command::Pause,
            2 => Command::Loop,
            3 => Command::Next,
            4 => Command::Prev,
            _ => Command::Quit,
        }
    }
}

#[derive(Debug)]
pub struct CommandRequest {
    pub command: Command,
    pub ack: Sender<StatusSnapshot>,
}

impl CommandRequest {
    /// Build a request and the receiver its acknowledgment arrives on.
    pub fn new(command: Command) -> (Self, Receiver<StatusSnapshot>) {
        let (ack, rx) = bounded(1);
        (Self { command, ack }, rx)
    }
}

/// Player side.
pub struct SessionEnd {
    pub ready: Sender<StatusSnapshot>,
    pub commands: Receiver<CommandRequest>,
}

/// Menu side.
pub struct MenuEnd {
    pub ready: Receiver<StatusSnapshot>,
    pub commands: Sender<CommandRequest>,
}

pub fn pair() -> (SessionEnd, MenuEnd) {
    let (ready_tx, ready_rx) = bounded(1);
    let (cmd_tx, cmd_rx) = bounded(0);
    (
        SessionEnd {
            ready: ready_tx,
            commands: cmd_rx,
        },
        MenuEnd {
            ready: ready_rx,
            commands: cmd_tx,
        },
    )
}
