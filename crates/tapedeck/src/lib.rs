//! tapedeck: an interactive terminal audio player.
//!
//! A play invocation runs two loops side by side:
//! - the player ([`session::Player`]) on the calling thread, driving one track at a time
//!   for the [`navigator`]
//! - the [`menu::MenuController`] on its own thread, reading choices from the console
//!
//! They meet over the [`conduit`]. Audio goes through the `tapedeck-audio` engine behind
//! the [`engine::AudioEngine`] seam.

pub mod cli;
pub mod conduit;
pub mod config;
pub mod engine;
pub mod error;
pub mod library;
pub mod menu;
pub mod navigator;
pub mod runtime;
pub mod session;
pub mod status;
pub mod store;
