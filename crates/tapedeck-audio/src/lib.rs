//! Audio engine for `tapedeck`.
//!
//! Decodes local files with Symphonia, resamples them with Rubato to the rate the output
//! device was opened at, and plays them through a single process-wide CPAL stream
//! ([`speaker::Speaker`]).

pub mod config;
pub mod decode;
pub mod device;
pub mod playback;
pub mod queue;
pub mod resample;
pub mod speaker;
