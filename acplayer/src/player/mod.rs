//! Playback controller and its position poller.

mod playback_controller;
mod poller;
mod state;
pub mod time_utils;

pub use playback_controller::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, PlaybackController};
