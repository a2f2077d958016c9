use accatalog::AudioItem;

use crate::errors::PlaybackError;

/// Coarse controller state derived from the playback fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerPhase {
    /// Nothing loaded.
    Idle,
    Paused,
    Playing,
    /// `dispose()` was called; every command is ignored from now on.
    Disposed,
}

/// Consistent copy of everything the controller publishes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackState {
    pub current_item: Option<AudioItem>,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    /// Last load failure, cleared by the next successful load.
    pub last_error: Option<PlaybackError>,
}

impl PlaybackState {
    /// Playhead as a fraction of the duration, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0) as f32
    }
}
