use accatalog::AudioItem;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The backend could not produce a handle for this item. Retrying `play` is allowed.
    #[error("Cannot load '{}' ({})", .0.title, .0.audio_ref)]
    LoadFailed(AudioItem),
    #[error("Media backend error: {0}")]
    Backend(String),
    #[error("The playback controller has been disposed")]
    Disposed,
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
}

impl PlaybackError {
    pub fn backend(message: impl Into<String>) -> Self {
        PlaybackError::Backend(message.into())
    }

    /// True for failures the user can recover from by retrying the command.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlaybackError::LoadFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
