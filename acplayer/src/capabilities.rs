// acplayer/src/capabilities.rs
//! Contract between the playback controller and the platform media primitive.
//!
//! The controller never decodes anything itself: a [`MediaBackend`] turns an
//! opaque audio reference into a [`MediaHandle`], and the handle does the
//! actual playing. Backends are interchangeable (simulated clock, rodio, or
//! any platform player a host application wraps).

use crate::errors::PlaybackError;

/// Callback invoked by a handle when playback reaches the end of the media.
pub type CompletionCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Factory for media handles.
pub trait MediaBackend: Send + Sync {
    /// Acquires a new handle bound to `audio_ref`. The media is loaded but not started.
    fn load(&self, audio_ref: &str) -> Result<Box<dyn MediaHandle>, PlaybackError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// One loaded media resource.
///
/// All methods are synchronous and expected to return quickly. A handle
/// must never call its completion callback from inside one of these
/// methods: the callback re-enters the controller.
pub trait MediaHandle: Send {
    /// Starts or resumes playback.
    fn start(&mut self);

    /// Pauses playback; no-op when already paused.
    fn pause(&mut self);

    /// Moves the playhead to `position_ms`.
    fn seek_to_ms(&mut self, position_ms: u64);

    /// Current playhead position in milliseconds.
    fn current_position_ms(&self) -> u64;

    /// Total media length in milliseconds, 0 when unknown.
    fn duration_ms(&self) -> u64;

    /// Opaque audio session identifier for external effect integration, 0 if none.
    fn audio_session_id(&self) -> u32;

    /// Frees the underlying resource. The handle is unusable afterwards.
    fn release(&mut self);

    /// Registers the end-of-media callback, replacing any previous one.
    fn set_on_completion(&mut self, callback: CompletionCallback);
}
