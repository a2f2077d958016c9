//! The playback controller: single source of truth for what is loaded,
//! whether it plays, and where the playhead is.

use std::sync::Arc;
use std::time::Duration;

use accatalog::AudioItem;
use tracing::{debug, info, warn};

use super::poller::PositionPoller;
use super::state::{ControllerState, Shared};
use crate::capabilities::MediaBackend;
use crate::errors::{PlaybackError, Result};
use crate::model::{PlaybackState, PlayerPhase};
use crate::observable::Observable;

/// Interval between two position refreshes while playing.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Shortest accepted poll interval; shorter values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Mediates between UI commands and a [`MediaBackend`].
///
/// Every command, poll tick and completion callback goes through one lock,
/// so the state seen through [`snapshot`](Self::snapshot) or the observables
/// is never torn. Commands issued while nothing is loaded are ignored.
///
/// The controller owns at most one media handle. Dropping it disposes it.
pub struct PlaybackController {
    backend: Arc<dyn MediaBackend>,
    shared: Arc<Shared>,
    poller: PositionPoller,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_poll_interval(backend, DEFAULT_POLL_INTERVAL)
    }

    /// Controller refreshing the position every `poll_interval`, raised to
    /// [`MIN_POLL_INTERVAL`] if shorter.
    pub fn with_poll_interval(backend: Arc<dyn MediaBackend>, poll_interval: Duration) -> Self {
        let poll_interval = if poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = poll_interval.as_millis() as u64,
                min_ms = MIN_POLL_INTERVAL.as_millis() as u64,
                "Poll interval too short, using the minimum"
            );
            MIN_POLL_INTERVAL
        } else {
            poll_interval
        };
        debug!(
            backend = backend.name(),
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Creating playback controller"
        );
        Self {
            backend,
            shared: Arc::new(Shared::new()),
            poller: PositionPoller::new(poll_interval),
        }
    }

    /// Plays `item`.
    ///
    /// If `item` is already loaded, playback resumes on the existing handle.
    /// Otherwise the current handle is released and a new one is acquired.
    ///
    /// # Errors
    /// - [`PlaybackError::LoadFailed`] if the backend cannot load the item;
    ///   the controller is then idle and `last_error` holds the failure.
    /// - [`PlaybackError::Disposed`] after [`dispose`](Self::dispose).
    pub fn play(&self, item: &AudioItem) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.disposed {
            warn!(title = %item.title, "play() called on a disposed controller");
            return Err(PlaybackError::Disposed);
        }

        let same_item = state.current_item.as_ref() == Some(item);
        if same_item {
            if let Some(handle) = state.handle.as_mut() {
                handle.start();
                debug!(title = %item.title, "Resuming loaded item");
                state.is_playing = true;
                self.shared.publish(&state);
                self.poller.ensure_running(&self.shared, &mut state);
                return Ok(());
            }
        }

        if state.release_handle() {
            debug!("Released previous media handle");
        }

        let mut handle = match self.backend.load(&item.audio_ref) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(
                    title = %item.title,
                    audio_ref = %item.audio_ref,
                    backend = self.backend.name(),
                    error = %err,
                    "Cannot load media"
                );
                let failure = PlaybackError::LoadFailed(item.clone());
                state.current_item = None;
                state.is_playing = false;
                state.position_ms = 0;
                state.duration_ms = 0;
                state.last_error = Some(failure.clone());
                self.shared.publish(&state);
                return Err(failure);
            }
        };

        let generation = state.handle_generation;
        let weak = Arc::downgrade(&self.shared);
        handle.set_on_completion(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.on_completion(generation);
            }
        }));

        let duration_ms = handle.duration_ms();
        handle.start();

        info!(
            title = %item.title,
            author = %item.author,
            duration_ms,
            "Playing"
        );

        state.handle = Some(handle);
        state.current_item = Some(item.clone());
        state.is_playing = true;
        state.position_ms = 0;
        state.duration_ms = duration_ms;
        state.last_error = None;
        self.shared.publish(&state);
        self.poller.ensure_running(&self.shared, &mut state);
        Ok(())
    }

    /// Pauses playback. Idempotent; ignored when nothing is loaded.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock();
        let Some(handle) = state.handle.as_mut() else {
            debug!("pause() ignored: no media loaded");
            return;
        };
        handle.pause();
        state.is_playing = false;
        self.shared.publish(&state);
    }

    /// Resumes playback of the loaded item; ignored when nothing is loaded.
    pub fn resume(&self) {
        let mut state = self.shared.state.lock();
        let Some(handle) = state.handle.as_mut() else {
            debug!("resume() ignored: no media loaded");
            return;
        };
        handle.start();
        state.is_playing = true;
        self.shared.publish(&state);
        self.poller.ensure_running(&self.shared, &mut state);
    }

    /// Seeks to `fraction` of the duration.
    ///
    /// `fraction` is clamped into `[0, 1]` (NaN counts as 0). The new position
    /// is published immediately without waiting for the backend.
    pub fn seek_to(&self, fraction: f32) {
        let mut state = self.shared.state.lock();
        let duration_ms = state.duration_ms;
        let Some(handle) = state.handle.as_mut() else {
            debug!("seek_to() ignored: no media loaded");
            return;
        };

        let target = seek_target_ms(fraction, duration_ms);
        handle.seek_to_ms(target);
        debug!(fraction, position_ms = target, "Seek");
        state.position_ms = target;
        self.shared.publish(&state);
    }

    /// Pauses if playing, otherwise plays `item`.
    pub fn toggle(&self, item: &AudioItem) -> Result<()> {
        if self.is_playing().get() {
            self.pause();
            Ok(())
        } else {
            self.play(item)
        }
    }

    /// Pauses if playing, otherwise resumes the loaded item.
    pub fn toggle_current(&self) {
        if self.is_playing().get() {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Audio session identifier of the loaded handle, 0 when nothing is loaded.
    pub fn audio_session_id(&self) -> u32 {
        self.shared
            .state
            .lock()
            .handle
            .as_ref()
            .map(|handle| handle.audio_session_id())
            .unwrap_or(0)
    }

    /// Releases the media handle and stops the poller.
    ///
    /// Safe to call with nothing loaded, and more than once. Every command
    /// after this one is ignored.
    pub fn dispose(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.is_playing = false;
            if state.release_handle() {
                debug!("Released media handle on dispose");
            }
            self.shared.publish(&state);
        }

        // Outside the lock: the poller takes it to notice it has to stop
        self.poller.join();
        info!("Playback controller disposed");
    }

    /// Self-consistent copy of the whole playback state.
    pub fn snapshot(&self) -> PlaybackState {
        self.shared.state.lock().snapshot()
    }

    pub fn phase(&self) -> PlayerPhase {
        phase_of(&self.shared.state.lock())
    }

    /// Playhead as a fraction of the duration, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.snapshot().progress()
    }

    pub fn is_polling(&self) -> bool {
        self.shared.state.lock().poller_active
    }

    pub fn poll_interval(&self) -> Duration {
        self.poller.interval()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn current_item(&self) -> &Observable<Option<AudioItem>> {
        &self.shared.current_item
    }

    pub fn is_playing(&self) -> &Observable<bool> {
        &self.shared.is_playing
    }

    pub fn position_ms(&self) -> &Observable<u64> {
        &self.shared.position_ms
    }

    pub fn duration_ms(&self) -> &Observable<u64> {
        &self.shared.duration_ms
    }

    /// Last load failure, cleared by the next successful `play`.
    pub fn last_error(&self) -> &Observable<Option<PlaybackError>> {
        &self.shared.last_error
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn phase_of(state: &ControllerState) -> PlayerPhase {
    if state.disposed {
        PlayerPhase::Disposed
    } else if state.handle.is_none() {
        PlayerPhase::Idle
    } else if state.is_playing {
        PlayerPhase::Playing
    } else {
        PlayerPhase::Paused
    }
}

fn seek_target_ms(fraction: f32, duration_ms: u64) -> u64 {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        f64::from(fraction).clamp(0.0, 1.0)
    };
    (fraction * duration_ms as f64).round() as u64
}
