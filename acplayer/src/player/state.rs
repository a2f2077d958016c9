//! State shared between the controller, its poller thread and the
//! completion callbacks of the media handles.

use accatalog::AudioItem;
use parking_lot::Mutex;
use tracing::debug;

use crate::capabilities::MediaHandle;
use crate::errors::PlaybackError;
use crate::model::PlaybackState;
use crate::observable::Observable;

/// Mutable controller state. Only ever touched with the [`Shared::state`] lock held.
pub(super) struct ControllerState {
    pub(super) handle: Option<Box<dyn MediaHandle>>,
    pub(super) current_item: Option<AudioItem>,
    pub(super) is_playing: bool,
    pub(super) position_ms: u64,
    pub(super) duration_ms: u64,
    pub(super) last_error: Option<PlaybackError>,
    /// A poller thread is running (or about to run) its loop.
    pub(super) poller_active: bool,
    pub(super) disposed: bool,
    /// Bumped whenever the handle is replaced or released, so that a late
    /// completion from an old handle is recognised and dropped.
    pub(super) handle_generation: u64,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            handle: None,
            current_item: None,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            last_error: None,
            poller_active: false,
            disposed: false,
            handle_generation: 0,
        }
    }

    pub(super) fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            current_item: self.current_item.clone(),
            is_playing: self.is_playing,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            last_error: self.last_error.clone(),
        }
    }

    /// Releases the current handle, if any, and invalidates its callbacks.
    pub(super) fn release_handle(&mut self) -> bool {
        self.handle_generation = self.handle_generation.wrapping_add(1);
        match self.handle.take() {
            Some(mut handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }
}

pub(super) struct Shared {
    pub(super) state: Mutex<ControllerState>,
    pub(super) current_item: Observable<Option<AudioItem>>,
    pub(super) is_playing: Observable<bool>,
    pub(super) position_ms: Observable<u64>,
    pub(super) duration_ms: Observable<u64>,
    pub(super) last_error: Observable<Option<PlaybackError>>,
}

impl Shared {
    pub(super) fn new() -> Self {
        Self {
            state: Mutex::new(ControllerState::new()),
            current_item: Observable::new(None),
            is_playing: Observable::new(false),
            position_ms: Observable::new(0),
            duration_ms: Observable::new(0),
            last_error: Observable::new(None),
        }
    }

    /// Pushes `state` to the observables. Called with the state lock held so
    /// subscribers see changes in mutation order.
    pub(super) fn publish(&self, state: &ControllerState) {
        self.current_item.set(state.current_item.clone());
        self.is_playing.set(state.is_playing);
        self.position_ms.set(state.position_ms);
        self.duration_ms.set(state.duration_ms);
        self.last_error.set(state.last_error.clone());
    }

    /// End-of-media notification coming from the handle of `generation`.
    pub(super) fn on_completion(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.handle_generation != generation || state.handle.is_none() {
            debug!(generation, "Ignoring completion from a released media handle");
            return;
        }

        debug!(
            title = state.current_item.as_ref().map(|item| item.title.as_str()),
            "Playback reached end of media"
        );
        state.is_playing = false;
        state.position_ms = 0;
        self.publish(&state);
    }

    /// One poller iteration: refreshes the position while playing.
    ///
    /// Returns false, and marks the poller inactive, once playback stopped.
    pub(super) fn poll_tick(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_playing || state.disposed {
            state.poller_active = false;
            return false;
        }

        let position = state.handle.as_ref().map(|handle| handle.current_position_ms());
        if let Some(position) = position {
            state.position_ms = position;
            self.publish(&state);
        }
        true
    }
}
