//! A media backend that plays nothing but keeps time.
//!
//! Each handle tracks its playhead against a clock. With the system clock,
//! end of media is detected by a timer thread per playing run; with the
//! manual clock (tests), time only moves on [`SimulatedBackend::advance`],
//! which also fires due completions on the calling thread.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use accatalog::Catalog;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::capabilities::{CompletionCallback, MediaBackend, MediaHandle};
use crate::errors::PlaybackError;

/// Length given to catalog items that carry no duration hint.
pub const DEFAULT_SIMULATED_DURATION_MS: u64 = 300_000;

/// Something that happened to a simulated handle, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulatedEvent {
    Loaded { audio_ref: String, session_id: u32 },
    Released { audio_ref: String, session_id: u32 },
}

#[derive(Clone)]
enum Clock {
    System(Instant),
    Manual(Arc<Mutex<Duration>>),
}

impl Clock {
    fn now(&self) -> Duration {
        match self {
            Clock::System(origin) => origin.elapsed(),
            Clock::Manual(now) => *now.lock(),
        }
    }

    fn is_manual(&self) -> bool {
        matches!(self, Clock::Manual(_))
    }
}

#[derive(Default)]
struct BackendInner {
    durations: HashMap<String, u64>,
    fail_next_load: bool,
    next_session_id: u32,
    loads: usize,
    releases: usize,
    history: Vec<SimulatedEvent>,
    handles: Vec<Weak<Mutex<HandleState>>>,
}

/// Simulated platform media primitive.
///
/// `audio_ref`s must be registered with a duration before they can be
/// loaded; anything else fails like a missing resource would.
#[derive(Clone)]
pub struct SimulatedBackend {
    clock: Clock,
    inner: Arc<Mutex<BackendInner>>,
}

impl SimulatedBackend {
    /// Backend driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::System(Instant::now()))
    }

    /// Backend whose time only moves through [`advance`](Self::advance).
    pub fn manual() -> Self {
        Self::with_clock(Clock::Manual(Arc::new(Mutex::new(Duration::ZERO))))
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            inner: Arc::new(Mutex::new(BackendInner {
                next_session_id: 1,
                ..BackendInner::default()
            })),
        }
    }

    /// Registers every catalog item, using its duration hint when present.
    pub fn with_catalog(self, catalog: &Catalog) -> Self {
        for item in catalog {
            self.register(
                &item.audio_ref,
                item.duration_hint_ms.unwrap_or(DEFAULT_SIMULATED_DURATION_MS),
            );
        }
        self
    }

    pub fn register(&self, audio_ref: &str, duration_ms: u64) {
        self.inner
            .lock()
            .durations
            .insert(audio_ref.to_string(), duration_ms);
    }

    /// Makes the next `load` fail whatever its reference.
    pub fn fail_next_load(&self) {
        self.inner.lock().fail_next_load = true;
    }

    /// Number of handles successfully acquired.
    pub fn loads(&self) -> usize {
        self.inner.lock().loads
    }

    /// Number of handles released.
    pub fn releases(&self) -> usize {
        self.inner.lock().releases
    }

    /// Handles acquired and not released yet.
    pub fn live_handles(&self) -> usize {
        let inner = self.inner.lock();
        inner.loads - inner.releases
    }

    pub fn history(&self) -> Vec<SimulatedEvent> {
        self.inner.lock().history.clone()
    }

    /// Moves the manual clock forward and fires the completion callback of
    /// every handle that reached the end of its media.
    ///
    /// Ignored (with a warning) on a wall-clock backend.
    pub fn advance(&self, by: Duration) {
        let Clock::Manual(now) = &self.clock else {
            warn!("advance() ignored: backend runs on the system clock");
            return;
        };
        *now.lock() += by;
        let now = self.clock.now();

        let handles: Vec<Arc<Mutex<HandleState>>> = {
            let mut inner = self.inner.lock();
            inner.handles.retain(|handle| handle.strong_count() > 0);
            inner.handles.iter().filter_map(Weak::upgrade).collect()
        };

        let mut due = Vec::new();
        for handle in handles {
            let mut state = handle.lock();
            if state.playing && state.position_at(now) >= state.duration_ms {
                state.finish();
                if let Some(callback) = state.on_completion.clone() {
                    due.push(callback);
                }
            }
        }

        // No lock held here: callbacks re-enter the controller
        for callback in due {
            callback();
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for SimulatedBackend {
    fn load(&self, audio_ref: &str) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let mut inner = self.inner.lock();

        if std::mem::take(&mut inner.fail_next_load) {
            return Err(PlaybackError::backend(format!(
                "simulated load failure for '{}'",
                audio_ref
            )));
        }

        let Some(&duration_ms) = inner.durations.get(audio_ref) else {
            return Err(PlaybackError::backend(format!(
                "unknown media reference '{}'",
                audio_ref
            )));
        };

        let session_id = inner.next_session_id;
        inner.next_session_id = inner.next_session_id.wrapping_add(1).max(1);
        inner.loads += 1;
        inner.history.push(SimulatedEvent::Loaded {
            audio_ref: audio_ref.to_string(),
            session_id,
        });

        let state = Arc::new(Mutex::new(HandleState {
            duration_ms,
            base_position_ms: 0,
            started_at: None,
            playing: false,
            finished: false,
            released: false,
            run: 0,
            cancel_timer: None,
            on_completion: None,
        }));
        inner.handles.push(Arc::downgrade(&state));

        debug!(audio_ref, session_id, duration_ms, "Simulated media loaded");

        Ok(Box::new(SimulatedHandle {
            audio_ref: audio_ref.to_string(),
            session_id,
            clock: self.clock.clone(),
            state,
            backend: Arc::clone(&self.inner),
        }))
    }

    fn name(&self) -> &str {
        if self.clock.is_manual() {
            "simulated (manual clock)"
        } else {
            "simulated"
        }
    }
}

struct HandleState {
    duration_ms: u64,
    /// Playhead when the current run started (or when paused).
    base_position_ms: u64,
    started_at: Option<Duration>,
    playing: bool,
    finished: bool,
    released: bool,
    /// Bumped on every start/seek/pause so stale end-of-media timers do nothing.
    run: u64,
    /// Dropping the sender wakes the timer thread up and makes it exit.
    cancel_timer: Option<Sender<()>>,
    on_completion: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl HandleState {
    fn position_at(&self, now: Duration) -> u64 {
        match (self.playing, self.started_at) {
            (true, Some(started_at)) => {
                let elapsed = now.saturating_sub(started_at).as_millis() as u64;
                self.base_position_ms
                    .saturating_add(elapsed)
                    .min(self.duration_ms)
            }
            _ => self.base_position_ms,
        }
    }

    fn finish(&mut self) {
        self.playing = false;
        self.finished = true;
        self.base_position_ms = self.duration_ms;
        self.started_at = None;
        self.run = self.run.wrapping_add(1);
        self.cancel_timer = None;
    }
}

struct SimulatedHandle {
    audio_ref: String,
    session_id: u32,
    clock: Clock,
    state: Arc<Mutex<HandleState>>,
    backend: Arc<Mutex<BackendInner>>,
}

impl SimulatedHandle {
    /// Arms the end-of-media timer for the current run (system clock only).
    fn arm_timer(&self, state: &mut HandleState) {
        if self.clock.is_manual() {
            return;
        }

        let remaining = state
            .duration_ms
            .saturating_sub(state.position_at(self.clock.now()));
        let run = state.run;
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        state.cancel_timer = Some(cancel_tx);

        let weak = Arc::downgrade(&self.state);
        let spawned = thread::Builder::new()
            .name("sim-end-of-media".to_string())
            .spawn(move || {
                match cancel_rx.recv_timeout(Duration::from_millis(remaining)) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => return,
                }

                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let callback = {
                    let mut state = shared.lock();
                    if state.released || !state.playing || state.run != run {
                        return;
                    }
                    state.finish();
                    state.on_completion.clone()
                };
                if let Some(callback) = callback {
                    callback();
                }
            });

        if let Err(err) = spawned {
            error!(error = %err, "Cannot spawn simulated end-of-media timer");
        }
    }
}

impl MediaHandle for SimulatedHandle {
    fn start(&mut self) {
        let mut state = self.state.lock();
        if state.released || state.playing {
            return;
        }
        if state.finished || state.base_position_ms >= state.duration_ms {
            state.base_position_ms = 0;
            state.finished = false;
        }
        state.playing = true;
        state.started_at = Some(self.clock.now());
        state.run = state.run.wrapping_add(1);
        trace!(session_id = self.session_id, position_ms = state.base_position_ms, "start");
        self.arm_timer(&mut state);
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        if !state.playing {
            return;
        }
        state.base_position_ms = state.position_at(self.clock.now());
        state.playing = false;
        state.started_at = None;
        state.run = state.run.wrapping_add(1);
        state.cancel_timer = None;
        trace!(session_id = self.session_id, position_ms = state.base_position_ms, "pause");
    }

    fn seek_to_ms(&mut self, position_ms: u64) {
        let mut state = self.state.lock();
        if state.released {
            return;
        }
        state.base_position_ms = position_ms.min(state.duration_ms);
        state.finished = false;
        if state.playing {
            state.started_at = Some(self.clock.now());
            state.run = state.run.wrapping_add(1);
            self.arm_timer(&mut state);
        }
    }

    fn current_position_ms(&self) -> u64 {
        self.state.lock().position_at(self.clock.now())
    }

    fn duration_ms(&self) -> u64 {
        self.state.lock().duration_ms
    }

    fn audio_session_id(&self) -> u32 {
        self.session_id
    }

    fn release(&mut self) {
        {
            let mut state = self.state.lock();
            if state.released {
                return;
            }
            state.released = true;
            state.playing = false;
            state.started_at = None;
            state.cancel_timer = None;
            state.on_completion = None;
        }

        let mut backend = self.backend.lock();
        backend.releases += 1;
        backend.history.push(SimulatedEvent::Released {
            audio_ref: self.audio_ref.clone(),
            session_id: self.session_id,
        });
        debug!(audio_ref = %self.audio_ref, session_id = self.session_id, "Simulated media released");
    }

    fn set_on_completion(&mut self, callback: CompletionCallback) {
        self.state.lock().on_completion = Some(Arc::from(callback));
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.release();
    }
}
