//! Periodic position refresh while playing.
//!
//! At most one poller thread runs per controller. Its loop condition is
//! checked under the controller lock at every tick, so it exits within one
//! interval after playback stops, and a command that restarts playback in
//! the meantime either finds it still active or spawns a fresh one.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::state::{ControllerState, Shared};

pub(super) struct PositionPoller {
    interval: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PositionPoller {
    pub(super) fn new(interval: Duration) -> Self {
        Self {
            interval,
            thread: Mutex::new(None),
        }
    }

    pub(super) fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the poller unless one is already active.
    ///
    /// Must be called with the controller lock held (`state` is the guarded value).
    pub(super) fn ensure_running(&self, shared: &Arc<Shared>, state: &mut ControllerState) {
        if state.poller_active || !state.is_playing || state.disposed {
            return;
        }

        let worker = Arc::clone(shared);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name("position-poller".to_string())
            .spawn(move || poll_loop(worker, interval));

        match spawned {
            Ok(handle) => {
                state.poller_active = true;
                // A previous poller stored here has already left its loop
                *self.thread.lock() = Some(handle);
            }
            Err(err) => {
                error!(error = %err, "Cannot spawn position poller");
            }
        }
    }

    /// Waits for the poller thread to finish. The caller must have made the
    /// loop condition false beforehand.
    pub(super) fn join(&self) {
        let Some(handle) = self.thread.lock().take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            return;
        }

        if handle.join().is_err() {
            error!("Position poller panicked");
        }
    }
}

fn poll_loop(shared: Arc<Shared>, interval: Duration) {
    debug!(interval_ms = interval.as_millis() as u64, "Position poller started");

    let mut ticks: u64 = 0;
    while shared.poll_tick() {
        ticks = ticks.wrapping_add(1);
        thread::sleep(interval);
    }

    debug!(ticks, "Position poller exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_start_is_a_no_op() {
        let shared = Arc::new(Shared::new());
        let poller = PositionPoller::new(Duration::from_millis(5));

        let mut state = shared.state.lock();
        state.is_playing = true;
        poller.ensure_running(&shared, &mut state);
        let first = poller.thread.lock().as_ref().map(|h| h.thread().id());
        poller.ensure_running(&shared, &mut state);
        let second = poller.thread.lock().as_ref().map(|h| h.thread().id());

        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(state.poller_active);

        state.is_playing = false;
        drop(state);
        poller.join();
        assert!(!shared.state.lock().poller_active);
    }

    #[test]
    fn test_not_started_when_paused() {
        let shared = Arc::new(Shared::new());
        let poller = PositionPoller::new(Duration::from_millis(5));

        let mut state = shared.state.lock();
        poller.ensure_running(&shared, &mut state);
        assert!(!state.poller_active);
        assert!(poller.thread.lock().is_none());
    }
}
