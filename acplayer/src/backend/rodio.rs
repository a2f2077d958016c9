//! Real audio output through rodio.
//!
//! `audio_ref` is resolved as a file path under the backend's media
//! directory. The output stream lives on its own `audio-output` thread
//! (rodio's `OutputStream` is not `Send`); handles only hold the
//! `OutputStreamHandle` and one `Sink` each.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, error, info, warn};

use crate::capabilities::{CompletionCallback, MediaBackend, MediaHandle};
use crate::errors::PlaybackError;

pub struct RodioBackend {
    media_dir: PathBuf,
    stream: OutputStreamHandle,
    // Keeps the audio-output thread (and the device) alive
    _keep_alive: Sender<()>,
}

impl RodioBackend {
    /// Opens the default output device.
    pub fn new(media_dir: impl Into<PathBuf>) -> Result<Self, PlaybackError> {
        let media_dir = media_dir.into();
        let (handle_tx, handle_rx) = bounded::<Result<OutputStreamHandle, String>>(1);
        let (keep_alive_tx, keep_alive_rx) = bounded::<()>(0);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    if handle_tx.send(Ok(handle)).is_err() {
                        return;
                    }
                    // Returns once the backend is dropped
                    let _ = keep_alive_rx.recv();
                    debug!("Audio output closed");
                }
                Err(err) => {
                    let _ = handle_tx.send(Err(err.to_string()));
                }
            })
            .map_err(|err| PlaybackError::backend(format!("cannot spawn audio thread: {}", err)))?;

        let stream = handle_rx
            .recv()
            .map_err(|_| PlaybackError::backend("audio thread exited early"))?
            .map_err(|err| PlaybackError::backend(format!("cannot open audio output: {}", err)))?;

        info!(media_dir = %media_dir.display(), "Rodio audio output ready");

        Ok(Self {
            media_dir,
            stream,
            _keep_alive: keep_alive_tx,
        })
    }
}

impl MediaBackend for RodioBackend {
    fn load(&self, audio_ref: &str) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let path = self.media_dir.join(audio_ref);
        let source = decode(&path)?;
        let duration_ms = source
            .total_duration()
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let sink = Sink::try_new(&self.stream)
            .map_err(|err| PlaybackError::backend(format!("cannot create sink: {}", err)))?;
        sink.pause();
        sink.append(source);

        debug!(path = %path.display(), duration_ms, "Rodio media loaded");

        Ok(Box::new(RodioHandle {
            path,
            duration_ms,
            sink: Arc::new(sink),
            run: Arc::new(AtomicU64::new(0)),
            released: Arc::new(AtomicBool::new(false)),
            on_completion: Arc::new(Mutex::new(None)),
            monitor: None,
        }))
    }

    fn name(&self) -> &str {
        "rodio"
    }
}

fn decode(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path).map_err(|err| {
        PlaybackError::backend(format!("cannot open {}: {}", path.display(), err))
    })?;
    Decoder::new(BufReader::new(file)).map_err(|err| {
        PlaybackError::backend(format!("cannot decode {}: {}", path.display(), err))
    })
}

type SharedCallback = Arc<Mutex<Option<Arc<dyn Fn() + Send + Sync>>>>;

struct RodioHandle {
    path: PathBuf,
    duration_ms: u64,
    sink: Arc<Sink>,
    /// Bumped on every start; a wait armed on an older run never completes.
    run: Arc<AtomicU64>,
    released: Arc<AtomicBool>,
    on_completion: SharedCallback,
    /// Wakes the monitor thread; dropping it ends the thread.
    monitor: Option<Sender<()>>,
}

impl RodioHandle {
    /// Tells the monitor a new run started, spawning it on first use.
    fn arm_monitor(&mut self) {
        if self.monitor.is_none() {
            let (arm_tx, arm_rx) = bounded::<()>(1);
            let sink = Arc::clone(&self.sink);
            let run = Arc::clone(&self.run);
            let released = Arc::clone(&self.released);
            let on_completion = Arc::clone(&self.on_completion);

            let spawned = thread::Builder::new()
                .name("rodio-monitor".to_string())
                .spawn(move || {
                    monitor_loop(arm_rx, &run, &released, || sink.sleep_until_end(), || {
                        let callback = on_completion.lock().clone();
                        if let Some(callback) = callback {
                            callback();
                        }
                    })
                });

            match spawned {
                Ok(_) => self.monitor = Some(arm_tx),
                Err(err) => {
                    error!(error = %err, "Cannot spawn rodio monitor");
                    return;
                }
            }
        }

        if let Some(monitor) = &self.monitor {
            // A pending wake-up already covers this run
            if let Err(TrySendError::Disconnected(_)) = monitor.try_send(()) {
                self.monitor = None;
            }
        }
    }
}

/// Body of the monitor thread.
///
/// Each wake-up on `arm` waits for the end of media once. The end is
/// reported only if no newer run started meanwhile and the handle is still
/// live; otherwise the pending wake-up of the newer run re-arms the wait.
fn monitor_loop(
    arm: Receiver<()>,
    run: &AtomicU64,
    released: &AtomicBool,
    wait_until_end: impl Fn(),
    on_end: impl Fn(),
) {
    while arm.recv().is_ok() {
        let armed = run.load(Ordering::SeqCst);
        wait_until_end();
        if released.load(Ordering::SeqCst) {
            break;
        }
        if run.load(Ordering::SeqCst) == armed {
            on_end();
        }
    }
    debug!("Rodio monitor exiting");
}

impl MediaHandle for RodioHandle {
    fn start(&mut self) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        if self.sink.empty() {
            // Played to the end already: queue the file again from the start
            match decode(&self.path) {
                Ok(source) => self.sink.append(source),
                Err(err) => {
                    warn!(error = %err, "Cannot restart media");
                    return;
                }
            }
        }
        self.sink.play();
        self.run.fetch_add(1, Ordering::SeqCst);
        self.arm_monitor();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek_to_ms(&mut self, position_ms: u64) {
        if let Err(err) = self.sink.try_seek(Duration::from_millis(position_ms)) {
            warn!(position_ms, error = %err, "Seek failed");
        }
    }

    fn current_position_ms(&self) -> u64 {
        self.sink.get_pos().as_millis() as u64
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    fn audio_session_id(&self) -> u32 {
        0
    }

    fn release(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.on_completion.lock() = None;
        self.monitor = None;
        self.sink.stop();
        debug!(path = %self.path.display(), "Rodio media released");
    }

    fn set_on_completion(&mut self, callback: CompletionCallback) {
        *self.on_completion.lock() = Some(Arc::from(callback));
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn test_one_report_per_end_of_media() {
        let (arm_tx, arm_rx) = bounded::<()>(1);
        let (waiting_tx, waiting_rx) = unbounded::<()>();
        let (end_tx, end_rx) = bounded::<()>(0);
        let run = Arc::new(AtomicU64::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let ends = Arc::new(AtomicUsize::new(0));

        let monitor = {
            let (run, released, ends) = (run.clone(), released.clone(), ends.clone());
            thread::spawn(move || {
                monitor_loop(
                    arm_rx,
                    &run,
                    &released,
                    || {
                        let _ = waiting_tx.send(());
                        let _ = end_rx.recv();
                    },
                    || {
                        ends.fetch_add(1, Ordering::SeqCst);
                    },
                )
            })
        };

        run.fetch_add(1, Ordering::SeqCst);
        arm_tx.send(()).unwrap();
        waiting_rx.recv().unwrap();

        // Pause/resume cycles while the first wait is pending
        for _ in 0..4 {
            run.fetch_add(1, Ordering::SeqCst);
            let _ = arm_tx.try_send(());
        }

        // The stale wait ends without a report, the re-armed one reports
        end_tx.send(()).unwrap();
        waiting_rx.recv().unwrap();
        end_tx.send(()).unwrap();

        drop(arm_tx);
        monitor.join().unwrap();
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_stops_the_monitor_silently() {
        let (arm_tx, arm_rx) = bounded::<()>(1);
        let run = AtomicU64::new(1);
        let released = AtomicBool::new(false);
        let ends = AtomicUsize::new(0);

        arm_tx.send(()).unwrap();
        monitor_loop(
            arm_rx,
            &run,
            &released,
            || released.store(true, Ordering::SeqCst),
            || {
                ends.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(ends.load(Ordering::SeqCst), 0);
    }
}
