//! Audiobook playback control over a platform media primitive.
//!
//! [`PlaybackController`] owns at most one [`MediaHandle`] obtained from a
//! [`MediaBackend`], publishes its state through [`Observable`] values and
//! refreshes the position from a poller thread while playing.
//!
//! ```
//! use std::sync::Arc;
//! use acplayer::{PlaybackController, SimulatedBackend};
//! use accatalog::Catalog;
//!
//! let catalog = Catalog::embedded().unwrap();
//! let backend = SimulatedBackend::manual().with_catalog(&catalog);
//! let controller = PlaybackController::new(Arc::new(backend));
//!
//! let book = catalog.get(0).unwrap();
//! controller.play(book).unwrap();
//! controller.seek_to(0.5);
//! controller.pause();
//! assert_eq!(controller.position_ms().get(), controller.duration_ms().get() / 2);
//! controller.dispose();
//! ```

pub mod backend;
pub mod capabilities;
pub mod errors;
pub mod model;
pub mod observable;
mod player;

pub use player::time_utils;

pub use backend::{DEFAULT_SIMULATED_DURATION_MS, SimulatedBackend, SimulatedEvent};
#[cfg(feature = "rodio")]
pub use backend::RodioBackend;
pub use capabilities::{CompletionCallback, MediaBackend, MediaHandle};
pub use errors::{PlaybackError, Result};
pub use model::{PlaybackState, PlayerPhase};
pub use observable::Observable;
pub use player::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL, PlaybackController};
