//! Media backends implementing [`MediaBackend`](crate::capabilities::MediaBackend).

mod simulated;

#[cfg(feature = "rodio")]
mod rodio;

pub use simulated::{DEFAULT_SIMULATED_DURATION_MS, SimulatedBackend, SimulatedEvent};

#[cfg(feature = "rodio")]
pub use self::rodio::RodioBackend;
