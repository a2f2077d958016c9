//! # accatalog - the fixed audiobook catalog
//!
//! The catalog is an ordered, immutable list of [`AudioItem`] records
//! supplied once at startup. It is either the manifest embedded in the
//! crate or a JSON manifest read from disk:
//!
//! ```json
//! [
//!   {
//!     "title": "Dracula",
//!     "author": "Bram Stoker",
//!     "cover_image_ref": "dracula_cover",
//!     "audio_ref": "dracula_01",
//!     "summary": "An epistolary novel...",
//!     "duration_hint_ms": 500000
//!   }
//! ]
//! ```
//!
//! ```no_run
//! use accatalog::Catalog;
//!
//! let catalog = Catalog::embedded()?;
//! for (index, book) in catalog.iter().enumerate() {
//!     println!("{index}: {book}");
//! }
//! # Ok::<(), accatalog::CatalogError>(())
//! ```

mod catalog;
mod error;
mod item;

pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use item::AudioItem;
