use std::fmt;

use serde::{Deserialize, Serialize};

/// One audiobook of the catalog.
///
/// Items are immutable once the catalog is built. Equality is structural:
/// two records carrying the same fields designate the same book, which is
/// what the playback controller relies on to decide between resuming and
/// reloading.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioItem {
    pub title: String,
    pub author: String,
    /// Opaque reference to the cover artwork (resource name or path).
    pub cover_image_ref: String,
    /// Opaque reference handed to the media backend.
    pub audio_ref: String,
    pub summary: String,
    /// Length of the media, when known ahead of time.
    ///
    /// Only backends that cannot probe the media themselves use it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint_ms: Option<u64>,
}

impl AudioItem {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        cover_image_ref: impl Into<String>,
        audio_ref: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            cover_image_ref: cover_image_ref.into(),
            audio_ref: audio_ref.into(),
            summary: summary.into(),
            duration_hint_ms: None,
        }
    }

    pub fn with_duration_hint(mut self, duration_ms: u64) -> Self {
        self.duration_hint_ms = Some(duration_ms);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.audio_ref.trim().is_empty() {
            return Err(format!("'{}' has an empty audio_ref", self.title));
        }
        Ok(())
    }
}

impl fmt::Display for AudioItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_structural() {
        let a = AudioItem::new("Dracula", "Bram Stoker", "dracula_cover", "dracula_01", "");
        let b = AudioItem::new("Dracula", "Bram Stoker", "dracula_cover", "dracula_01", "");
        assert_eq!(a, b);

        let c = b.clone().with_duration_hint(1000);
        assert_ne!(a, c);
    }

    #[test]
    fn test_validate() {
        let ok = AudioItem::new("Frankenstein", "Mary Shelley", "", "frankenstein_01", "");
        assert!(ok.validate().is_ok());

        let no_title = AudioItem::new("  ", "Mary Shelley", "", "frankenstein_01", "");
        assert!(no_title.validate().is_err());

        let no_audio = AudioItem::new("Frankenstein", "Mary Shelley", "", "", "");
        assert!(no_audio.validate().is_err());
    }
}
