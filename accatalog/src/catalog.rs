use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::item::AudioItem;

/// Manifest compiled into the binary, used when no external manifest is configured.
const EMBEDDED_MANIFEST: &str = include_str!("catalog.json");

/// Immutable, ordered list of audiobooks.
///
/// The order of the manifest is preserved; screens address books by their
/// index in this list. Cloning is cheap, all clones share the same items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    items: Arc<[AudioItem]>,
}

impl Catalog {
    /// Builds a catalog from already constructed items.
    ///
    /// # Errors
    /// Fails if `items` is empty or if an item has no title or no audio reference.
    pub fn new(items: Vec<AudioItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (index, item) in items.iter().enumerate() {
            item.validate()
                .map_err(|reason| CatalogError::InvalidItem { index, reason })?;
        }

        Ok(Self {
            items: items.into(),
        })
    }

    /// Parses a JSON manifest (an array of audiobook records).
    pub fn from_json_str(manifest: &str) -> Result<Self> {
        let items: Vec<AudioItem> = serde_json::from_str(manifest)?;
        Self::new(items)
    }

    /// Reads and parses a JSON manifest from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manifest = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&manifest)?;
        info!(manifest = %path.display(), books = catalog.len(), "Loaded catalog manifest");
        Ok(catalog)
    }

    /// The catalog shipped with the application.
    pub fn embedded() -> Result<Self> {
        let catalog = Self::from_json_str(EMBEDDED_MANIFEST)?;
        debug!(books = catalog.len(), "Using embedded catalog");
        Ok(catalog)
    }

    /// Loads `path` when given, the embedded catalog otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::embedded(),
        }
    }

    pub fn get(&self, index: usize) -> Result<&AudioItem> {
        self.items.get(index).ok_or(CatalogError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Index of `item` in the catalog, if it belongs to it.
    pub fn index_of(&self, item: &AudioItem) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[AudioItem] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a AudioItem;
    type IntoIter = std::slice::Iter<'a, AudioItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_catalog() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.get(0).unwrap().title,
            "The Adventures of Sherlock Holmes"
        );
        assert_eq!(catalog.get(4).unwrap().author, "Bram Stoker");
        assert!(catalog.iter().all(|item| item.duration_hint_ms.is_some()));
    }

    #[test]
    fn test_get_out_of_range() {
        let catalog = Catalog::embedded().unwrap();
        match catalog.get(5) {
            Err(CatalogError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 5);
                assert_eq!(len, 5);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_index_of() {
        let catalog = Catalog::embedded().unwrap();
        let dracula = catalog.get(4).unwrap().clone();
        assert_eq!(catalog.index_of(&dracula), Some(4));

        let stranger = AudioItem::new("Emma", "Jane Austen", "", "emma_01", "");
        assert_eq!(catalog.index_of(&stranger), None);
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(Catalog::new(Vec::new()), Err(CatalogError::Empty)));
        assert!(matches!(
            Catalog::from_json_str("[]"),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn test_invalid_item_reports_index() {
        let items = vec![
            AudioItem::new("Dracula", "Bram Stoker", "", "dracula_01", ""),
            AudioItem::new("Frankenstein", "Mary Shelley", "", "", ""),
        ];
        match Catalog::new(items) {
            Err(CatalogError::InvalidItem { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
