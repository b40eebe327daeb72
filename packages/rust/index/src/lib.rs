//! Existing item index.
//!
//! Items that are already known are never re-scraped. The pipeline only sees
//! the [`ItemLookup`] capability, so any backing store can stand in: an
//! in-memory map for tests, or the category files of a previous run.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use itemsync_shared::{Category, ItemId, ItemRecord, ItemSyncError, Result};

/// Look up an already-resolved item by id.
pub trait ItemLookup: Send + Sync {
    /// Return the stored record for `id`, or `None` if the item is unknown.
    fn get_item(&self, id: ItemId) -> Option<ItemRecord>;
}

impl<T: ItemLookup + ?Sized> ItemLookup for &T {
    fn get_item(&self, id: ItemId) -> Option<ItemRecord> {
        (**self).get_item(id)
    }
}

// ---------------------------------------------------------------------------
// MemoryIndex
// ---------------------------------------------------------------------------

/// `HashMap`-backed index. `MemoryIndex::default()` knows no items.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    items: HashMap<ItemId, ItemRecord>,
}

impl MemoryIndex {
    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a record, replacing any earlier record with the same id.
    pub fn insert(&mut self, record: ItemRecord) {
        self.items.insert(record.id, record);
    }
}

impl FromIterator<ItemRecord> for MemoryIndex {
    fn from_iter<I: IntoIterator<Item = ItemRecord>>(iter: I) -> Self {
        let mut index = Self::default();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

impl ItemLookup for MemoryIndex {
    fn get_item(&self, id: ItemId) -> Option<ItemRecord> {
        self.items.get(&id).cloned()
    }
}

// ---------------------------------------------------------------------------
// YamlIndex
// ---------------------------------------------------------------------------

/// Index loaded from a directory of `<category>s.yml` files.
#[derive(Debug, Clone, Default)]
pub struct YamlIndex {
    inner: MemoryIndex,
}

impl YamlIndex {
    /// Load every category file present in `dir`.
    ///
    /// Missing files are skipped. A file that exists but is not a YAML list
    /// of item records is an error.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self> {
        let mut inner = MemoryIndex::default();

        for category in Category::ALL {
            let path = dir.join(category.file_name());
            if !path.exists() {
                debug!(path = %path.display(), "no index file for category");
                continue;
            }

            let records = read_records(&path)?;
            debug!(%category, count = records.len(), "loaded index file");
            for record in records {
                inner.insert(record);
            }
        }

        info!(items = inner.len(), "existing item index loaded");
        Ok(Self { inner })
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ItemLookup for YamlIndex {
    fn get_item(&self, id: ItemId) -> Option<ItemRecord> {
        self.inner.get_item(id)
    }
}

/// Parse the content of one category file.
pub fn parse_records(content: &str) -> Result<Vec<ItemRecord>> {
    // An empty file deserializes as YAML null, not an empty list
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_yaml::from_str(content).map_err(|e| ItemSyncError::Index(e.to_string()))
}

fn read_records(path: &Path) -> Result<Vec<ItemRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| ItemSyncError::io(path, e))?;

    parse_records(&content).map_err(|e| match e {
        ItemSyncError::Index(msg) => ItemSyncError::Index(format!("{}: {msg}", path.display())),
        other => other,
    })
}
