//! MappingTable implementation
//!
//! HashMap snapshot swapped under a parking_lot RwLock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Immutable view of the table at one instant
pub type Snapshot = Arc<HashMap<String, String>>;

/// In-memory lookup table
pub struct MappingTable {
    /// Current table. Readers clone the Arc or read through the guard;
    /// writers replace the Arc wholesale.
    entries: RwLock<Snapshot>,
}

impl MappingTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Look up a key (read lock)
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Check whether a key is present (read lock)
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Install a complete new set of entries (write lock)
    ///
    /// Later pairs win over earlier pairs with the same key. Returns the
    /// number of distinct keys now installed.
    pub fn replace<I>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let fresh: HashMap<String, String> = pairs.into_iter().collect();
        let count = fresh.len();
        let fresh = Arc::new(fresh);

        // Old snapshot is dropped after the guard is released
        let _previous = {
            let mut guard = self.entries.write();
            std::mem::replace(&mut *guard, fresh)
        };

        count
    }

    /// Get the current table as an immutable snapshot
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.entries.read())
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MappingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingTable")
            .field("entries", &self.len())
            .finish()
    }
}
