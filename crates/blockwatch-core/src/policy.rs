//! Blocklist ownership and the policy update protocol.
//!
//! The current list is an immutable snapshot behind an `RwLock`. Readers
//! clone the `Arc` or read under a short read lock; writers build a whole
//! new list and swap it in, so nobody can observe a half-applied update.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use blockwatch_storage::Database;

use crate::error::BlockError;

/// Display name used when the host sends an entry without one
pub const FALLBACK_DISPLAY_NAME: &str = "this application";

/// Blocked app identifier -> display name
pub type BlockList = BTreeMap<String, String>;

/// Read side of the blocklist, as seen by the decision engine
pub trait BlockPolicy: Send + Sync {
    /// Current display name for a blocked app, `None` when it is not blocked
    ///
    /// # Errors
    ///
    /// Returns `BlockError::LookupFault` if the policy state cannot be read
    fn lookup(&self, app_id: &str) -> Result<Option<String>, BlockError>;
}

/// Durable backing for the blocklist
///
/// Must apply `save` as an all-or-nothing replacement.
pub trait PolicyPersistence: Send + Sync {
    /// Load the last saved list
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read
    fn load(&self) -> anyhow::Result<BlockList>;

    /// Replace the saved list
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the old list must stay intact
    fn save(&self, list: &BlockList) -> anyhow::Result<()>;

    /// Drop the saved list
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails
    fn clear(&self) -> anyhow::Result<()>;
}

impl PolicyPersistence for Database {
    fn load(&self) -> anyhow::Result<BlockList> {
        Ok(self
            .load_blocklist()?
            .into_iter()
            .map(|(app_id, name)| {
                let name = normalize_display_name(name.as_deref().unwrap_or_default());
                (app_id, name)
            })
            .collect())
    }

    fn save(&self, list: &BlockList) -> anyhow::Result<()> {
        self.replace_blocklist(list)
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.clear_blocklist()
    }
}

fn normalize_display_name(name: &str) -> String {
    if name.is_empty() {
        FALLBACK_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Owner of the current blocklist
pub struct BlockPolicyStore {
    current: RwLock<Arc<BlockList>>,
    /// Serializes writers so persistence and the in-memory swap happen in
    /// the same order
    write_gate: Mutex<()>,
    persistence: Option<Arc<dyn PolicyPersistence>>,
}

impl BlockPolicyStore {
    /// Create an in-memory store with an empty blocklist
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(BlockList::new())),
            write_gate: Mutex::new(()),
            persistence: None,
        }
    }

    /// Create a store backed by durable storage, resuming the saved list
    ///
    /// A saved list that cannot be read is logged and the store starts empty.
    #[must_use]
    pub fn with_persistence(persistence: Arc<dyn PolicyPersistence>) -> Self {
        let initial = match persistence.load() {
            Ok(list) => {
                log::info!("Loaded {} blocked apps from storage", list.len());
                list
            }
            Err(e) => {
                log::warn!("Failed to load saved blocklist, starting empty: {e:#}");
                BlockList::new()
            }
        };

        Self {
            current: RwLock::new(Arc::new(initial)),
            write_gate: Mutex::new(()),
            persistence: Some(persistence),
        }
    }

    /// Replace the whole blocklist
    ///
    /// Empty display names are stored as `FALLBACK_DISPLAY_NAME`. An empty map
    /// is valid and blocks nothing.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `entries` is absent or holds an empty identifier
    /// - `Storage` if persisting fails; the previous list stays in force
    pub fn update_policy(
        &self,
        entries: Option<HashMap<String, String>>,
    ) -> Result<(), BlockError> {
        let entries = entries
            .ok_or_else(|| BlockError::InvalidArgument("blockedApps is null".to_string()))?;

        if entries.keys().any(String::is_empty) {
            return Err(BlockError::InvalidArgument(
                "blockedApps contains an empty app identifier".to_string(),
            ));
        }

        let list: BlockList = entries
            .into_iter()
            .map(|(app_id, name)| {
                let name = normalize_display_name(&name);
                (app_id, name)
            })
            .collect();

        let _gate = self.lock_writers()?;
        if let Some(persistence) = &self.persistence {
            persistence
                .save(&list)
                .map_err(|e| BlockError::Storage(format!("{e:#}")))?;
        }

        let count = list.len();
        self.swap(Arc::new(list))?;
        log::info!("Blocklist updated: {count} apps blocked");
        Ok(())
    }

    /// Empty the blocklist
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the durable copy cannot be cleared
    pub fn clear_policy(&self) -> Result<(), BlockError> {
        let _gate = self.lock_writers()?;
        if let Some(persistence) = &self.persistence {
            persistence
                .clear()
                .map_err(|e| BlockError::Storage(format!("{e:#}")))?;
        }

        self.swap(Arc::new(BlockList::new()))?;
        log::info!("Blocklist cleared");
        Ok(())
    }

    /// Consistent copy of the whole current list
    ///
    /// # Errors
    ///
    /// Returns `LookupFault` if the list lock is poisoned
    pub fn snapshot(&self) -> Result<Arc<BlockList>, BlockError> {
        self.current
            .read()
            .map(|list| Arc::clone(&list))
            .map_err(|_| BlockError::LookupFault("blocklist lock poisoned".to_string()))
    }

    fn lock_writers(&self) -> Result<std::sync::MutexGuard<'_, ()>, BlockError> {
        self.write_gate
            .lock()
            .map_err(|_| BlockError::Storage("policy writer lock poisoned".to_string()))
    }

    fn swap(&self, list: Arc<BlockList>) -> Result<(), BlockError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| BlockError::Storage("blocklist lock poisoned".to_string()))?;
        *current = list;
        Ok(())
    }
}

impl Default for BlockPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPolicy for BlockPolicyStore {
    fn lookup(&self, app_id: &str) -> Result<Option<String>, BlockError> {
        let current = self
            .current
            .read()
            .map_err(|_| BlockError::LookupFault("blocklist lock poisoned".to_string()))?;
        Ok(current.get(app_id).cloned())
    }
}
