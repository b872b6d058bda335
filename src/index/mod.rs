//! Registry of the directories managed by repodex.
//!
//! Every mutation is persisted before it returns. When persisting fails the
//! in-memory change is reverted, so the index in memory never runs ahead of
//! its backing store.

mod store;

use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::normalize;

pub use store::{IndexStore, MemoryStore, StoreError, TomlFileStore};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("{0} is already indexed")]
    AlreadyIndexed(PathBuf),
    #[error("{0} is not indexed")]
    NotIndexed(PathBuf),
    #[error("Index paths must be absolute, got {0}")]
    RelativePath(PathBuf),
    #[error("Index store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Clone,
    Move,
    Track,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Clone => f.write_str("clone"),
            Origin::Move => f.write_str("move"),
            Origin::Track => f.write_str("track"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub path: PathBuf,
    pub origin: Origin,
    /// Seconds since the unix epoch.
    pub tracked_since: u64,
}

impl Entry {
    fn new(path: PathBuf, origin: Origin) -> Entry {
        let tracked_since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Entry {
            path,
            origin,
            tracked_since,
        }
    }
}

pub struct DirectoryIndex {
    entries: BTreeMap<PathBuf, Entry>,
    store: Box<dyn IndexStore>,
}

impl DirectoryIndex {
    pub fn load(store: Box<dyn IndexStore>) -> Result<DirectoryIndex, IndexError> {
        let mut entries = BTreeMap::new();
        for mut entry in store.read_all()? {
            if !entry.path.is_absolute() {
                warn!(
                    "Skipping relative path {} in the index",
                    entry.path.display()
                );
                continue;
            }
            entry.path = normalize(&entry.path);
            if entries.contains_key(&entry.path) {
                warn!("Skipping duplicate index entry {}", entry.path.display());
                continue;
            }
            entries.insert(entry.path.clone(), entry);
        }
        debug!("Loaded {} index entries", entries.len());
        Ok(DirectoryIndex { entries, store })
    }

    /// Registers `path`. Fails if it is already indexed.
    pub fn add(&mut self, path: &Path, origin: Origin) -> Result<(), IndexError> {
        let key = Self::key(path)?;
        if self.entries.contains_key(&key) {
            return Err(IndexError::AlreadyIndexed(key));
        }
        self.insert(key, origin)
    }

    /// Registers `path` unless it is already indexed. Returns whether an
    /// entry was added.
    pub fn ensure(&mut self, path: &Path, origin: Origin) -> Result<bool, IndexError> {
        let key = Self::key(path)?;
        if self.entries.contains_key(&key) {
            debug!("{} is already indexed", key.display());
            return Ok(false);
        }
        self.insert(key, origin)?;
        Ok(true)
    }

    pub fn remove(&mut self, path: &Path) -> Result<Entry, IndexError> {
        let key = Self::key(path)?;
        let entry = self
            .entries
            .remove(&key)
            .ok_or_else(|| IndexError::NotIndexed(key.clone()))?;
        if let Err(error) = self.save() {
            self.entries.insert(key, entry);
            return Err(error);
        }
        debug!("Removed {} from the index", key.display());
        Ok(entry)
    }

    /// Registers every path not yet indexed with a single save. Returns the
    /// number of entries added.
    pub fn ensure_all(
        &mut self,
        paths: impl IntoIterator<Item = (PathBuf, Origin)>,
    ) -> Result<usize, IndexError> {
        let mut added = Vec::new();
        for (path, origin) in paths {
            let key = match Self::key(&path) {
                Ok(key) => key,
                Err(error) => {
                    self.forget(&added);
                    return Err(error);
                }
            };
            if !self.entries.contains_key(&key) {
                self.entries
                    .insert(key.clone(), Entry::new(key.clone(), origin));
                added.push(key);
            }
        }
        if added.is_empty() {
            return Ok(0);
        }
        if let Err(error) = self.save() {
            self.forget(&added);
            return Err(error);
        }
        debug!("Added {} entries to the index", added.len());
        Ok(added.len())
    }

    /// Unregisters `path` and every indexed path below it with a single save.
    pub fn remove_under(&mut self, path: &Path) -> Result<Vec<Entry>, IndexError> {
        let removed: Vec<Entry> = self
            .paths_under(path)
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        if let Err(error) = self.save() {
            for entry in removed {
                self.entries.insert(entry.path.clone(), entry);
            }
            return Err(error);
        }
        debug!(
            "Removed {} entries under {} from the index",
            removed.len(),
            path.display()
        );
        Ok(removed)
    }

    /// Indexed paths equal to `path` or below it, sorted.
    pub fn paths_under(&self, path: &Path) -> Vec<PathBuf> {
        match Self::key(path) {
            Ok(key) => self
                .entries
                .keys()
                .filter(|indexed| indexed.starts_with(&key))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<&Entry> {
        Self::key(path).ok().and_then(|key| self.entries.get(&key))
    }

    /// All entries, sorted by path.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &Entry> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self) -> Result<(), IndexError> {
        let entries: Vec<Entry> = self.entries.values().cloned().collect();
        self.store.write_all(&entries)?;
        Ok(())
    }

    fn insert(&mut self, key: PathBuf, origin: Origin) -> Result<(), IndexError> {
        self.entries
            .insert(key.clone(), Entry::new(key.clone(), origin));
        if let Err(error) = self.save() {
            self.entries.remove(&key);
            return Err(error);
        }
        debug!("Added {} to the index", key.display());
        Ok(())
    }

    fn forget(&mut self, keys: &[PathBuf]) {
        for key in keys {
            self.entries.remove(key);
        }
    }

    fn key(path: &Path) -> Result<PathBuf, IndexError> {
        if path.is_absolute() {
            Ok(normalize(path))
        } else {
            Err(IndexError::RelativePath(path.to_path_buf()))
        }
    }
}
