use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use log::trace;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::Entry;

const VERSION: i64 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Unsupported index file version {0}")]
    UnsupportedVersion(toml::Value),
    #[error("Index file has no version")]
    MissingVersion,
    #[error("Could not replace the index file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Durable backing for the directory index. `write_all` replaces the whole
/// content; implementations must never leave a partially written state behind.
pub trait IndexStore {
    fn read_all(&self) -> Result<Vec<Entry>, StoreError>;

    fn write_all(&self, entries: &[Entry]) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Deserialize)]
struct IndexFile {
    #[serde(default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Serialize)]
struct VersionedIndexFile<'a> {
    version: i64,
    entries: &'a [Entry],
}

pub fn from_str(s: &str) -> Result<Vec<Entry>, StoreError> {
    let mut table = toml::from_str::<toml::Table>(s)?;
    match table.remove("version") {
        Some(toml::Value::Integer(VERSION)) => Ok(table.try_into::<IndexFile>()?.entries),
        Some(other) => Err(StoreError::UnsupportedVersion(other)),
        None => Err(StoreError::MissingVersion),
    }
}

pub fn to_string(entries: &[Entry]) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&VersionedIndexFile {
        version: VERSION,
        entries,
    })
}

/// TOML file replaced atomically on every write.
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TomlFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexStore for TomlFileStore {
    fn read_all(&self) -> Result<Vec<Entry>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => from_str(&contents),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                trace!("No index file at {}, starting empty", self.path.display());
                Ok(Vec::new())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn write_all(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let text = to_string(entries)?;
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;

        trace!(
            "Wrote {} index entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store. Clones share the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl MemoryStore {
    pub fn new(entries: Vec<Entry>) -> Self {
        MemoryStore {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IndexStore for MemoryStore {
    fn read_all(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self.snapshot())
    }

    fn write_all(&self, entries: &[Entry]) -> Result<(), StoreError> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.to_vec();
        Ok(())
    }
}
