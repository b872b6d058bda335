mod git;

use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned,
    /// The destination already holds a repository; nothing was fetched.
    AlreadyExists,
}

/// Populates a directory with a working copy of a remote repository.
///
/// Implementations block; callers on an async runtime run them on the
/// blocking pool.
pub trait CloneProvider: Send + Sync {
    fn clone_to(&self, url: &str, destination: &Path) -> anyhow::Result<CloneOutcome>;
}

/// Lists the remotes configured in a local working copy, by remote name.
pub trait RemoteReader {
    fn remotes(&self, directory: &Path) -> anyhow::Result<BTreeMap<String, String>>;
}
