//! Clone, move and remove operations over indexed directories.
//!
//! Every operation changes the filesystem first and the index second. A
//! failure in between leaves an index that is stale but safe: it may still
//! list a directory that moved or vanished, but it never forgets a directory
//! that exists, and it never lets a destination be clobbered.

mod builder;

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    chooser::{self, ChooseError, Selector},
    cloner::{CloneOutcome, CloneProvider, RemoteReader},
    index::{DirectoryIndex, IndexError, Origin},
    layout,
    model::{endpoint::is_slug, Endpoint, ParseError, Sources},
    resolver::{self, ExistenceChecker},
};

pub use builder::WorkspaceBuilder;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Endpoint(#[from] ParseError),
    #[error(transparent)]
    Choose(#[from] ChooseError),
    #[error("Unknown source `{0}`")]
    UnknownSource(String),
    #[error("{} has no remote named `{remote}`", .directory.display())]
    UnknownRemote { directory: PathBuf, remote: String },
    #[error("{0}")]
    Usage(String),
    #[error("Destination {0} already exists")]
    DestinationExists(PathBuf),
    #[error("{0} is not a directory")]
    SourceMissing(PathBuf),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("{} changed on disk but the index could not be updated: {source}", .path.display())]
    IndexOutOfSync { path: PathBuf, source: IndexError },
    #[error("Failed to clone {url}: {source}")]
    Clone { url: String, source: BoxError },
    #[error("Could not read the remotes of {}: {source}", .directory.display())]
    Remotes { directory: PathBuf, source: BoxError },
    #[error("IO error on {}: {source}", .path.display())]
    IO { path: PathBuf, source: io::Error },
}

impl WorkspaceError {
    /// True when the request could not be turned into a single target, as
    /// opposed to a failure while acting on it.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            WorkspaceError::Endpoint(ParseError::MalformedEndpoint(_))
                | WorkspaceError::Choose(ChooseError::NotFound | ChooseError::Ambiguous { .. })
                | WorkspaceError::UnknownSource(_)
                | WorkspaceError::UnknownRemote { .. }
                | WorkspaceError::Usage(_)
        )
    }

    fn io(path: &Path) -> impl FnOnce(io::Error) -> WorkspaceError + '_ {
        move |source| WorkspaceError::IO {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// `clone_root/host/path`
    #[default]
    Default,
    /// `go_path/src/host/path`
    Go,
}

#[derive(Debug, Clone, Default)]
pub struct CloneRequest {
    /// A URL or a slug such as `org/repo`.
    pub locator: String,
    /// Resolve a slug with this source only, skipping the probe.
    pub source: Option<String>,
    /// Clone here instead of the canonical location.
    pub target: Option<PathBuf>,
    pub layout: Layout,
}

impl CloneRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        CloneRequest {
            locator: locator.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum MoveTarget {
    Path(PathBuf),
    /// Canonical location of one of the source's remotes. Without a name the
    /// remote is chosen among all of them.
    Remote(Option<String>),
}

pub struct Workspace {
    clone_root: PathBuf,
    go_path: PathBuf,
    sources: Sources,
    index: DirectoryIndex,
    cloner: Arc<dyn CloneProvider>,
    checker: Arc<dyn ExistenceChecker>,
    remotes: Box<dyn RemoteReader>,
    selector: Box<dyn Selector>,
}

impl Workspace {
    pub fn builder() -> WorkspaceBuilder {
        WorkspaceBuilder::default()
    }

    pub fn index(&self) -> &DirectoryIndex {
        &self.index
    }

    pub fn clone_root(&self) -> &Path {
        &self.clone_root
    }

    /// Clones the repository described by `request` and indexes it. Returns
    /// the directory of the clone.
    pub async fn clone_repo(&mut self, request: CloneRequest) -> Result<PathBuf, WorkspaceError> {
        let url = self.resolve_clone_url(&request).await?;
        let endpoint = Endpoint::parse(&url)?;
        let destination = self.clone_destination(&request, &endpoint)?;

        let existed = destination.exists();

        let cloner = Arc::clone(&self.cloner);
        let (task_url, task_destination) = (url.clone(), destination.clone());
        let cloned =
            tokio::task::spawn_blocking(move || cloner.clone_to(&task_url, &task_destination))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|result| result);

        match cloned {
            Ok(outcome) => {
                if outcome == CloneOutcome::AlreadyExists {
                    info!("{} is already cloned at {}", url, destination.display());
                }
                self.index
                    .ensure(&destination, Origin::Clone)
                    .map_err(|source| out_of_sync(&destination, source))?;
                Ok(destination)
            }
            Err(clone_error) => {
                if !existed && destination.exists() {
                    debug!("Removing partial clone at {}", destination.display());
                    if let Err(cleanup_error) = fs::remove_dir_all(&destination) {
                        warn!(
                            "Could not remove partial clone at {}: {}",
                            destination.display(),
                            cleanup_error
                        );
                    }
                }
                Err(WorkspaceError::Clone {
                    url,
                    source: clone_error.into(),
                })
            }
        }
    }

    /// Moves an existing directory and keeps the index in step. Returns the
    /// new location.
    pub fn move_dir(
        &mut self,
        source: &Path,
        target: MoveTarget,
    ) -> Result<PathBuf, WorkspaceError> {
        let source = layout::absolute(source).map_err(WorkspaceError::io(source))?;
        if !source.is_dir() {
            return Err(WorkspaceError::SourceMissing(source));
        }

        let destination = match target {
            MoveTarget::Path(path) => {
                layout::absolute(&path).map_err(WorkspaceError::io(&path))?
            }
            MoveTarget::Remote(remote) => self.remote_destination(&source, remote)?,
        };

        if source == destination {
            debug!("{} is already in place", source.display());
            return Ok(destination);
        }

        if destination.starts_with(&source) {
            return Err(WorkspaceError::Usage(format!(
                "can not move {} into itself",
                source.display()
            )));
        }

        match fs::symlink_metadata(&destination) {
            Ok(_) => return Err(WorkspaceError::DestinationExists(destination)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(WorkspaceError::io(&destination)(error)),
        }

        let created = create_parents(&destination)?;
        if let Err(error) = fs::rename(&source, &destination) {
            if let Some(created) = created {
                if let Err(cleanup_error) = fs::remove_dir_all(&created) {
                    warn!("Could not remove {}: {}", created.display(), cleanup_error);
                }
            }
            return Err(WorkspaceError::io(&source)(error));
        }
        info!("Moved {} to {}", source.display(), destination.display());

        // Entries below the source travel with it.
        let moved = self.index.paths_under(&source);
        let mut additions = vec![(destination.clone(), Origin::Move)];
        for path in moved.iter().filter(|path| **path != source) {
            if let (Ok(relative), Some(entry)) =
                (path.strip_prefix(&source), self.index.get(path))
            {
                additions.push((destination.join(relative), entry.origin));
            }
        }

        // Add before remove: an interruption leaves both entries, never neither.
        self.index
            .ensure_all(additions)
            .map_err(|error| out_of_sync(&destination, error))?;
        if moved.is_empty() {
            debug!("{} was not indexed", source.display());
        } else {
            self.index
                .remove_under(&source)
                .map_err(|error| out_of_sync(&source, error))?;
        }

        Ok(destination)
    }

    /// Deletes an indexed directory along with its index entry and the
    /// entries of every indexed directory below it.
    pub fn remove(&mut self, path: &Path) -> Result<PathBuf, WorkspaceError> {
        let path = layout::absolute(path).map_err(WorkspaceError::io(path))?;
        if !self.index.contains(&path) {
            return Err(IndexError::NotIndexed(path).into());
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => info!("Removed {}", path.display()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                warn!("{} was already gone", path.display())
            }
            Err(error) => return Err(WorkspaceError::io(&path)(error)),
        }

        self.index
            .remove_under(&path)
            .map_err(|error| out_of_sync(&path, error))?;
        Ok(path)
    }

    /// Starts tracking an existing directory.
    pub fn track(&mut self, path: &Path) -> Result<PathBuf, WorkspaceError> {
        let path = layout::absolute(path).map_err(WorkspaceError::io(path))?;
        if !path.is_dir() {
            return Err(WorkspaceError::SourceMissing(path));
        }
        self.index.add(&path, Origin::Track)?;
        Ok(path)
    }

    /// Stops tracking a directory without touching it.
    pub fn untrack(&mut self, path: &Path) -> Result<PathBuf, WorkspaceError> {
        let path = layout::absolute(path).map_err(WorkspaceError::io(path))?;
        self.index.remove(&path)?;
        Ok(path)
    }

    async fn resolve_clone_url(&self, request: &CloneRequest) -> Result<String, WorkspaceError> {
        let locator = request.locator.trim();

        if Endpoint::parse(locator).is_ok() {
            if request.source.is_some() {
                return Err(WorkspaceError::Usage(
                    "a source can not be combined with a URL".to_owned(),
                ));
            }
            return Ok(locator.to_owned());
        }

        if !is_slug(locator) {
            return Err(ParseError::MalformedEndpoint(locator.to_owned()).into());
        }

        if let Some(source) = &request.source {
            let template = self
                .sources
                .get(source)
                .ok_or_else(|| WorkspaceError::UnknownSource(source.clone()))?;
            return Ok(template.resolve(locator));
        }

        let candidates = resolver::probe(&self.sources, locator, Arc::clone(&self.checker)).await;
        let (name, url) = chooser::choose(
            &candidates,
            &format!("{locator} exists in several sources"),
            self.selector.as_ref(),
        )?;
        debug!("Resolved {} to {} using source {}", locator, url, name);
        Ok(url)
    }

    fn clone_destination(
        &self,
        request: &CloneRequest,
        endpoint: &Endpoint,
    ) -> Result<PathBuf, WorkspaceError> {
        match (&request.target, request.layout) {
            (Some(_), Layout::Go) => Err(WorkspaceError::Usage(
                "a target can not be combined with the Go layout".to_owned(),
            )),
            (Some(target), Layout::Default) => {
                layout::absolute(target).map_err(WorkspaceError::io(target))
            }
            (None, Layout::Go) => Ok(layout::go_path(&self.go_path, endpoint)?),
            (None, Layout::Default) => Ok(layout::to_local_path(&self.clone_root, endpoint)?),
        }
    }

    fn remote_destination(
        &self,
        source: &Path,
        remote: Option<String>,
    ) -> Result<PathBuf, WorkspaceError> {
        let remotes =
            self.remotes
                .remotes(source)
                .map_err(|error| WorkspaceError::Remotes {
                    directory: source.to_path_buf(),
                    source: error.into(),
                })?;

        let url = match remote {
            Some(name) => remotes
                .get(&name)
                .cloned()
                .ok_or_else(|| WorkspaceError::UnknownRemote {
                    directory: source.to_path_buf(),
                    remote: name,
                })?,
            None => {
                let (name, url) = chooser::choose(
                    &remotes,
                    &format!("{} has several remotes", source.display()),
                    self.selector.as_ref(),
                )?;
                debug!("Using remote {} ({})", name, url);
                url
            }
        };

        let endpoint = Endpoint::parse(&url)?;
        Ok(layout::to_local_path(&self.clone_root, &endpoint)?)
    }
}

/// Creates the missing ancestors of `path` and returns the topmost one
/// created, so that it can be removed again.
fn create_parents(path: &Path) -> Result<Option<PathBuf>, WorkspaceError> {
    let Some(parent) = path.parent() else {
        return Ok(None);
    };
    let topmost = parent
        .ancestors()
        .take_while(|ancestor| !ancestor.exists())
        .last()
        .map(Path::to_path_buf);
    fs::create_dir_all(parent).map_err(WorkspaceError::io(parent))?;
    Ok(topmost)
}

fn out_of_sync(path: &Path, source: IndexError) -> WorkspaceError {
    error!(
        "{} changed on disk but the index was not updated: {}",
        path.display(),
        source
    );
    WorkspaceError::IndexOutOfSync {
        path: path.to_path_buf(),
        source,
    }
}
