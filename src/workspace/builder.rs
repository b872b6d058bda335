use std::{error::Error, path::PathBuf, sync::Arc};

use crate::{
    chooser::{Selector, TerminalSelector},
    cloner::{CloneProvider, RemoteReader},
    config::RepodexConfig,
    git::GitBackend,
    index::{DirectoryIndex, IndexStore, TomlFileStore},
    model::{Protocol, Sources},
    resolver::ExistenceChecker,
    Workspace,
};

#[derive(Default)]
pub struct WorkspaceBuilder {
    clone_root: Option<PathBuf>,
    go_path: Option<PathBuf>,
    sources: Option<Sources>,
    default_protocol: Option<Protocol>,
    index_store: Option<Box<dyn IndexStore>>,
    cloner: Option<Arc<dyn CloneProvider>>,
    checker: Option<Arc<dyn ExistenceChecker>>,
    remotes: Option<Box<dyn RemoteReader>>,
    selector: Option<Box<dyn Selector>>,
}

impl WorkspaceBuilder {
    /// Takes roots, sources, protocol and index location from a loaded
    /// configuration. Values set explicitly on the builder win.
    pub fn config(mut self, config: RepodexConfig) -> Self {
        self.clone_root.get_or_insert(config.clone_root);
        self.go_path.get_or_insert(config.go_path);
        self.sources.get_or_insert(config.sources);
        self.default_protocol.get_or_insert(config.default_protocol);
        if self.index_store.is_none() {
            self.index_store = Some(Box::new(TomlFileStore::new(config.index_path)));
        }
        self
    }

    /// Directory under which clones are laid out as `host/path`.
    pub fn clone_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.clone_root = Some(path.into());
        self
    }

    /// Go workspace used by the Go layout.
    pub fn go_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.go_path = Some(path.into());
        self
    }

    pub fn sources(mut self, sources: Sources) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Protocol for scheme-less URLs.
    ///
    /// Defaults to ssh.
    pub fn default_protocol(mut self, protocol: Protocol) -> Self {
        self.default_protocol = Some(protocol);
        self
    }

    pub fn index_store(mut self, store: impl IndexStore + 'static) -> Self {
        self.index_store = Some(Box::new(store));
        self
    }

    pub fn cloner(mut self, cloner: impl CloneProvider + 'static) -> Self {
        self.cloner = Some(Arc::new(cloner));
        self
    }

    pub fn checker(mut self, checker: impl ExistenceChecker + 'static) -> Self {
        self.checker = Some(Arc::new(checker));
        self
    }

    pub fn remotes(mut self, remotes: impl RemoteReader + 'static) -> Self {
        self.remotes = Some(Box::new(remotes));
        self
    }

    /// How to pick among several candidates.
    ///
    /// Defaults to a terminal prompt.
    pub fn selector(mut self, selector: impl Selector + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    pub fn try_build(self) -> Result<Workspace, Box<dyn Error>> {
        let Self {
            clone_root,
            go_path,
            sources,
            default_protocol,
            index_store,
            cloner,
            checker,
            remotes,
            selector,
        } = self;

        let clone_root = clone_root.ok_or("Clone root is not configured")?;
        let go_path = go_path.unwrap_or_else(|| clone_root.join("go"));
        let index_store = index_store.ok_or("Index location is not configured")?;

        let git = GitBackend::new(default_protocol.unwrap_or(Protocol::Ssh));

        let index = DirectoryIndex::load(index_store)?;

        Ok(Workspace {
            clone_root,
            go_path,
            sources: sources.unwrap_or_default(),
            index,
            cloner: cloner.unwrap_or_else(|| Arc::new(git)),
            checker: checker.unwrap_or_else(|| Arc::new(git)),
            remotes: remotes.unwrap_or_else(|| Box::new(git)),
            selector: selector.unwrap_or_else(|| Box::new(TerminalSelector)),
        })
    }
}
