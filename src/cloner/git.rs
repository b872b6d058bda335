use std::{collections::BTreeMap, path::Path};

use git2::{build::RepoBuilder, Repository};
use log::{debug, info, warn};

use crate::git::GitBackend;

use super::{CloneOutcome, CloneProvider, RemoteReader};

impl CloneProvider for GitBackend {
    fn clone_to(&self, url: &str, destination: &Path) -> anyhow::Result<CloneOutcome> {
        if Repository::open(destination).is_ok() {
            debug!("Found an existing repository at {}", destination.display());
            return Ok(CloneOutcome::AlreadyExists);
        }

        let url = self.transport_url(url);
        info!("Cloning {} into {}", url, destination.display());

        RepoBuilder::new()
            .fetch_options(self.fetch_options())
            .clone(&url, destination)?;

        Ok(CloneOutcome::Cloned)
    }
}

impl RemoteReader for GitBackend {
    fn remotes(&self, directory: &Path) -> anyhow::Result<BTreeMap<String, String>> {
        let repo = Repository::open(directory)?;
        let mut remotes = BTreeMap::new();
        for name in repo.remotes()?.iter().flatten() {
            let remote = repo.find_remote(name)?;
            match remote.url() {
                Some(url) => {
                    remotes.insert(name.to_owned(), url.to_owned());
                }
                None => warn!("Remote {} of {} has a non UTF-8 url", name, directory.display()),
            }
        }
        Ok(remotes)
    }
}

#[cfg(test)]
mod tests {
    use crate::{git::tests::init_repository, model::Protocol};

    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn clone_local_repository() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("origin");
        init_repository(&origin);

        let backend = GitBackend::new(Protocol::Https);
        let destination = dir.path().join("clones").join("repo");
        let url = origin.to_str().unwrap();

        assert_eq!(
            backend.clone_to(url, &destination).unwrap(),
            CloneOutcome::Cloned
        );
        assert!(destination.join(".git").is_dir());

        assert_eq!(
            backend.clone_to(url, &destination).unwrap(),
            CloneOutcome::AlreadyExists
        );
    }

    #[test]
    fn clone_into_occupied_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let origin = dir.path().join("origin");
        init_repository(&origin);

        let destination = dir.path().join("occupied");
        std::fs::create_dir_all(&destination).unwrap();
        std::fs::write(destination.join("notes.txt"), "keep me").unwrap();

        let backend = GitBackend::new(Protocol::Https);
        assert!(backend
            .clone_to(origin.to_str().unwrap(), &destination)
            .is_err());
        assert!(destination.join("notes.txt").is_file());
    }

    #[test]
    fn list_remotes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repository(dir.path());
        repo.remote("origin", "git@github.com:org/repo.git").unwrap();
        repo.remote("upstream", "https://git.corp/team/repo").unwrap();

        let remotes = GitBackend::new(Protocol::Ssh).remotes(dir.path()).unwrap();
        assert_eq!(
            remotes,
            BTreeMap::from([
                ("origin".to_owned(), "git@github.com:org/repo.git".to_owned()),
                ("upstream".to_owned(), "https://git.corp/team/repo".to_owned()),
            ])
        );
    }
}
