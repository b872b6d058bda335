use git2::{Direction, ErrorCode, Remote};
use log::{debug, trace};

use crate::git::GitBackend;

use super::ExistenceChecker;

/// Fragments of libgit2 and server messages that mean the repository is not
/// there, or not visible to us.
const MISSING_MARKERS: &[&str] = &[
    "not found",
    "404",
    "does not exist",
    "could not find repository",
    "could not read from remote",
    "authentication",
];

impl ExistenceChecker for GitBackend {
    fn exists(&self, url: &str) -> anyhow::Result<bool> {
        let url = self.transport_url(url);
        trace!("Connecting to {}", url);

        let mut remote = Remote::create_detached(url.as_str())?;
        let result = remote.connect_auth(Direction::Fetch, Some(self.remote_callbacks()), None);
        match result {
            Ok(_connection) => Ok(true),
            Err(error) if is_missing(&error) => {
                debug!("{} is not available: {}", url, error.message());
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }
}

fn is_missing(error: &git2::Error) -> bool {
    if matches!(error.code(), ErrorCode::NotFound | ErrorCode::Auth) {
        return true;
    }
    let message = error.message().to_ascii_lowercase();
    MISSING_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

#[cfg(test)]
mod tests {
    use crate::{git::tests::init_repository, model::Protocol};

    use super::*;

    #[test]
    fn existing_local_repository() {
        let dir = tempfile::tempdir().unwrap();
        init_repository(dir.path());
        let backend = GitBackend::new(Protocol::Https);
        assert!(backend.exists(dir.path().to_str().unwrap()).unwrap());
    }

    #[test]
    fn directory_without_repository() {
        let dir = tempfile::tempdir().unwrap();
        let backend = GitBackend::new(Protocol::Https);
        assert!(!backend.exists(dir.path().to_str().unwrap()).unwrap());
    }

    #[test]
    fn classify_errors() {
        assert!(is_missing(&git2::Error::new(
            ErrorCode::GenericError,
            git2::ErrorClass::Http,
            "unexpected http status code: 404"
        )));
        assert!(is_missing(&git2::Error::new(
            ErrorCode::Auth,
            git2::ErrorClass::Ssh,
            "failed"
        )));
        assert!(!is_missing(&git2::Error::new(
            ErrorCode::GenericError,
            git2::ErrorClass::Net,
            "failed to resolve address for example.invalid"
        )));
    }
}
