use git2::{
    cert::Cert, CertificateCheckStatus, Config, Cred, CredentialType, FetchOptions,
    RemoteCallbacks,
};
use log::trace;
use ssh_key::{known_hosts::HostPatterns, KnownHosts};

use crate::model::{Endpoint, Protocol};

const GLOBAL_KNOWN_HOSTS: &str = "/etc/ssh/ssh_known_hosts";
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// libgit2 implementation of the clone, existence and remote collaborators.
#[derive(Debug, Clone, Copy)]
pub struct GitBackend {
    default_protocol: Protocol,
}

impl GitBackend {
    pub fn new(default_protocol: Protocol) -> GitBackend {
        GitBackend { default_protocol }
    }

    /// URL handed to libgit2. Scheme-less `host/path` locators get the
    /// default protocol, anything else is passed through.
    pub fn transport_url(&self, url: &str) -> String {
        match Endpoint::parse(url) {
            Ok(endpoint) if endpoint.scheme.is_none() => endpoint.to_git_url(self.default_protocol),
            _ => url.to_owned(),
        }
    }

    pub(crate) fn remote_callbacks(&self) -> RemoteCallbacks<'static> {
        let mut credentials = CredentialSource::new();
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed_types| {
            credentials.answer(url, username, allowed_types)
        });
        callbacks.certificate_check(|certificate, host| Ok(check_certificate(certificate, host)));
        callbacks
    }

    pub(crate) fn fetch_options(&self) -> FetchOptions<'static> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks());
        fetch_options
    }
}

/// Answers libgit2 credential requests for one connection. libgit2 asks again
/// after every rejected credential, so the number of answers is capped.
struct CredentialSource {
    git_config: Option<Config>,
    attempts: usize,
}

impl CredentialSource {
    fn new() -> Self {
        let git_config = Config::open_default()
            .map_err(|error| trace!("Could not open the git configuration: {}", error))
            .ok();
        CredentialSource {
            git_config,
            attempts: 0,
        }
    }

    fn answer(
        &mut self,
        url: &str,
        username: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        self.attempts += 1;
        trace!(
            "Credential request {} for {} (username {:?}, allowed {:?})",
            self.attempts,
            url,
            username,
            allowed
        );
        if self.attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        let user = username.unwrap_or("git");
        if allowed.contains(CredentialType::USERNAME) {
            Cred::username(user)
        } else if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(user)
        } else if let (true, Some(git_config)) = (
            allowed.contains(CredentialType::USER_PASS_PLAINTEXT),
            &self.git_config,
        ) {
            Cred::credential_helper(git_config, url, username)
        } else {
            Err(git2::Error::from_str("no valid authentication available"))
        }
    }
}

/// Accepts ssh host keys listed in the global known hosts file and leaves
/// every other certificate to libgit2.
fn check_certificate(certificate: &Cert<'_>, host: &str) -> CertificateCheckStatus {
    let Some(hostkey) = certificate.as_hostkey().and_then(|h| h.hostkey()) else {
        return CertificateCheckStatus::CertificatePassthrough;
    };

    let known_hosts = match KnownHosts::read_file(GLOBAL_KNOWN_HOSTS) {
        Ok(entries) => entries,
        Err(error) => {
            trace!("Could not load {}: {}", GLOBAL_KNOWN_HOSTS, error);
            return CertificateCheckStatus::CertificatePassthrough;
        }
    };

    let known = known_hosts
        .iter()
        .filter(|entry| host_matches_patterns(host, entry.host_patterns()))
        .any(|entry| entry.public_key().to_bytes().as_deref() == Ok(hostkey));
    if known {
        trace!("{} presented a known host key", host);
        CertificateCheckStatus::CertificateOk
    } else {
        trace!("No known host entry for {} matches its key", host);
        CertificateCheckStatus::CertificatePassthrough
    }
}

/// Plain and negated (`!host`) patterns. Wildcards and hashed names never
/// match.
fn host_matches_patterns(host: &str, patterns: &HostPatterns) -> bool {
    let HostPatterns::Patterns(patterns) = patterns else {
        return false;
    };
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_lowercase()).collect();
    let negated = patterns
        .iter()
        .any(|pattern| pattern.strip_prefix('!') == Some(host));
    !negated && patterns.iter().any(|pattern| pattern == host)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use git2::{Repository, Signature};

    use super::*;

    use pretty_assertions::assert_eq;

    /// Creates a non-bare repository with a single empty commit.
    pub(crate) fn init_repository(path: &Path) -> Repository {
        let repo = Repository::init(path).unwrap();
        {
            let signature = Signature::now("repodex", "repodex@example.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
                .unwrap();
        }
        repo
    }

    #[test]
    fn transport_url_for_scheme_less_locators() {
        let backend = GitBackend::new(Protocol::Https);
        assert_eq!(
            backend.transport_url("git.corp/teamx/widget"),
            "https://git.corp/teamx/widget"
        );
        assert_eq!(
            GitBackend::new(Protocol::Ssh).transport_url("git.corp/teamx/widget"),
            "ssh://git@git.corp/teamx/widget.git"
        );
    }

    #[test]
    fn transport_url_passes_explicit_urls_through() {
        let backend = GitBackend::new(Protocol::Https);
        assert_eq!(
            backend.transport_url("git@github.com:org/repo.git"),
            "git@github.com:org/repo.git"
        );
        assert_eq!(backend.transport_url("/tmp/local/repo"), "/tmp/local/repo");
    }

    #[test]
    fn credential_requests_are_capped() {
        let mut credentials = CredentialSource::new();
        for _ in 0..MAX_CREDENTIAL_ATTEMPTS {
            assert!(credentials
                .answer("ssh://git@example.com/org/repo.git", None, CredentialType::USERNAME)
                .is_ok());
        }
        assert!(credentials
            .answer("ssh://git@example.com/org/repo.git", None, CredentialType::USERNAME)
            .is_err());
    }

    #[test]
    fn unsupported_credential_types_are_refused() {
        let mut credentials = CredentialSource::new();
        assert!(credentials
            .answer("https://example.com/org/repo", None, CredentialType::SSH_CUSTOM)
            .is_err());
    }

    #[test]
    fn host_patterns() {
        let patterns = HostPatterns::Patterns(vec![
            "github.com".to_owned(),
            "!evil.github.com".to_owned(),
            "GitLab.com".to_owned(),
        ]);
        assert!(host_matches_patterns("github.com", &patterns));
        assert!(host_matches_patterns("gitlab.com", &patterns));
        assert!(!host_matches_patterns("evil.github.com", &patterns));
        assert!(!host_matches_patterns("example.com", &patterns));
    }
}
