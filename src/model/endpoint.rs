use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display},
    str::FromStr,
    sync::OnceLock,
};

use crate::model::ParseError;

/// Structured form of a remote locator.
///
/// Two endpoints that differ only by scheme or user name point at the same
/// location and are mapped to the same local directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Endpoint {
    pub scheme: Option<Scheme>,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub segments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Scheme {
    Ssh,
    Https,
    Http,
    Git,
}

impl Scheme {
    fn from_url_scheme(scheme: &str) -> Option<Scheme> {
        match scheme {
            "ssh" | "git+ssh" | "ssh+git" => Some(Scheme::Ssh),
            "https" => Some(Scheme::Https),
            "http" => Some(Scheme::Http),
            "git" => Some(Scheme::Git),
            _ => None,
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Scheme::Ssh => f.write_str("ssh"),
            Scheme::Https => f.write_str("https"),
            Scheme::Http => f.write_str("http"),
            Scheme::Git => f.write_str("git"),
        }
    }
}

/// Transport used for endpoints written without a scheme, e.g. `github.com/org/repo`.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize, Ord, PartialOrd)]
pub enum Protocol {
    #[serde(rename = "https")]
    Https,
    #[serde(rename = "ssh")]
    Ssh,
}

impl FromStr for Protocol {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.to_ascii_lowercase();
        match value.as_str() {
            "https" => Ok(Protocol::Https),
            "ssh" => Ok(Protocol::Ssh),
            _ => Err(ParseError::InvalidProtocol(value)),
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Protocol::Https => f.write_str("https"),
            Protocol::Ssh => f.write_str("ssh"),
        }
    }
}

impl From<Protocol> for Scheme {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Https => Scheme::Https,
            Protocol::Ssh => Scheme::Ssh,
        }
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*)://(?:(?P<user>[^@/]+)@)?(?P<host>[A-Za-z0-9._-]+)(?::(?P<port>[0-9]+))?(?P<path>/.*)?$",
        )
        .expect("valid url regex")
    })
}

fn scp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<user>[^@/:]+)@)?(?P<host>[A-Za-z0-9._-]+):(?P<path>.+)$")
            .expect("valid scp regex")
    })
}

fn bare_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<host>[A-Za-z0-9._-]+)/(?P<path>.+)$").expect("valid host/path regex")
    })
}

impl Endpoint {
    /// Parses a remote locator. Accepts `scheme://[user@]host[:port]/path`,
    /// scp-like `[user@]host:path` and bare `host/path` when the host looks
    /// like a domain name.
    pub fn parse(locator: &str) -> Result<Endpoint, ParseError> {
        let malformed = || ParseError::MalformedEndpoint(locator.to_owned());

        if locator.is_empty() || locator.chars().any(char::is_whitespace) {
            return Err(malformed());
        }

        if locator.contains("://") {
            let captures = url_regex().captures(locator).ok_or_else(malformed)?;
            let scheme = captures
                .name("scheme")
                .and_then(|s| Scheme::from_url_scheme(&s.as_str().to_ascii_lowercase()))
                .ok_or_else(malformed)?;
            let port = match captures.name("port") {
                Some(port) => Some(port.as_str().parse::<u16>().map_err(|_| malformed())?),
                None => None,
            };
            return Self::build(
                locator,
                Some(scheme),
                captures.name("user").map(|u| u.as_str()),
                captures.name("host").map(|h| h.as_str()).ok_or_else(malformed)?,
                port,
                captures.name("path").map(|p| p.as_str()).unwrap_or(""),
            );
        }

        if let Some(captures) = bare_regex().captures(locator) {
            let host = captures.name("host").map(|h| h.as_str()).unwrap_or("");
            if looks_like_host(host) {
                return Self::build(
                    locator,
                    None,
                    None,
                    host,
                    None,
                    captures.name("path").map(|p| p.as_str()).unwrap_or(""),
                );
            }
        }

        let captures = scp_regex().captures(locator).ok_or_else(malformed)?;
        Self::build(
            locator,
            Some(Scheme::Ssh),
            captures.name("user").map(|u| u.as_str()),
            captures.name("host").map(|h| h.as_str()).ok_or_else(malformed)?,
            None,
            captures.name("path").map(|p| p.as_str()).unwrap_or(""),
        )
    }

    fn build(
        locator: &str,
        scheme: Option<Scheme>,
        user: Option<&str>,
        host: &str,
        port: Option<u16>,
        path: &str,
    ) -> Result<Endpoint, ParseError> {
        let mut segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();

        if let Some(last) = segments.last_mut() {
            if let Some(stripped) = last.strip_suffix(".git") {
                if !stripped.is_empty() {
                    *last = stripped.to_owned();
                }
            }
        }

        if host.is_empty() || segments.is_empty() {
            return Err(ParseError::MalformedEndpoint(locator.to_owned()));
        }

        Ok(Endpoint {
            scheme,
            user: user.map(str::to_owned),
            host: host.to_ascii_lowercase(),
            port,
            segments,
        })
    }

    /// Host directory name, including a non-default port.
    pub fn host_dir(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// URL handed to git. Endpoints written without a scheme use `default_protocol`.
    pub fn to_git_url(&self, default_protocol: Protocol) -> String {
        let scheme = self.scheme.unwrap_or_else(|| default_protocol.into());
        match scheme {
            Scheme::Ssh => format!(
                "ssh://{}@{}/{}.git",
                self.user.as_deref().unwrap_or("git"),
                self.host_dir(),
                self.path()
            ),
            Scheme::Https | Scheme::Http | Scheme::Git => {
                let user = self
                    .user
                    .as_deref()
                    .map(|user| format!("{user}@"))
                    .unwrap_or_default();
                format!("{}://{}{}/{}", scheme, user, self.host_dir(), self.path())
            }
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.host_dir(), self.path())
    }
}

fn looks_like_host(host: &str) -> bool {
    host == "localhost" || (host.contains('.') && !host.starts_with('.') && !host.ends_with('.'))
}

/// True for a source-relative identifier such as `org/repo`.
pub fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('/')
        && !s.contains(':')
        && !s.chars().any(char::is_whitespace)
        && s
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn endpoint(
        scheme: Option<Scheme>,
        user: Option<&str>,
        host: &str,
        port: Option<u16>,
        segments: &[&str],
    ) -> Endpoint {
        Endpoint {
            scheme,
            user: user.map(str::to_owned),
            host: host.to_owned(),
            port,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn parse_https_url() {
        assert_eq!(
            Endpoint::parse("https://github.com/rust-lang/cargo.git").unwrap(),
            endpoint(
                Some(Scheme::Https),
                None,
                "github.com",
                None,
                &["rust-lang", "cargo"]
            )
        );
    }

    #[test]
    fn parse_ssh_url_with_user_and_port() {
        assert_eq!(
            Endpoint::parse("ssh://git@git.example.com:2222/team/sub/repo").unwrap(),
            endpoint(
                Some(Scheme::Ssh),
                Some("git"),
                "git.example.com",
                Some(2222),
                &["team", "sub", "repo"]
            )
        );
    }

    #[test]
    fn parse_scp_like() {
        assert_eq!(
            Endpoint::parse("git@github.com:org/repo.git").unwrap(),
            endpoint(Some(Scheme::Ssh), Some("git"), "github.com", None, &["org", "repo"])
        );
    }

    #[test]
    fn parse_without_scheme() {
        assert_eq!(
            Endpoint::parse("git.corp/teamx/widget").unwrap(),
            endpoint(None, None, "git.corp", None, &["teamx", "widget"])
        );
    }

    #[test]
    fn parse_normalizes_host_case_and_slashes() {
        assert_eq!(
            Endpoint::parse("https://GitHub.com//org/repo/").unwrap(),
            Endpoint::parse("https://github.com/org/repo").unwrap()
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        for locator in [
            "",
            "teamx/widget",
            "widget",
            "https://",
            "https://github.com",
            "ftp://example.com/org/repo",
            "file:///tmp/repo",
            "github.com/org repo",
            "git@github.com:",
        ] {
            assert_eq!(
                Endpoint::parse(locator),
                Err(ParseError::MalformedEndpoint(locator.to_owned())),
                "{locator}"
            );
        }
    }

    #[test]
    fn git_url_uses_default_protocol_without_scheme() {
        let endpoint = Endpoint::parse("github.com/org/repo").unwrap();
        assert_eq!(
            endpoint.to_git_url(Protocol::Https),
            "https://github.com/org/repo"
        );
        assert_eq!(
            endpoint.to_git_url(Protocol::Ssh),
            "ssh://git@github.com/org/repo.git"
        );
    }

    #[test]
    fn git_url_keeps_explicit_scheme() {
        let endpoint = Endpoint::parse("git@example.com:org/repo").unwrap();
        assert_eq!(
            endpoint.to_git_url(Protocol::Https),
            "ssh://git@example.com/org/repo.git"
        );
    }

    #[test]
    fn display() {
        let endpoint = Endpoint::parse("ssh://git@example.com:2222/org/repo.git").unwrap();
        assert_eq!(endpoint.to_string(), "example.com:2222/org/repo");
    }

    #[test]
    fn slugs() {
        assert!(is_slug("teamx/widget"));
        assert!(is_slug("widget"));
        assert!(!is_slug("/teamx/widget"));
        assert!(!is_slug("teamx//widget"));
        assert!(!is_slug("../widget"));
        assert!(!is_slug("git@github.com:org/repo"));
        assert!(!is_slug("team x/widget"));
        assert!(!is_slug(""));
    }

    #[test]
    fn load_protocol() {
        assert_eq!("SSH".parse::<Protocol>(), Ok(Protocol::Ssh));
        assert_eq!(
            "ftp".parse::<Protocol>(),
            Err(ParseError::InvalidProtocol("ftp".to_owned()))
        );
    }

    proptest! {
        #[test]
        fn parse_is_deterministic(locator in "(https://|ssh://git@|git@)?[a-z]{1,8}\\.[a-z]{2,3}[:/][a-z0-9_-]{1,8}(/[a-z0-9_.-]{1,8}){0,3}") {
            prop_assert_eq!(Endpoint::parse(&locator), Endpoint::parse(&locator));
        }
    }
}
