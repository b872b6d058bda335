use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

/// Named templates, keyed by source name. Iteration is sorted by name.
pub type Sources = BTreeMap<String, SourceTemplate>;

/// Turns a slug into a URL for one remote host.
///
/// A `*` in the template is replaced by the slug, otherwise the slug is
/// appended (`github.com/` + `org/repo`, `git@github.com:` + `org/repo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTemplate(String);

impl SourceTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        SourceTemplate(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(&self, slug: &str) -> String {
        let slug = slug.trim_matches('/');
        if self.0.contains('*') {
            self.0.replacen('*', slug, 1)
        } else if self.0.ends_with('/') || self.0.ends_with(':') {
            format!("{}{}", self.0, slug)
        } else {
            format!("{}/{}", self.0, slug)
        }
    }
}

impl Display for SourceTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceTemplate {
    fn from(s: &str) -> Self {
        SourceTemplate::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_appends_slug() {
        assert_eq!(
            SourceTemplate::from("git.corp/").resolve("teamx/widget"),
            "git.corp/teamx/widget"
        );
        assert_eq!(
            SourceTemplate::from("https://github.com").resolve("org/repo"),
            "https://github.com/org/repo"
        );
        assert_eq!(
            SourceTemplate::from("git@github.com:").resolve("org/repo"),
            "git@github.com:org/repo"
        );
    }

    #[test]
    fn resolve_replaces_wildcard() {
        assert_eq!(
            SourceTemplate::from("git@github.com:*.git").resolve("org/repo"),
            "git@github.com:org/repo.git"
        );
    }
}
