mod git;

use std::sync::Arc;

use log::{debug, warn};
use tokio::task::JoinSet;

use crate::{chooser::Candidates, model::Sources};

/// Answers whether a remote repository exists without cloning it.
pub trait ExistenceChecker: Send + Sync {
    fn exists(&self, url: &str) -> anyhow::Result<bool>;
}

/// Checks every source for `slug` concurrently and returns the sources that
/// have it, keyed by source name.
///
/// All checks run to completion: the point is to notice when more than one
/// source has the slug, not to find the first one. A failing check is logged
/// and excludes only its own source.
pub async fn probe(
    sources: &Sources,
    slug: &str,
    checker: Arc<dyn ExistenceChecker>,
) -> Candidates {
    let mut checks = JoinSet::new();

    for (name, template) in sources {
        let name = name.clone();
        let url = template.resolve(slug);
        let checker = Arc::clone(&checker);
        debug!("Probing source {} at {}", name, url);
        checks.spawn_blocking(move || {
            let result = checker.exists(&url);
            (name, url, result)
        });
    }

    let mut candidates = Candidates::new();
    while let Some(joined) = checks.join_next().await {
        match joined {
            Ok((name, url, Ok(true))) => {
                debug!("Found {} in source {}", url, name);
                candidates.insert(name, url);
            }
            Ok((name, url, Ok(false))) => debug!("{} does not exist in source {}", url, name),
            Ok((name, url, Err(error))) => {
                warn!("Could not check source {} ({}): {:#}", name, url, error)
            }
            Err(error) => warn!("A source check did not complete: {}", error),
        }
    }

    candidates
}
