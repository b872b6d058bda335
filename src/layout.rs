use std::{
    env,
    path::{Component, Path, PathBuf},
};

use crate::model::{Endpoint, ParseError};

/// Canonical location of a clone: `root/host[:port]/segment/...`.
pub fn to_local_path(root: &Path, endpoint: &Endpoint) -> Result<PathBuf, ParseError> {
    let mut path = root.to_path_buf();

    let host = endpoint.host_dir();
    check_segment(&host, endpoint)?;
    path.push(host);

    for segment in &endpoint.segments {
        check_segment(segment, endpoint)?;
        path.push(segment);
    }

    Ok(path)
}

/// Location of a clone inside a Go workspace: `gopath/src/host/segment/...`.
pub fn go_path(gopath: &Path, endpoint: &Endpoint) -> Result<PathBuf, ParseError> {
    to_local_path(&gopath.join("src"), endpoint)
}

fn check_segment(segment: &str, endpoint: &Endpoint) -> Result<(), ParseError> {
    let unsafe_segment = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if unsafe_segment {
        Err(ParseError::UnsafePathSegment {
            segment: segment.to_owned(),
            endpoint: endpoint.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Makes `path` absolute against the current directory and normalizes it.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&env::current_dir()?.join(path)))
    }
}

/// Lexically removes `.` and `..` components. Symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if result.file_name().is_some() {
                    result.pop();
                } else if !result.has_root() {
                    result.push(component);
                }
            }
            other => result.push(other),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn maps_host_and_segments() {
        let endpoint = Endpoint::parse("git.corp/teamx/widget").unwrap();
        assert_eq!(
            to_local_path(Path::new("/src"), &endpoint).unwrap(),
            PathBuf::from("/src/git.corp/teamx/widget")
        );
    }

    #[test]
    fn schemes_share_a_directory() {
        let root = Path::new("/src");
        let https = Endpoint::parse("https://github.com/org/repo").unwrap();
        let ssh = Endpoint::parse("git@github.com:org/repo.git").unwrap();
        assert_eq!(
            to_local_path(root, &https).unwrap(),
            to_local_path(root, &ssh).unwrap()
        );
    }

    #[test]
    fn port_is_part_of_the_host_directory() {
        let endpoint = Endpoint::parse("ssh://git@example.com:2222/org/repo").unwrap();
        assert_eq!(
            to_local_path(Path::new("/src"), &endpoint).unwrap(),
            PathBuf::from("/src/example.com:2222/org/repo")
        );
    }

    #[test]
    fn rejects_traversal() {
        let endpoint = Endpoint::parse("https://example.com/org/../../etc").unwrap();
        assert_eq!(
            to_local_path(Path::new("/src"), &endpoint),
            Err(ParseError::UnsafePathSegment {
                segment: "..".to_owned(),
                endpoint: "example.com/org/../../etc".to_owned(),
            })
        );
    }

    #[test]
    fn go_layout() {
        let endpoint = Endpoint::parse("github.com/org/repo").unwrap();
        assert_eq!(
            go_path(Path::new("/home/me/go"), &endpoint).unwrap(),
            PathBuf::from("/home/me/go/src/github.com/org/repo")
        );
    }

    #[test]
    fn normalize_lexically() {
        assert_eq!(
            normalize(Path::new("/src/./a/../b/")),
            PathBuf::from("/src/b")
        );
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_-]{1,6}(\\.[a-z]{1,3})?"
    }

    proptest! {
        #[test]
        fn distinct_locations_never_collide(
            host_a in "[a-z]{1,6}\\.[a-z]{2,3}",
            host_b in "[a-z]{1,6}\\.[a-z]{2,3}",
            port_a in proptest::option::of(1u16..),
            port_b in proptest::option::of(1u16..),
            segments_a in proptest::collection::vec(segment(), 1..4),
            segments_b in proptest::collection::vec(segment(), 1..4),
        ) {
            let a = Endpoint { scheme: None, user: None, host: host_a, port: port_a, segments: segments_a };
            let b = Endpoint { scheme: None, user: None, host: host_b, port: port_b, segments: segments_b };
            let root = Path::new("/src");
            let same_location = a.host == b.host && a.port == b.port && a.segments == b.segments;
            prop_assert_eq!(
                to_local_path(root, &a).unwrap() == to_local_path(root, &b).unwrap(),
                same_location
            );
        }
    }
}
