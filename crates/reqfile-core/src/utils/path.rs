//! Path utilities for include targets.
//!
//! Include targets are written relative to the manifest that names them, so
//! they are joined onto that manifest's directory and normalized lexically.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Where an include directive points
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeTarget {
    Path(Utf8PathBuf),
    Url(Url),
}

impl fmt::Display for IncludeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeTarget::Path(path) => write!(f, "{}", path),
            IncludeTarget::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut components: Vec<Utf8Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {},
            Utf8Component::ParentDir => match components.last().copied() {
                Some(Utf8Component::Normal(_)) => {
                    components.pop();
                },
                // ".." directly under the root stays at the root
                Some(Utf8Component::RootDir) | Some(Utf8Component::Prefix(_)) => {},
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }

    if components.is_empty() {
        return Utf8PathBuf::from(".");
    }
    components.iter().collect()
}

/// Check whether a target is written as a URL rather than a path
pub fn is_url(target: &str) -> bool {
    match target.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        },
        None => false,
    }
}

/// Resolve `target` as named inside the manifest at `manifest`
pub fn resolve_target(manifest: &Utf8Path, target: &str) -> IncludeTarget {
    if is_url(target) {
        if let Ok(url) = Url::parse(target) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    if let Ok(path) = Utf8PathBuf::from_path_buf(path) {
                        return IncludeTarget::Path(normalize_path(&path));
                    }
                }
            }
            return IncludeTarget::Url(url);
        }
    }

    let target = Utf8Path::new(target);
    if target.is_absolute() {
        return IncludeTarget::Path(normalize_path(target));
    }

    let base = manifest.parent().unwrap_or_else(|| Utf8Path::new(""));
    IncludeTarget::Path(normalize_path(&base.join(target)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Utf8Path::new("./requirements/../base/./required.txt")),
            Utf8Path::new("base/required.txt")
        );
        assert_eq!(
            normalize_path(Utf8Path::new("../shared/base.txt")),
            Utf8Path::new("../shared/base.txt")
        );
        assert_eq!(normalize_path(Utf8Path::new("/../etc")), Utf8Path::new("/etc"));
        assert_eq!(normalize_path(Utf8Path::new("./")), Utf8Path::new("."));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/requirements.txt"));
        assert!(is_url("git+https://example.com/repo.git"));
        assert!(!is_url("required.txt"));
        assert!(!is_url("C:\\requirements.txt"));
        assert!(!is_url("://nothing"));
    }

    #[test]
    fn test_resolve_relative_to_manifest() {
        let target = resolve_target(Utf8Path::new("requirements/optional.txt"), "required.txt");
        assert_eq!(target, IncludeTarget::Path("requirements/required.txt".into()));

        let target = resolve_target(Utf8Path::new("requirements/dev.txt"), "../base.txt");
        assert_eq!(target, IncludeTarget::Path("base.txt".into()));

        let target = resolve_target(Utf8Path::new("optional.txt"), "required.txt");
        assert_eq!(target, IncludeTarget::Path("required.txt".into()));
    }

    #[test]
    fn test_resolve_absolute_and_urls() {
        let target = resolve_target(Utf8Path::new("a/b.txt"), "/srv/base.txt");
        assert_eq!(target, IncludeTarget::Path("/srv/base.txt".into()));

        let target = resolve_target(Utf8Path::new("a/b.txt"), "https://example.com/r.txt");
        assert!(matches!(target, IncludeTarget::Url(_)));
        assert_eq!(target.to_string(), "https://example.com/r.txt");
    }
}
