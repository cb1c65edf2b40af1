//! Package names.
//!
//! Names keep the spelling used in the manifest for display, but compare and
//! hash by their normalized form (lowercase, runs of `-_.` collapsed to `-`).

use crate::error::{ReqError, ReqResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Package name as written in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName {
    original: String,
    normalized: String,
}

impl PackageName {
    /// Parse and validate a package name
    pub fn new(name: &str) -> ReqResult<Self> {
        if !is_valid_name(name) {
            return Err(ReqError::InvalidRequirement {
                input: name.to_string(),
                reason: "package names must start and end with a letter or digit and may only contain letters, digits, '.', '-' and '_'".to_string(),
            });
        }

        Ok(Self {
            original: name.to_string(),
            normalized: normalize(name),
        })
    }

    /// The name exactly as written
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// The normalized form used for comparisons
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Normalize a name: lowercase with every run of `-`, `_` or `.` replaced by `-`
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }

    out
}

/// Check whether `name` is a valid distribution name
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl FromStr for PackageName {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PackageName {
    type Error = ReqError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.original
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize("python-Levenshtein"), "python-levenshtein");
        assert_eq!(normalize("backports.csv"), "backports-csv");
        assert_eq!(normalize("Foo__Bar-.baz"), "foo-bar-baz");
    }

    #[test]
    fn test_equality_uses_normalized_form() {
        let a = PackageName::new("backports.csv").unwrap();
        let b = PackageName::new("Backports_CSV").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "backports.csv");
        assert_eq!(b.to_string(), "Backports_CSV");
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("lxml"));
        assert!(is_valid_name("pycountry"));
        assert!(is_valid_name("backports.csv"));
        assert!(is_valid_name("a"));

        assert!(!is_valid_name(""));
        assert!(!is_valid_name("-lxml"));
        assert!(!is_valid_name("lxml."));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("bad@name"));
    }
}
