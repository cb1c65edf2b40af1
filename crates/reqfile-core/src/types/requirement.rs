//! Requirement declarations (`name[extras] specifiers ; marker`).
//!
//! This is the package-declaration part of a manifest line only; installer
//! options such as `--hash` are split off by the manifest reader first.

use super::marker::Marker;
use super::name::PackageName;
use super::specifier::VersionSpecifiers;
use super::version::Version;
use super::environment::MarkerEnvironment;
use crate::error::{ReqError, ReqResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A single dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: PackageName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_or_url: Option<VersionOrUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

/// Either a version constraint or a direct reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionOrUrl {
    Specifiers(VersionSpecifiers),
    Url(Url),
}

impl Requirement {
    /// Parse a PEP 508 requirement string
    pub fn parse(input: &str) -> ReqResult<Self> {
        let text = input.trim();
        let invalid = |reason: &str| ReqError::InvalidRequirement {
            input: text.to_string(),
            reason: reason.to_string(),
        };

        let name_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(text.len());
        if name_len == 0 {
            return Err(invalid("expected a package name"));
        }
        let name = PackageName::new(&text[..name_len])?;
        let mut rest = text[name_len..].trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| invalid("missing ']' after extras"))?;
            for extra in after[..close].split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if !super::name::is_valid_name(extra) {
                    return Err(invalid(&format!("invalid extra name '{}'", extra)));
                }
                extras.push(extra.to_string());
            }
            rest = after[close + 1..].trim_start();
        }

        let (version_or_url, marker_text) = if let Some(after) = rest.strip_prefix('@') {
            let after = after.trim_start();
            let url_end = after.find(char::is_whitespace).unwrap_or(after.len());
            let url_text = &after[..url_end];
            if url_text.is_empty() {
                return Err(invalid("expected a URL after '@'"));
            }
            let url = Url::parse(url_text)
                .map_err(|e| invalid(&format!("invalid URL '{}': {}", url_text, e)))?;

            let tail = after[url_end..].trim();
            let marker_text = if tail.is_empty() {
                None
            } else {
                Some(
                    tail.strip_prefix(';')
                        .ok_or_else(|| invalid("expected ';' before the marker"))?,
                )
            };
            (Some(VersionOrUrl::Url(url)), marker_text)
        } else {
            let (spec_text, marker_text) = match rest.split_once(';') {
                Some((spec, marker)) => (spec, Some(marker)),
                None => (rest, None),
            };
            let spec_text = spec_text.trim();
            let spec_text = match spec_text.strip_prefix('(') {
                Some(inner) => inner
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("missing ')' after version specifiers"))?,
                None => spec_text,
            };

            let specifiers = VersionSpecifiers::parse(spec_text)?;
            let version_or_url = if specifiers.is_empty() {
                None
            } else {
                Some(VersionOrUrl::Specifiers(specifiers))
            };
            (version_or_url, marker_text)
        };

        let marker = match marker_text {
            Some(text) if text.trim().is_empty() => {
                return Err(invalid("expected a marker after ';'"));
            },
            Some(text) => Some(Marker::parse(text)?),
            None => None,
        };

        Ok(Self {
            name,
            extras,
            version_or_url,
            marker,
        })
    }

    /// Version constraint in written form (`==3.0.4`), if any
    pub fn constraint(&self) -> Option<String> {
        match &self.version_or_url {
            Some(VersionOrUrl::Specifiers(specs)) => Some(specs.to_string()),
            _ => None,
        }
    }

    pub fn specifiers(&self) -> Option<&VersionSpecifiers> {
        match &self.version_or_url {
            Some(VersionOrUrl::Specifiers(specs)) => Some(specs),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.version_or_url {
            Some(VersionOrUrl::Url(url)) => Some(url),
            _ => None,
        }
    }

    /// Environment condition exactly as written, if any
    pub fn condition(&self) -> Option<&str> {
        self.marker.as_ref().map(Marker::as_str)
    }

    /// Whether this declaration applies; no marker means it always applies
    pub fn applies_to(&self, env: &MarkerEnvironment, extras: &[String]) -> ReqResult<bool> {
        match &self.marker {
            Some(marker) => marker.evaluate(env, extras),
            None => Ok(true),
        }
    }

    /// Check a concrete version against the constraint; URLs accept nothing
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        match &self.version_or_url {
            Some(VersionOrUrl::Specifiers(specs)) => specs.contains(version),
            Some(VersionOrUrl::Url(_)) => false,
            None => true,
        }
    }
}

impl FromStr for Requirement {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        match &self.version_or_url {
            Some(VersionOrUrl::Specifiers(specs)) => write!(f, "{}", specs)?,
            Some(VersionOrUrl::Url(url)) => {
                write!(f, " @ {}", url)?;
                if self.marker.is_some() {
                    f.write_str(" ")?;
                }
            },
            None => {},
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}
