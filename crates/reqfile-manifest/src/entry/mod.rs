//! Manifest entries.
//!
//! A manifest is an ordered list of entries. Only [`Entry::Requirement`]
//! declares a package; the other variants steer how a manifest is combined
//! with others or how an installer would fetch packages.

use camino::{Utf8Path, Utf8PathBuf};
use reqfile_core::types::Requirement;
use reqfile_core::utils::IncludeTarget;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Path the manifest was read from
    pub path: Utf8PathBuf,
    /// Entries in file order
    pub entries: Vec<Entry>,
}

/// One logical line's worth of meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entry {
    Requirement(Declaration),
    Include(Include),
    Editable(Editable),
    Option(OptionEntry),
}

/// A package declaration with its manifest context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub requirement: Requirement,
    /// `--hash` values as `algorithm:digest`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<String>,
    /// Trailing comment, or the comment block directly above
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub source: Utf8PathBuf,
    pub line: usize,
}

/// `-r` / `-c` directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Include {
    pub kind: IncludeKind,
    /// Target as written
    pub raw: String,
    /// Target resolved against the including manifest
    pub target: IncludeTarget,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    /// `-r`: the target's declarations become part of this manifest
    Requirements,
    /// `-c`: the target's declarations only restrict versions
    Constraints,
}

/// `-e` directive: a local path or VCS URL installed in development mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Editable {
    pub target: String,
    pub line: usize,
}

/// Installer option with the line it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub option: GlobalOption,
    pub line: usize,
}

/// Installer options that apply to the whole resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "option", content = "value", rename_all = "kebab-case")]
pub enum GlobalOption {
    IndexUrl(String),
    ExtraIndexUrl(String),
    NoIndex,
    FindLinks(String),
    Pre,
    TrustedHost(String),
    PreferBinary,
    OnlyBinary(String),
    NoBinary(String),
}

impl Manifest {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Requirement(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn includes(&self) -> impl Iterator<Item = &Include> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Include(include) => Some(include),
            _ => None,
        })
    }

    pub fn editables(&self) -> impl Iterator<Item = &Editable> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Editable(editable) => Some(editable),
            _ => None,
        })
    }

    pub fn options(&self) -> impl Iterator<Item = &GlobalOption> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Option(opt) => Some(&opt.option),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render back to manifest text, one entry per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}

impl Entry {
    /// Source line of the entry
    pub fn line(&self) -> usize {
        match self {
            Entry::Requirement(decl) => decl.line,
            Entry::Include(include) => include.line,
            Entry::Editable(editable) => editable.line,
            Entry::Option(opt) => opt.line,
        }
    }
}

impl Declaration {
    pub fn name(&self) -> &str {
        self.requirement.name.as_str()
    }

    /// `path:line` used in diagnostics
    pub fn origin(&self) -> String {
        format!("{}:{}", self.source, self.line)
    }
}

impl IncludeKind {
    pub fn flag(&self) -> &'static str {
        match self {
            IncludeKind::Requirements => "-r",
            IncludeKind::Constraints => "-c",
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Requirement(decl) => write!(f, "{}", decl),
            Entry::Include(include) => write!(f, "{} {}", include.kind.flag(), include.raw),
            Entry::Editable(editable) => write!(f, "-e {}", editable.target),
            Entry::Option(opt) => write!(f, "{}", opt.option),
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.requirement)?;
        for hash in &self.hashes {
            write!(f, " --hash={}", hash)?;
        }
        if let Some(comment) = &self.comment {
            write!(f, "  # {}", comment)?;
        }
        Ok(())
    }
}

impl fmt::Display for GlobalOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalOption::IndexUrl(url) => write!(f, "--index-url {}", url),
            GlobalOption::ExtraIndexUrl(url) => write!(f, "--extra-index-url {}", url),
            GlobalOption::NoIndex => f.write_str("--no-index"),
            GlobalOption::FindLinks(location) => write!(f, "--find-links {}", location),
            GlobalOption::Pre => f.write_str("--pre"),
            GlobalOption::TrustedHost(host) => write!(f, "--trusted-host {}", host),
            GlobalOption::PreferBinary => f.write_str("--prefer-binary"),
            GlobalOption::OnlyBinary(packages) => write!(f, "--only-binary {}", packages),
            GlobalOption::NoBinary(packages) => write!(f, "--no-binary {}", packages),
        }
    }
}
