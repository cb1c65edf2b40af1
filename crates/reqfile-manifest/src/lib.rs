//! Reader for requirements manifests
//!
//! This crate turns the text of a pip-style requirements file into an ordered
//! list of entries: package declarations, `-r`/`-c` inclusions, editable
//! installs and installer options. It reads a single file; following
//! inclusions across files is the resolver's job.

pub mod entry;
pub mod lines;
pub mod loader;
pub mod parse;

// Re-export main types
pub use entry::{
    Declaration, Editable, Entry, GlobalOption, Include, IncludeKind, Manifest, OptionEntry,
};
pub use loader::{load_from_file, ManifestCache};
pub use parse::{parse_manifest, parse_manifest_with};

use reqfile_core::error::ReqError;

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ReqError>;
