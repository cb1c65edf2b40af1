//! Resolution engine for requirements manifests
//!
//! This crate follows `-r`/`-c` inclusions from a root manifest, evaluates
//! environment markers, merges installer options and detects conflicting
//! declarations of the same package.

pub mod conflict;
pub mod engine;
pub mod graph;
pub mod options;

// Re-export main types
pub use conflict::{detect_conflicts, Conflict};
pub use engine::{Excluded, Resolution, ResolveOptions, Resolver};
pub use graph::{IncludeEdge, InclusionGraph, ManifestNode};
pub use options::ResolvedOptions;

use reqfile_core::error::ReqError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ReqError>;
