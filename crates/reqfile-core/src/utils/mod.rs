//! Utility functions and helpers.
//!
//! Common functionality used by the manifest reader and the resolver.

pub mod expand;
pub mod path;

// Re-export commonly used utilities
pub use expand::expand_env_vars;
pub use path::{normalize_path, resolve_target, IncludeTarget};
