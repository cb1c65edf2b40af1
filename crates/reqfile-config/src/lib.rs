//! Configuration parsing for reqfile
//!
//! This crate handles parsing and validation of reqfile.toml files and
//! layers them with environment variables and command-line flags into the
//! settings a resolution runs with.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, Overrides, Settings};
pub use toml::{ReqfileToml, ResolveSection};

use reqfile_core::error::ReqError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ReqError>;
