//! # reqfile-core
//!
//! Core types shared across all reqfile crates.
//!
//! This crate provides:
//! - `PackageName` with normalized comparison
//! - PEP 440 `Version` and `VersionSpecifiers` types
//! - Environment markers and the `MarkerEnvironment` they are evaluated against
//! - `Requirement`, the parsed form of a single dependency declaration
//! - `ReqError` enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Requirement, MarkerTree, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Helpers shared by the manifest reader and resolver

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{ReqError, ReqResult};
pub use types::{
    Marker, MarkerEnvironment, MarkerTree, PackageName, Requirement, Version, VersionOrUrl,
    VersionSpecifier, VersionSpecifiers,
};
