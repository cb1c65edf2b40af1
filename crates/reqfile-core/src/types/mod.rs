//! Core data types for requirements manifests.
//!
//! This module provides the fundamental types used throughout reqfile:
//! - Package names with PEP 503 normalization
//! - PEP 440 versions and version specifiers
//! - Environment markers and marker environments
//! - Requirement declarations

pub mod environment;
pub mod marker;
pub mod name;
pub mod requirement;
pub mod specifier;
pub mod version;

// Re-export all public types
pub use environment::{MarkerEnvironment, MarkerVariable};
pub use marker::{Marker, MarkerOperator, MarkerTree, MarkerValue};
pub use name::PackageName;
pub use requirement::{Requirement, VersionOrUrl};
pub use specifier::{SpecifierOp, VersionSpecifier, VersionSpecifiers};
pub use version::{LocalSegment, PreRelease, PreReleaseKind, Version};
