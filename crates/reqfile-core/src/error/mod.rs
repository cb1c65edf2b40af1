//! Error types and result aliases for reqfile operations.
//!
//! Provides a unified error type that covers every failure a manifest can
//! produce, from a malformed line to an include cycle, with actionable
//! error messages.

use thiserror::Error;

/// Unified error type for all reqfile operations
#[derive(Error, Debug)]
pub enum ReqError {
    // Manifest errors
    #[error("Failed to parse {path}: {message} at line {line}")]
    ManifestParse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Invalid requirement '{input}': {reason}")]
    InvalidRequirement { input: String, reason: String },

    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Invalid version specifier '{input}': {reason}")]
    InvalidSpecifier { input: String, reason: String },

    #[error("Invalid marker '{input}': {reason}")]
    InvalidMarker { input: String, reason: String },

    #[error("Cannot evaluate marker '{marker}': {reason}")]
    MarkerEvaluation { marker: String, reason: String },

    // Resolution errors
    #[error("Include cycle detected: {cycle}")]
    IncludeCycle { cycle: String },

    #[error("Unsupported include target '{target}' in {path}: {reason}")]
    UnsupportedInclude {
        path: String,
        target: String,
        reason: String,
    },

    #[error("Conflicting requirements for '{package}': {first} ({first_origin}) and {second} ({second_origin})")]
    Conflict {
        package: String,
        first: String,
        first_origin: String,
        second: String,
        second_origin: String,
    },

    // Config errors
    #[error("Failed to parse reqfile.toml: {message}")]
    ConfigParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for reqfile operations
pub type ReqResult<T> = Result<T, ReqError>;

impl ReqError {
    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a manifest parse error for a source line
    pub fn parse(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::ManifestParse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Check if this error came from reading or writing files
    pub fn is_io(&self) -> bool {
        matches!(self, ReqError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ReqError::ManifestParse { .. } | ReqError::InvalidRequirement { .. } => {
                Some("Each line must be a requirement like 'name>=1.0; marker' or an option like '-r other.txt'")
            },
            ReqError::InvalidVersion { .. } | ReqError::InvalidSpecifier { .. } => {
                Some("Versions follow PEP 440, for example '1.2', '2.0rc1' or '1.0.post2'")
            },
            ReqError::InvalidMarker { .. } | ReqError::MarkerEvaluation { .. } => {
                Some("Markers compare a variable to a quoted string, e.g. python_version < '3.0'")
            },
            ReqError::IncludeCycle { .. } => {
                Some("Remove one of the -r/-c lines so the manifests no longer include each other")
            },
            ReqError::UnsupportedInclude { .. } => {
                Some("Download the remote manifest and include it by path instead")
            },
            ReqError::Conflict { .. } => {
                Some("Align the pins or pass --allow-conflicts to keep the first declaration")
            },
            ReqError::ConfigParse { .. } | ReqError::ConfigValidation { .. } => {
                Some("Check reqfile.toml and REQFILE_* environment variables")
            },
            ReqError::Io { .. } => None,
        }
    }
}
