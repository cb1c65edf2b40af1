//! Error message formatting with actionable suggestions.

use super::colors::ColorSupport;
use reqfile_core::error::ReqError;
use std::error::Error;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self {
            colors: ColorSupport::disabled(),
        }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &ReqError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }

    /// Format an error reaching `main`, using the rich form for `ReqError`
    pub fn format_report(&self, error: &anyhow::Error) -> String {
        if let Some(req_error) = error.downcast_ref::<ReqError>() {
            return self.format_error(req_error);
        }

        let mut output = self.format_simple(&error.to_string());
        for cause in error.chain().skip(1) {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&cause.to_string());
        }
        output
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    /// Format a warning message
    pub fn format_warning(&self, message: &str) -> String {
        format!("{}: {}", self.colors.yellow("warning"), message)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_with_help() {
        let error = ReqError::parse("optional.txt", 3, "unknown option '--frobnicate'");
        let formatted = ErrorFormatter::plain().format_error(&error);

        assert!(formatted.starts_with("error: Failed to parse optional.txt"));
        assert!(formatted.contains("at line 3"));
        assert!(formatted.contains("\nhelp: "));
    }

    #[test]
    fn test_format_error_with_cause() {
        let error = ReqError::io(
            "Failed to read required.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let formatted = ErrorFormatter::plain().format_error(&error);
        assert!(formatted.contains("caused by: no such file"));
    }

    #[test]
    fn test_format_report() {
        let formatter = ErrorFormatter::plain();

        let wrapped = anyhow::Error::new(ReqError::IncludeCycle {
            cycle: "a.txt -> b.txt -> a.txt".to_string(),
        });
        assert!(formatter.format_report(&wrapped).contains("a.txt -> b.txt -> a.txt"));

        let other = anyhow::anyhow!("Unknown command: resolv");
        assert_eq!(formatter.format_report(&other), "error: Unknown command: resolv");
        assert_eq!(formatter.format_warning("careful"), "warning: careful");
    }
}
