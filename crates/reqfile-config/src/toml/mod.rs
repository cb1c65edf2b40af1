//! reqfile.toml configuration parsing

use crate::ConfigResult;
use indexmap::IndexMap;
use reqfile_core::error::ReqError;
use reqfile_core::types::{MarkerEnvironment, MarkerVariable};
use serde::{Deserialize, Serialize};

/// Complete reqfile.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReqfileToml {
    /// Marker variable overrides, keyed by marker name
    #[serde(default)]
    pub environment: IndexMap<String, String>,

    /// Resolution settings
    #[serde(default)]
    pub resolve: ResolveSection,
}

/// `[resolve]` section; unset keys fall through to lower layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveSection {
    /// Extras requested for `extra == "..."` markers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_conflicts: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_prereleases: Option<bool>,

    /// Manifest used when no file is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_manifest: Option<String>,
}

/// Parse TOML string to a ReqfileToml configuration
pub fn parse_reqfile_toml(content: &str) -> ConfigResult<ReqfileToml> {
    let config: ReqfileToml = toml::from_str(content).map_err(|e| ReqError::ConfigParse {
        message: e.to_string(),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize a ReqfileToml back to TOML text
pub fn serialize_reqfile_toml(config: &ReqfileToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| ReqError::ConfigParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Validate configuration values
pub fn validate_config(config: &ReqfileToml) -> ConfigResult<()> {
    // Applying the overrides to a scratch environment checks names and values
    let mut scratch = MarkerEnvironment::default();
    for (name, value) in &config.environment {
        let var: MarkerVariable = name.parse().map_err(|_| ReqError::ConfigValidation {
            field: format!("environment.{}", name),
            reason: "not a marker variable".to_string(),
        })?;
        scratch.set(var.as_str(), value.as_str()).map_err(|e| ReqError::ConfigValidation {
            field: format!("environment.{}", name),
            reason: e.to_string(),
        })?;
    }

    for extra in &config.resolve.extras {
        if !reqfile_core::types::name::is_valid_name(extra) {
            return Err(ReqError::ConfigValidation {
                field: "resolve.extras".to_string(),
                reason: format!("'{}' is not a valid extra name", extra),
            });
        }
    }

    if let Some(manifest) = &config.resolve.default_manifest {
        if manifest.trim().is_empty() {
            return Err(ReqError::ConfigValidation {
                field: "resolve.default_manifest".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Load and parse reqfile.toml from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<ReqfileToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ReqError::io(format!("Failed to read {}", path), e))?;

    parse_reqfile_toml(&content).map_err(|e| match e {
        ReqError::ConfigParse { message } => ReqError::ConfigParse {
            message: format!("In file {}: {}", path, message),
        },
        ReqError::ConfigValidation { field, reason } => ReqError::ConfigValidation {
            field,
            reason: format!("{} (in {})", reason, path),
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_reqfile_toml("").unwrap();
        assert_eq!(config, ReqfileToml::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[environment]
python_version = "2.7"
sys_platform = "win32"

[resolve]
extras = ["fuzzy"]
allow_conflicts = true
default_manifest = "requirements/optional.txt"
"#;

        let config = parse_reqfile_toml(toml).unwrap();
        assert_eq!(config.environment.get("python_version").map(String::as_str), Some("2.7"));
        assert_eq!(config.environment.keys().collect::<Vec<_>>(), vec!["python_version", "sys_platform"]);
        assert_eq!(config.resolve.extras, vec!["fuzzy"]);
        assert_eq!(config.resolve.allow_conflicts, Some(true));
        assert_eq!(config.resolve.allow_prereleases, None);
        assert_eq!(
            config.resolve.default_manifest.as_deref(),
            Some("requirements/optional.txt")
        );
    }

    #[test]
    fn test_partial_resolve_section() {
        let config = parse_reqfile_toml("[resolve]\nallow_prereleases = true\n").unwrap();
        assert_eq!(config.resolve.allow_prereleases, Some(true));
        assert!(config.resolve.extras.is_empty());
        assert!(config.environment.is_empty());
    }

    #[test]
    fn test_unknown_marker_variable() {
        let err = parse_reqfile_toml("[environment]\npython_verison = \"3.8\"\n").unwrap_err();
        assert!(matches!(err, ReqError::ConfigValidation { ref field, .. } if field == "environment.python_verison"));
    }

    #[test]
    fn test_invalid_python_version() {
        assert!(parse_reqfile_toml("[environment]\npython_version = \"three\"\n").is_err());
        assert!(parse_reqfile_toml("[environment]\nextra = \"docs\"\n").is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(
            parse_reqfile_toml("[resolve]\nallow_everything = true\n"),
            Err(ReqError::ConfigParse { .. })
        ));
        assert!(parse_reqfile_toml("[package]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn test_invalid_extra() {
        assert!(parse_reqfile_toml("[resolve]\nextras = [\"-bad\"]\n").is_err());
        assert!(parse_reqfile_toml("[resolve]\ndefault_manifest = \" \"\n").is_err());
    }

    #[test]
    fn test_round_trip_serialization() {
        let toml = r#"
[environment]
python_version = "3.8"

[resolve]
extras = ["docs"]
allow_prereleases = false
"#;

        let config = parse_reqfile_toml(toml).unwrap();
        let serialized = serialize_reqfile_toml(&config).unwrap();
        let reparsed = parse_reqfile_toml(&serialized).unwrap();

        assert_eq!(config, reparsed);
    }
}
