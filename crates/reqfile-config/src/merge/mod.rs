//! Configuration layering, discovery, and environment overrides

use crate::toml::ReqfileToml;
use crate::ConfigResult;
use camino::{Utf8Path, Utf8PathBuf};
use reqfile_core::error::ReqError;
use reqfile_core::types::MarkerEnvironment;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Project configuration file name
pub const CONFIG_FILE: &str = "reqfile.toml";

/// Manifest resolved when none is given
pub const DEFAULT_MANIFEST: &str = "requirements.txt";

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "REQFILE_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project reqfile.toml
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// Values given on the command line; `None` and empty mean "not given"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub python_version: Option<String>,
    pub platform: Option<String>,
    pub extras: Vec<String>,
    pub allow_conflicts: bool,
    pub allow_prereleases: bool,
    /// Arbitrary `name=value` marker overrides
    pub environment: Vec<(String, String)>,
}

/// Fully merged settings for one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub environment: MarkerEnvironment,
    pub extras: Vec<String>,
    pub allow_conflicts: bool,
    pub allow_prereleases: bool,
    pub default_manifest: String,
    /// Layers that contributed, lowest first
    pub sources: Vec<ConfigSource>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: MarkerEnvironment::default(),
            extras: Vec::new(),
            allow_conflicts: false,
            allow_prereleases: false,
            default_manifest: DEFAULT_MANIFEST.to_string(),
            sources: Vec::new(),
        }
    }
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Find a configuration file in the project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());
        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }
        None
    }

    /// Load the nearest reqfile.toml, if there is one
    pub async fn load_project_config(&self) -> ConfigResult<Option<(ReqfileToml, ConfigSource)>> {
        match self.resolve_config_path(CONFIG_FILE) {
            Some(path) => {
                debug!(path = %path, "loading project config");
                let config = crate::toml::load_from_file(&path).await?;
                Ok(Some((config, ConfigSource::Project(path))))
            },
            None => Ok(None),
        }
    }

    /// Load an explicitly named config file; it must exist
    pub async fn load_explicit_config(&self, path: &Utf8Path) -> ConfigResult<(ReqfileToml, ConfigSource)> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        };
        let config = crate::toml::load_from_file(&path).await?;
        Ok((config, ConfigSource::Project(path)))
    }

    /// Path of the global config file
    pub fn global_config_path() -> ConfigResult<Utf8PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| ReqError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;

        let home_dir = Utf8PathBuf::try_from(home_dir).map_err(|e| ReqError::ConfigValidation {
            field: "home_dir".to_string(),
            reason: format!("Invalid home directory path: {}", e),
        })?;

        Ok(home_dir.join(".reqfile").join("config.toml"))
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<(ReqfileToml, ConfigSource)>> {
        let global_config_path = match Self::global_config_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping global config: {}", e);
                return Ok(None);
            },
        };

        if global_config_path.is_file() {
            let config = crate::toml::load_from_file(&global_config_path).await?;
            Ok(Some((config, ConfigSource::Global(global_config_path))))
        } else {
            Ok(None)
        }
    }
}

/// Configuration layering and merging
#[derive(Debug, Default)]
pub struct ConfigLayering {
    /// Global configuration
    global_config: Option<(ReqfileToml, ConfigSource)>,
    /// Project configuration
    project_config: Option<(ReqfileToml, ConfigSource)>,
    /// Environment overrides
    env_overrides: HashMap<String, String>,
    /// CLI flag overrides
    cli_overrides: Overrides,
}

impl ConfigLayering {
    /// Create a new configuration layering system
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, global: Option<(ReqfileToml, ConfigSource)>) -> Self {
        self.global_config = global;
        self
    }

    pub fn with_project(mut self, project: Option<(ReqfileToml, ConfigSource)>) -> Self {
        self.project_config = project;
        self
    }

    pub fn with_env(mut self, env_overrides: HashMap<String, String>) -> Self {
        self.env_overrides = env_overrides;
        self
    }

    pub fn with_cli(mut self, cli_overrides: Overrides) -> Self {
        self.cli_overrides = cli_overrides;
        self
    }

    /// Merge all layers: defaults, global, project, environment, CLI
    pub fn merge(&self) -> ConfigResult<Settings> {
        let mut settings = Settings::default();

        for (config, source) in [&self.global_config, &self.project_config]
            .into_iter()
            .flatten()
        {
            Self::apply_file(&mut settings, config)?;
            settings.sources.push(source.clone());
        }

        Self::apply_env_overrides(&mut settings, &self.env_overrides)?;
        Self::apply_cli_overrides(&mut settings, &self.cli_overrides)?;

        debug!(
            python_version = %settings.environment.python_version,
            sys_platform = %settings.environment.sys_platform,
            extras = ?settings.extras,
            "merged configuration"
        );
        Ok(settings)
    }

    fn apply_file(settings: &mut Settings, config: &ReqfileToml) -> ConfigResult<()> {
        // sys_platform first so explicit os_name/platform_system still win
        if let Some(platform) = config.environment.get("sys_platform") {
            settings.environment = settings.environment.clone().with_platform(platform);
        }
        for (name, value) in &config.environment {
            if name != "sys_platform" {
                settings.environment.set(name, value.as_str())?;
            }
        }

        let resolve = &config.resolve;
        if !resolve.extras.is_empty() {
            settings.extras = resolve.extras.clone();
        }
        if let Some(allow) = resolve.allow_conflicts {
            settings.allow_conflicts = allow;
        }
        if let Some(allow) = resolve.allow_prereleases {
            settings.allow_prereleases = allow;
        }
        if let Some(manifest) = &resolve.default_manifest {
            settings.default_manifest = manifest.clone();
        }
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(settings: &mut Settings, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        // Sorted so REQFILE_SYS_PLATFORM is applied deterministically relative to the rest
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort_by_key(|key| (key.as_str() != "REQFILE_SYS_PLATFORM", key.as_str()));

        for key in keys {
            let value = &overrides[key];
            let invalid = |e: ReqError| ReqError::ConfigValidation {
                field: key.clone(),
                reason: e.to_string(),
            };
            match key.as_str() {
                "REQFILE_PYTHON_VERSION" => {
                    settings.environment.set_python_version(value).map_err(invalid)?;
                },
                "REQFILE_SYS_PLATFORM" => {
                    settings.environment = settings.environment.clone().with_platform(value);
                },
                "REQFILE_PLATFORM_SYSTEM" => {
                    settings.environment.platform_system = value.clone();
                },
                "REQFILE_EXTRAS" => {
                    settings.extras = split_list(value);
                },
                "REQFILE_ALLOW_CONFLICTS" => {
                    settings.allow_conflicts = parse_flag(key, value)?;
                },
                "REQFILE_ALLOW_PRERELEASES" => {
                    settings.allow_prereleases = parse_flag(key, value)?;
                },
                "REQFILE_DEFAULT_MANIFEST" => {
                    settings.default_manifest = value.clone();
                },
                _ => {
                    debug!(variable = %key, "ignoring unknown environment override");
                    continue;
                },
            }
            settings.sources.push(ConfigSource::Environment(key.clone()));
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(settings: &mut Settings, overrides: &Overrides) -> ConfigResult<()> {
        if *overrides == Overrides::default() {
            return Ok(());
        }

        if let Some(platform) = &overrides.platform {
            settings.environment = settings.environment.clone().with_platform(platform);
        }
        if let Some(version) = &overrides.python_version {
            settings
                .environment
                .set_python_version(version)
                .map_err(|e| ReqError::ConfigValidation {
                    field: "--python-version".to_string(),
                    reason: e.to_string(),
                })?;
        }
        for (name, value) in &overrides.environment {
            settings.environment.set(name, value.as_str())?;
        }
        if !overrides.extras.is_empty() {
            settings.extras = overrides.extras.clone();
        }
        // Flags can only switch behaviour on
        settings.allow_conflicts |= overrides.allow_conflicts;
        settings.allow_prereleases |= overrides.allow_prereleases;

        settings.sources.push(ConfigSource::CommandLine);
        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ReqError::ConfigValidation {
            field: key.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toml::parse_reqfile_toml;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn layer(toml: &str, path: &str) -> Option<(ReqfileToml, ConfigSource)> {
        Some((parse_reqfile_toml(toml).unwrap(), ConfigSource::Project(path.into())))
    }

    #[test]
    fn test_defaults() {
        let settings = ConfigLayering::new().merge().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.environment.python_version, "3.12");
        assert_eq!(settings.default_manifest, "requirements.txt");
    }

    #[tokio::test]
    async fn test_resolve_config_path_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let nested = root.join("requirements").join("dev");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILE), "[resolve]\nextras = [\"docs\"]\n").unwrap();

        let loader = ConfigLoader::new(nested);
        assert_eq!(loader.resolve_config_path(CONFIG_FILE), Some(root.join(CONFIG_FILE)));

        let (config, source) = loader.load_project_config().await.unwrap().unwrap();
        assert_eq!(config.resolve.extras, vec!["docs"]);
        assert_eq!(source, ConfigSource::Project(root.join(CONFIG_FILE)));
    }

    #[tokio::test]
    async fn test_no_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(utf8_dir(&temp_dir));
        assert!(loader.resolve_config_path("no-such-config.toml").is_none());
    }

    #[tokio::test]
    async fn test_explicit_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(utf8_dir(&temp_dir));
        let err = loader
            .load_explicit_config(Utf8Path::new("missing.toml"))
            .await
            .unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_project_overrides_global() {
        let global = Some((
            parse_reqfile_toml("[environment]\npython_version = \"3.8\"\n[resolve]\nextras = [\"docs\"]\n")
                .unwrap(),
            ConfigSource::Global("/home/user/.reqfile/config.toml".into()),
        ));
        let project = layer("[environment]\npython_version = \"2.7\"\n", "/work/reqfile.toml");

        let settings = ConfigLayering::new()
            .with_global(global)
            .with_project(project)
            .merge()
            .unwrap();

        assert_eq!(settings.environment.python_version, "2.7");
        assert_eq!(settings.environment.python_full_version, "2.7.0");
        // Not set by the project, so the global value stays
        assert_eq!(settings.extras, vec!["docs"]);
        assert_eq!(settings.sources.len(), 2);
    }

    #[test]
    fn test_platform_in_file_sets_related_variables() {
        let project = layer("[environment]\nsys_platform = \"win32\"\n", "reqfile.toml");
        let settings = ConfigLayering::new().with_project(project).merge().unwrap();

        assert_eq!(settings.environment.sys_platform, "win32");
        assert_eq!(settings.environment.os_name, "nt");
        assert_eq!(settings.environment.platform_system, "Windows");
    }

    #[test]
    fn test_env_overrides_project() {
        let project = layer(
            "[environment]\npython_version = \"3.8\"\n[resolve]\nallow_conflicts = true\n",
            "reqfile.toml",
        );
        let env = HashMap::from([
            ("REQFILE_PYTHON_VERSION".to_string(), "3.10".to_string()),
            ("REQFILE_SYS_PLATFORM".to_string(), "darwin".to_string()),
            ("REQFILE_PLATFORM_SYSTEM".to_string(), "Darwin-custom".to_string()),
            ("REQFILE_EXTRAS".to_string(), "docs, fuzzy,".to_string()),
            ("REQFILE_ALLOW_CONFLICTS".to_string(), "0".to_string()),
            ("REQFILE_UNRELATED".to_string(), "x".to_string()),
        ]);

        let settings = ConfigLayering::new()
            .with_project(project)
            .with_env(env)
            .merge()
            .unwrap();

        assert_eq!(settings.environment.python_version, "3.10");
        assert_eq!(settings.environment.sys_platform, "darwin");
        assert_eq!(settings.environment.platform_system, "Darwin-custom");
        assert_eq!(settings.extras, vec!["docs", "fuzzy"]);
        assert!(!settings.allow_conflicts);
        assert!(!settings
            .sources
            .contains(&ConfigSource::Environment("REQFILE_UNRELATED".to_string())));
    }

    #[test]
    fn test_invalid_env_values() {
        let env = HashMap::from([("REQFILE_ALLOW_CONFLICTS".to_string(), "maybe".to_string())]);
        let err = ConfigLayering::new().with_env(env).merge().unwrap_err();
        assert!(matches!(err, ReqError::ConfigValidation { ref field, .. } if field == "REQFILE_ALLOW_CONFLICTS"));

        let env = HashMap::from([("REQFILE_PYTHON_VERSION".to_string(), "latest".to_string())]);
        assert!(ConfigLayering::new().with_env(env).merge().is_err());
    }

    #[test]
    fn test_cli_overrides_everything() {
        let env = HashMap::from([
            ("REQFILE_PYTHON_VERSION".to_string(), "3.10".to_string()),
            ("REQFILE_EXTRAS".to_string(), "docs".to_string()),
        ]);
        let cli = Overrides {
            python_version: Some("2.7.18".to_string()),
            platform: Some("linux".to_string()),
            extras: vec!["fuzzy".to_string()],
            allow_conflicts: true,
            environment: vec![("platform_machine".to_string(), "aarch64".to_string())],
            ..Overrides::default()
        };

        let settings = ConfigLayering::new()
            .with_env(env)
            .with_cli(cli)
            .merge()
            .unwrap();

        assert_eq!(settings.environment.python_version, "2.7");
        assert_eq!(settings.environment.python_full_version, "2.7.18");
        assert_eq!(settings.environment.platform_machine, "aarch64");
        assert_eq!(settings.extras, vec!["fuzzy"]);
        assert!(settings.allow_conflicts);
        assert_eq!(settings.sources.last(), Some(&ConfigSource::CommandLine));
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("REQFILE_TEST_COLLECT", "1");
        let overrides = ConfigLayering::collect_env_overrides();
        assert_eq!(overrides.get("REQFILE_TEST_COLLECT").map(String::as_str), Some("1"));
        assert!(overrides.keys().all(|k| k.starts_with("REQFILE_")));
        std::env::remove_var("REQFILE_TEST_COLLECT");
    }
}
