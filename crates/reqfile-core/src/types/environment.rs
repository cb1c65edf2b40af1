//! Marker environment: the values environment markers are evaluated against.

use super::version::Version;
use crate::error::{ReqError, ReqResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Variables that may appear in an environment marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerVariable {
    PythonVersion,
    PythonFullVersion,
    OsName,
    SysPlatform,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PlatformMachine,
    PlatformPythonImplementation,
    ImplementationName,
    ImplementationVersion,
    Extra,
}

impl MarkerVariable {
    pub const ALL: [MarkerVariable; 12] = [
        MarkerVariable::PythonVersion,
        MarkerVariable::PythonFullVersion,
        MarkerVariable::OsName,
        MarkerVariable::SysPlatform,
        MarkerVariable::PlatformRelease,
        MarkerVariable::PlatformSystem,
        MarkerVariable::PlatformVersion,
        MarkerVariable::PlatformMachine,
        MarkerVariable::PlatformPythonImplementation,
        MarkerVariable::ImplementationName,
        MarkerVariable::ImplementationVersion,
        MarkerVariable::Extra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerVariable::PythonVersion => "python_version",
            MarkerVariable::PythonFullVersion => "python_full_version",
            MarkerVariable::OsName => "os_name",
            MarkerVariable::SysPlatform => "sys_platform",
            MarkerVariable::PlatformRelease => "platform_release",
            MarkerVariable::PlatformSystem => "platform_system",
            MarkerVariable::PlatformVersion => "platform_version",
            MarkerVariable::PlatformMachine => "platform_machine",
            MarkerVariable::PlatformPythonImplementation => "platform_python_implementation",
            MarkerVariable::ImplementationName => "implementation_name",
            MarkerVariable::ImplementationVersion => "implementation_version",
            MarkerVariable::Extra => "extra",
        }
    }

    /// Legacy dotted spellings still accepted by installers
    fn from_legacy(name: &str) -> Option<Self> {
        match name {
            "os.name" => Some(MarkerVariable::OsName),
            "sys.platform" => Some(MarkerVariable::SysPlatform),
            "platform.version" => Some(MarkerVariable::PlatformVersion),
            "platform.machine" => Some(MarkerVariable::PlatformMachine),
            "platform.python_implementation" | "python_implementation" => {
                Some(MarkerVariable::PlatformPythonImplementation)
            },
            _ => None,
        }
    }
}

impl FromStr for MarkerVariable {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MarkerVariable::ALL
            .iter()
            .find(|var| var.as_str() == s)
            .copied()
            .or_else(|| MarkerVariable::from_legacy(s))
            .ok_or_else(|| ReqError::InvalidMarker {
                input: s.to_string(),
                reason: "unknown marker variable".to_string(),
            })
    }
}

impl fmt::Display for MarkerVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values for every marker variable except `extra`, which is supplied per evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerEnvironment {
    pub python_version: String,
    pub python_full_version: String,
    pub os_name: String,
    pub sys_platform: String,
    pub platform_release: String,
    pub platform_system: String,
    pub platform_version: String,
    pub platform_machine: String,
    pub platform_python_implementation: String,
    pub implementation_name: String,
    pub implementation_version: String,
}

impl Default for MarkerEnvironment {
    /// CPython 3.12 on 64-bit Linux
    fn default() -> Self {
        Self {
            python_version: "3.12".to_string(),
            python_full_version: "3.12.0".to_string(),
            os_name: "posix".to_string(),
            sys_platform: "linux".to_string(),
            platform_release: String::new(),
            platform_system: "Linux".to_string(),
            platform_version: String::new(),
            platform_machine: "x86_64".to_string(),
            platform_python_implementation: "CPython".to_string(),
            implementation_name: "cpython".to_string(),
            implementation_version: "3.12.0".to_string(),
        }
    }
}

impl MarkerEnvironment {
    /// Value of `var`; `extra` has no environment-wide value
    pub fn get(&self, var: MarkerVariable) -> Option<&str> {
        let value = match var {
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformPythonImplementation => &self.platform_python_implementation,
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
            MarkerVariable::Extra => return None,
        };
        Some(value)
    }

    /// Set a variable by its marker name
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> ReqResult<()> {
        let var: MarkerVariable = name.parse()?;
        let value = value.into();
        match var {
            MarkerVariable::PythonVersion => self.set_python_version(&value)?,
            MarkerVariable::PythonFullVersion => self.set_python_version(&value)?,
            MarkerVariable::OsName => self.os_name = value,
            MarkerVariable::SysPlatform => self.sys_platform = value,
            MarkerVariable::PlatformRelease => self.platform_release = value,
            MarkerVariable::PlatformSystem => self.platform_system = value,
            MarkerVariable::PlatformVersion => self.platform_version = value,
            MarkerVariable::PlatformMachine => self.platform_machine = value,
            MarkerVariable::PlatformPythonImplementation => {
                self.platform_python_implementation = value
            },
            MarkerVariable::ImplementationName => self.implementation_name = value,
            MarkerVariable::ImplementationVersion => self.implementation_version = value,
            MarkerVariable::Extra => {
                return Err(ReqError::ConfigValidation {
                    field: name.to_string(),
                    reason: "'extra' is chosen per resolution, not set on the environment".to_string(),
                })
            },
        }
        Ok(())
    }

    /// Set `python_version` and `python_full_version` from either spelling.
    ///
    /// "3.11" sets full version "3.11.0"; "3.11.4" sets python_version "3.11".
    pub fn set_python_version(&mut self, value: &str) -> ReqResult<()> {
        let version = Version::parse(value)?;
        let major = version.release.first().copied().unwrap_or(0);
        let minor = version.release.get(1).copied().unwrap_or(0);

        self.python_version = format!("{}.{}", major, minor);
        self.python_full_version = if version.release.len() >= 3 {
            value.trim().to_string()
        } else {
            format!("{}.{}.0", major, minor)
        };
        if self.implementation_name == "cpython" {
            self.implementation_version = self.python_full_version.clone();
        }
        Ok(())
    }

    /// Environment for a given platform identifier (`linux`, `darwin`, `win32`)
    pub fn with_platform(mut self, sys_platform: &str) -> Self {
        let (os_name, system) = match sys_platform {
            "win32" => ("nt", "Windows"),
            "cygwin" => ("posix", "CYGWIN_NT"),
            "darwin" => ("posix", "Darwin"),
            p if p.starts_with("freebsd") => ("posix", "FreeBSD"),
            _ => ("posix", "Linux"),
        };
        self.sys_platform = sys_platform.to_string();
        self.os_name = os_name.to_string();
        self.platform_system = system.to_string();
        self
    }
}
