use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::error::VenvError;

/// Which interpreter a new environment should be built on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PythonRequest {
    /// A bare version such as `3.11`.
    Version(String),
    /// An executable name (`python3.12`) or a path to one.
    Executable(String),
}

impl PythonRequest {
    /// Interpret a version string as a request for the matching `pythonX.Y`
    /// executable.
    #[must_use]
    pub fn from_version(version: &str) -> Self {
        Self::Version(version.trim().trim_start_matches("python").to_string())
    }

    /// Name of the executable to look up on the search path.
    #[must_use]
    pub fn executable_name(&self) -> String {
        match self {
            Self::Version(version) => format!("python{version}"),
            Self::Executable(name) => name.clone(),
        }
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Version(version) => Some(version),
            Self::Executable(_) => None,
        }
    }
}

impl FromStr for PythonRequest {
    type Err = VenvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VenvError::parse("python request", "empty string"));
        }
        if is_version_like(s) {
            Ok(Self::Version(s.to_string()))
        } else {
            Ok(Self::Executable(s.to_string()))
        }
    }
}

impl fmt::Display for PythonRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(version) => write!(f, "{version}"),
            Self::Executable(name) => write!(f, "{name}"),
        }
    }
}

fn is_version_like(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// How a seed package (pip, setuptools, wheel) is provisioned in a new
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageSpec {
    /// Whatever the backend tool does by default.
    #[default]
    Default,
    Omit,
    /// A version, or one of the keywords `latest` / `bundle`.
    Version(String),
}

impl PackageSpec {
    /// The virtualenv-style command line flag for this spec, if any.
    #[must_use]
    pub fn flag(&self, package: &str) -> Option<String> {
        match self {
            Self::Default => None,
            Self::Omit => Some(format!("--no-{package}")),
            Self::Version(version) => Some(format!("--{package}={version}")),
        }
    }

    /// A pip requirement installing this spec, if it asks for anything
    /// beyond the default.
    #[must_use]
    pub fn requirement(&self, package: &str) -> Option<String> {
        match self {
            Self::Default | Self::Omit => None,
            Self::Version(version) if version == "latest" || version == "bundle" => {
                Some(package.to_string())
            }
            Self::Version(version) => Some(format!("{package}=={version}")),
        }
    }
}

impl FromStr for PackageSpec {
    type Err = VenvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(VenvError::parse("package spec", "empty string")),
            "default" | "yes" | "true" => Ok(Self::Default),
            "no" | "none" | "false" | "omit" => Ok(Self::Omit),
            _ => Ok(Self::Version(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeOptions {
    pub python: Option<PythonRequest>,
    pub project_path: Option<PathBuf>,
    pub packages: Vec<String>,
    pub requirements_file: Option<PathBuf>,
    pub system_site_packages: bool,
    pub pip: PackageSpec,
    pub setuptools: PackageSpec,
    pub wheel: PackageSpec,
}

impl MakeOptions {
    #[must_use]
    pub fn with_python(mut self, python: PythonRequest) -> Self {
        self.python = Some(python);
        self
    }

    #[must_use]
    pub fn with_python_version(self, version: Option<&str>) -> Self {
        match version {
            Some(version) => self.with_python(PythonRequest::from_version(version)),
            None => self,
        }
    }

    /// Seed package flags shared by virtualenv-style creation commands.
    #[must_use]
    pub fn seed_package_flags(&self) -> Vec<String> {
        [
            ("pip", &self.pip),
            ("setuptools", &self.setuptools),
            ("wheel", &self.wheel),
        ]
        .into_iter()
        .filter_map(|(package, spec)| spec.flag(package))
        .collect()
    }
}

/// Reject names that are not a single plain path component before any
/// backend is asked about them: empty names, `.`, `..`, absolute paths and
/// anything containing a separator.
pub fn validate_name(name: &str) -> Result<(), VenvError> {
    let mut components = Path::new(name).components();
    let single_component = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if name.trim().is_empty() || !single_component || name.contains(['/', '\\']) {
        return Err(VenvError::InvalidName);
    }
    Ok(())
}

/// Compare dot separated versions on the components they have in common, so
/// `3.8.2` is compatible with a requirement of `3.8`.
#[must_use]
pub fn compatible_versions(actual: &str, required: &str) -> bool {
    actual
        .split('.')
        .zip(required.split('.'))
        .all(|(actual, required)| actual == required)
}

/// Extract the version from `python --version` output such as
/// `Python 3.11.4`.
pub fn parse_python_version_output(output: &str) -> Result<String, VenvError> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.split_whitespace().last())
        .map(str::to_string)
        .ok_or_else(|| VenvError::parse("python version output", output.trim()))
}

/// Read a key from the `pyvenv.cfg` file at the root of an environment.
///
/// Returns `None` if the file or the key does not exist.
#[must_use]
pub fn read_pyvenv_config(env_dir: &Path, key: &str) -> Option<String> {
    let content = std::fs::read_to_string(env_dir.join("pyvenv.cfg")).ok()?;
    content.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().to_string())
    })
}
