use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static ENV_VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("environment variable pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Build application paths for the current platform.
    ///
    /// # Errors
    /// Returns an error when the user data directory cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        Ok(Self {
            data_dir: dirs::data_dir()
                .ok_or(AppPathsError::DataDirUnavailable)?
                .join("venvman"),
        })
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("venvman.log")
    }
}

/// The directory virtualenvwrapper and friends use when `WORKON_HOME` is unset.
///
/// # Errors
/// Returns an error when the home directory cannot be determined.
pub fn default_venvs_dir() -> Result<PathBuf, AppPathsError> {
    dirs::home_dir()
        .map(|home| home.join(".virtualenvs"))
        .ok_or(AppPathsError::HomeDirUnavailable)
}

/// Expand `$VAR` and `${VAR}` references using `lookup`, then a leading `~`.
///
/// Unknown variables are left untouched.
pub fn expand<F>(raw: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = ENV_VAR_REGEX.replace_all(raw, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        lookup(name).unwrap_or_else(|| caps[0].to_string())
    });
    expand_tilde(&expanded)
}

fn expand_tilde(path: &str) -> String {
    let Some(home) = dirs::home_dir() else {
        return path.to_string();
    };
    if path == "~" {
        return home.to_string_lossy().into_owned();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest).to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}

/// Location of the interpreter inside a virtual environment.
#[must_use]
pub fn python_executable_path(env_dir: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        env_dir.join("Scripts").join("python.exe")
    }

    #[cfg(not(windows))]
    {
        env_dir.join("bin").join("python")
    }
}
