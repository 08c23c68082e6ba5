use log::debug;
use std::path::PathBuf;

use venvman_backend::VenvError;
use venvman_platform::{default_venvs_dir, expand};

pub const SHELL_VAR: &str = "VENV_MANAGEMENT_SHELL";
pub const INTERACTIVE_SHELL_VAR: &str = "VENV_MANAGEMENT_INTERACTIVE_SHELL";
pub const SETUP_FILEPATH_VAR: &str = "VENV_MANAGEMENT_SETUP_FILEPATH";
pub const USE_SETUP_VAR: &str = "VENV_MANAGEMENT_USE_SETUP";
pub const PREFERRED_DRIVERS_VAR: &str = "VENV_MANAGEMENT_PREFERRED_DRIVERS";
pub const EXCLUDED_DRIVERS_VAR: &str = "VENV_MANAGEMENT_EXCLUDED_DRIVERS";
pub const VENV_DIR_VAR: &str = "VENV_MANAGEMENT_VENV_DIR";
pub const WORKON_HOME_VAR: &str = "WORKON_HOME";
pub const LOGIN_SHELL_VAR: &str = "SHELL";

/// Configuration derived from the process environment.
///
/// Built once per operation (or once per manager) and passed down explicitly
/// so nothing below reads environment variables on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub shell: Option<String>,
    pub login_shell: Option<String>,
    pub interactive: bool,
    pub setup_file: Option<PathBuf>,
    pub use_setup: bool,
    pub preferred_drivers: Vec<String>,
    pub excluded_drivers: Vec<String>,
    pub venv_dir: Option<PathBuf>,
    pub workon_home: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell: None,
            login_shell: None,
            interactive: false,
            setup_file: None,
            use_setup: true,
            preferred_drivers: Vec::new(),
            excluded_drivers: Vec::new(),
            venv_dir: None,
            workon_home: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, VenvError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    ///
    /// Values are expanded (`$VAR`, `${VAR}`, leading `~`) against the same
    /// source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VenvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map(|value| expand(value.trim(), &lookup))
        };

        let settings = Self {
            shell: get(SHELL_VAR),
            login_shell: get(LOGIN_SHELL_VAR),
            interactive: get(INTERACTIVE_SHELL_VAR)
                .map(|value| parse_bool(INTERACTIVE_SHELL_VAR, &value))
                .transpose()?
                .unwrap_or(false),
            setup_file: get(SETUP_FILEPATH_VAR).map(PathBuf::from),
            use_setup: get(USE_SETUP_VAR)
                .map(|value| parse_bool(USE_SETUP_VAR, &value))
                .transpose()?
                .unwrap_or(true),
            preferred_drivers: get(PREFERRED_DRIVERS_VAR)
                .map(|value| parse_list(&value))
                .unwrap_or_default(),
            excluded_drivers: get(EXCLUDED_DRIVERS_VAR)
                .map(|value| parse_list(&value))
                .unwrap_or_default(),
            venv_dir: get(VENV_DIR_VAR).map(PathBuf::from),
            workon_home: get(WORKON_HOME_VAR).map(PathBuf::from),
        };

        debug!("Loaded settings: {settings:?}");
        Ok(settings)
    }

    #[must_use]
    pub fn is_excluded(&self, driver: &str) -> bool {
        self.excluded_drivers.iter().any(|name| name == driver)
    }

    /// Base directory for the plain-directory backend.
    pub fn venvs_dir(&self) -> Result<PathBuf, VenvError> {
        match self.venv_dir.as_ref().or(self.workon_home.as_ref()) {
            Some(dir) => Ok(dir.clone()),
            None => fallback_venvs_dir(VENV_DIR_VAR),
        }
    }

    /// Directory the wrapper tools keep their environments in.
    pub fn workon_home_dir(&self) -> Result<PathBuf, VenvError> {
        match &self.workon_home {
            Some(dir) => Ok(dir.clone()),
            None => fallback_venvs_dir(WORKON_HOME_VAR),
        }
    }
}

fn fallback_venvs_dir(setting: &'static str) -> Result<PathBuf, VenvError> {
    default_venvs_dir().map_err(|e| VenvError::configuration(setting, e.to_string()))
}

/// Parse `y/yes/t/true/on/1` or `n/no/f/false/off/0`, ignoring case.
pub fn parse_bool(setting: &'static str, value: &str) -> Result<bool, VenvError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => Err(VenvError::configuration(
            setting,
            format!("invalid truth value {other:?}"),
        )),
    }
}

#[must_use]
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
