use log::{debug, warn};
use std::path::{Path, PathBuf};

use venvman_backend::VenvError;

use crate::settings::{LOGIN_SHELL_VAR, SHELL_VAR, Settings};

const DEFAULT_SHELL: &str = "bash";

/// A shell executable resolved on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    pub path: PathBuf,
}

impl Shell {
    /// Pick the shell: the explicit override, then the login shell, then
    /// `bash`. The first candidate that resolves to an executable wins, and
    /// reaching a fish candidate is an error.
    pub fn locate(settings: &Settings) -> Result<Self, VenvError> {
        let candidates = [
            (SHELL_VAR, settings.shell.as_deref()),
            (LOGIN_SHELL_VAR, settings.login_shell.as_deref()),
            ("default", Some(DEFAULT_SHELL)),
        ];

        let mut tried = Vec::new();
        for (source, candidate) in candidates {
            let Some(candidate) = candidate else {
                continue;
            };
            if is_fish(candidate) {
                return Err(VenvError::configuration(
                    source,
                    format!("{candidate} is fish, whose syntax is not supported"),
                ));
            }
            match resolve_executable(candidate) {
                Some(path) => {
                    debug!("Using shell {} from {source}", path.display());
                    return Ok(Self { path });
                }
                None => {
                    warn!("Shell {candidate} from {source} was not found on the search path");
                    tried.push(format!("{candidate} (not found)"));
                }
            }
        }

        Err(VenvError::configuration(
            SHELL_VAR,
            format!("could not locate a usable shell; tried {}", tried.join(", ")),
        ))
    }

    /// File name of the shell executable, such as `bash`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_stem()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The rc file the shell reads when interactive, e.g. `~/.bashrc`.
    #[must_use]
    pub fn rc_file(&self) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(format!(".{}rc", self.file_name())))
    }
}

fn is_fish(candidate: &str) -> bool {
    Path::new(candidate)
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains("fish"))
}

fn resolve_executable(candidate: &str) -> Option<PathBuf> {
    let path = Path::new(candidate);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    which::which(candidate).ok()
}
