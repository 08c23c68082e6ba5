use log::debug;
use std::path::{Path, PathBuf};

use venvman_backend::VenvError;

use crate::locate::Shell;
use crate::settings::{SETUP_FILEPATH_VAR, Settings};

/// How the configured shell is started and what it sources first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub shell: Shell,
    pub interactive: bool,
    pub setup_file: Option<PathBuf>,
}

impl ShellInvocation {
    /// Locate the shell and, when sourcing is enabled, the setup file.
    ///
    /// The setup file defaults to the shell's rc file and must exist.
    pub fn from_settings(settings: &Settings) -> Result<Self, VenvError> {
        let shell = Shell::locate(settings)?;

        let setup_file = if settings.use_setup {
            let path = settings
                .setup_file
                .clone()
                .or_else(|| shell.rc_file())
                .ok_or_else(|| {
                    VenvError::configuration(
                        SETUP_FILEPATH_VAR,
                        "no setup file configured and the home directory is unknown",
                    )
                })?;
            if !path.is_file() {
                return Err(VenvError::configuration(
                    SETUP_FILEPATH_VAR,
                    format!("setup file {} does not exist", path.display()),
                ));
            }
            Some(path)
        } else {
            None
        };

        debug!(
            "Shell invocation: shell={}, interactive={}, setup={:?}",
            shell.path.display(),
            settings.interactive,
            setup_file
        );

        Ok(Self {
            shell,
            interactive: settings.interactive,
            setup_file,
        })
    }

    /// The script handed to `shell -c`: the setup file is sourced first and
    /// the command only runs if sourcing succeeded.
    #[must_use]
    pub fn script(&self, command: &str, suppress_setup_output: bool) -> String {
        let mut parts = Vec::with_capacity(2);

        if let Some(setup_file) = &self.setup_file {
            let redirection = if suppress_setup_output {
                " 1>/dev/null 2>&1"
            } else {
                ""
            };
            parts.push(format!(". {}{redirection}", quote_path(setup_file)));
        }

        if !command.trim().is_empty() {
            parts.push(command.to_string());
        }

        if parts.is_empty() {
            ":".to_string()
        } else {
            parts.join(" && ")
        }
    }

    /// Arguments following the shell executable.
    #[must_use]
    pub fn args(&self, command: &str, suppress_setup_output: bool) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        if self.interactive {
            args.push("-i".to_string());
        }
        args.push("-c".to_string());
        args.push(self.script(command, suppress_setup_output));
        args
    }
}

/// Quote a word for POSIX shells.
#[must_use]
pub fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+%,".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(interactive: bool, setup_file: Option<&str>) -> ShellInvocation {
        ShellInvocation {
            shell: Shell {
                path: PathBuf::from("/bin/bash"),
            },
            interactive,
            setup_file: setup_file.map(PathBuf::from),
        }
    }

    #[test]
    fn script_sources_setup_quietly_before_command() {
        let script = invocation(false, Some("/home/u/.bashrc")).script("lsvirtualenv -b", true);

        assert_eq!(
            script,
            ". /home/u/.bashrc 1>/dev/null 2>&1 && lsvirtualenv -b"
        );
    }

    #[test]
    fn script_keeps_setup_output_when_asked() {
        let script = invocation(false, Some("/home/u/.bashrc")).script("", false);
        assert_eq!(script, ". /home/u/.bashrc");
    }

    #[test]
    fn script_without_setup_is_the_command() {
        assert_eq!(invocation(false, None).script("conda info --envs", true), "conda info --envs");
        assert_eq!(invocation(false, None).script("", true), ":");
    }

    #[test]
    fn interactive_adds_dash_i_before_dash_c() {
        let args = invocation(true, None).args("pyenv virtualenvs --bare", true);
        assert_eq!(args, vec!["-i", "-c", "pyenv virtualenvs --bare"]);

        let args = invocation(false, None).args("pyenv virtualenvs --bare", true);
        assert_eq!(args, vec!["-c", "pyenv virtualenvs --bare"]);
    }

    #[test]
    fn setup_paths_with_spaces_are_quoted() {
        let script = invocation(false, Some("/home/u/My Setup/env.sh")).script("true", true);
        assert!(script.starts_with(". '/home/u/My Setup/env.sh' 1>/dev/null"));
    }

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(quote("demo-env_1.0"), "demo-env_1.0");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("a b"), "'a b'");
    }

    #[cfg(unix)]
    #[test]
    fn missing_setup_file_is_a_configuration_error() {
        let settings = Settings {
            shell: Some("sh".to_string()),
            setup_file: Some(PathBuf::from("/definitely/missing/setup.sh")),
            use_setup: true,
            ..Settings::default()
        };

        let Err(error) = ShellInvocation::from_settings(&settings) else {
            panic!("expected a configuration error");
        };

        assert!(matches!(
            error,
            VenvError::Configuration {
                setting: SETUP_FILEPATH_VAR,
                ..
            }
        ));
    }

    #[test]
    fn disabled_setup_ignores_missing_file() {
        let settings = Settings {
            shell: Some("sh".to_string()),
            setup_file: Some(PathBuf::from("/definitely/missing/setup.sh")),
            use_setup: false,
            ..Settings::default()
        };

        let Ok(invocation) = ShellInvocation::from_settings(&settings) else {
            // No usable shell on this machine.
            return;
        };
        assert!(invocation.setup_file.is_none());
    }
}
