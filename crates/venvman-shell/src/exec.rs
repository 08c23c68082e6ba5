use log::{debug, error, info, trace};
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;

use venvman_backend::VenvError;
use venvman_platform::CapturedCommand;

use crate::command::ShellInvocation;
use crate::settings::Settings;

/// Exit status shells use for "command not found".
pub const COMMAND_NOT_FOUND_STATUS: i32 = 127;

const INTERACTIVE_WARNINGS: [&str; 3] = [
    "cannot set terminal process group",
    "Inappropriate ioctl for device",
    "no job control in this shell",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// The text worth showing when the command failed: stderr, or stdout
    /// when the tool reported its error there.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }

    /// Keep stdout when the status is one of `success_statuses`, otherwise
    /// turn the output into an error carrying what the backend printed.
    pub fn into_checked(self, command: &str, success_statuses: &[i32]) -> Result<String, VenvError> {
        if success_statuses.contains(&self.status) {
            return Ok(self.stdout);
        }

        error!(
            "Command failed: command='{command}', status={}, stderr='{}'",
            self.status, self.stderr
        );

        if self.status == COMMAND_NOT_FOUND_STATUS {
            return Err(VenvError::CommandNotFound {
                details: format!("{command}: {}", self.diagnostic()),
            });
        }

        Err(VenvError::Execution {
            command: command.to_string(),
            status: self.status,
            output: self.diagnostic().to_string(),
        })
    }
}

/// Runs backend commands through the configured shell.
#[derive(Debug, Clone)]
pub struct Executor {
    invocation: ShellInvocation,
}

impl Executor {
    #[must_use]
    pub fn new(invocation: ShellInvocation) -> Self {
        Self { invocation }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, VenvError> {
        ShellInvocation::from_settings(settings).map(Self::new)
    }

    #[must_use]
    pub fn invocation(&self) -> &ShellInvocation {
        &self.invocation
    }

    /// Run `command` after sourcing setup, without judging the exit status.
    pub async fn run(&self, command: &str) -> Result<CommandOutput, VenvError> {
        self.spawn(command, true).await
    }

    /// Run `command` and fail unless it exits with one of `success_statuses`.
    pub async fn run_checked(
        &self,
        command: &str,
        success_statuses: &[i32],
    ) -> Result<String, VenvError> {
        self.run(command)
            .await?
            .into_checked(command, success_statuses)
    }

    /// Run only the setup step with its output visible, to diagnose shell
    /// configuration problems.
    pub async fn check_environment(&self) -> Result<CommandOutput, VenvError> {
        self.spawn("", false).await
    }

    async fn spawn(
        &self,
        command: &str,
        suppress_setup_output: bool,
    ) -> Result<CommandOutput, VenvError> {
        let args = self.invocation.args(command, suppress_setup_output);
        debug!(
            "Running shell command: {} {}",
            self.invocation.shell.path.display(),
            args.join(" ")
        );

        let output = Command::new(&self.invocation.shell.path)
            .args(&args)
            .captured()
            .output()
            .await?;

        let mut output = CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: strip_trailing_newline(String::from_utf8_lossy(&output.stdout).into_owned()),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if self.invocation.interactive {
            output.stderr = remove_interactive_shell_warnings(&output.stderr);
        }

        debug!("Shell command exit status: {}", output.status);
        trace!("stdout: {}", output.stdout);
        if !output.stderr.is_empty() {
            trace!("stderr: {}", output.stderr);
        }

        Ok(output)
    }
}

/// Run an executable directly, bypassing the shell.
pub async fn run_program<I, S>(program: &Path, args: I) -> Result<CommandOutput, VenvError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().collect();
    info!(
        "Executing {} {}",
        program.display(),
        args.iter()
            .map(|arg| arg.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = Command::new(program)
        .args(&args)
        .captured()
        .output()
        .await
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                VenvError::CommandNotFound {
                    details: program.display().to_string(),
                }
            } else {
                VenvError::from(err)
            }
        })?;

    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: strip_trailing_newline(String::from_utf8_lossy(&output.stdout).into_owned()),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

#[must_use]
pub fn has_interactive_warning(line: &str) -> bool {
    INTERACTIVE_WARNINGS
        .iter()
        .any(|warning| line.contains(warning))
}

/// Drop the job-control noise shells print when run interactively without a
/// terminal.
#[must_use]
pub fn remove_interactive_shell_warnings(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !has_interactive_warning(line))
        .collect()
}
