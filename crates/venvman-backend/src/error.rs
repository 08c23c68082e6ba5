use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenvError {
    #[error("Configuration error in {setting}: {details}")]
    Configuration {
        setting: &'static str,
        details: String,
    },

    #[error("Command `{command}` exited with status {status}: {output}")]
    Execution {
        command: String,
        status: i32,
        output: String,
    },

    #[error("Command not found: {details}")]
    CommandNotFound { details: String },

    #[error("Virtual environment already exists: {name}")]
    EnvironmentExists { name: String },

    #[error("No virtual environment named {name:?}")]
    EnvironmentNotFound { name: String },

    #[error(
        "No virtual environment driver backed by a working implementation was found. Tried: {tried_list}.{reason_lines}",
        tried_list = .tried.join(", "),
        reason_lines = format_reasons(.reasons)
    )]
    NoDriverAvailable {
        tried: Vec<String>,
        reasons: Vec<(String, String)>,
    },

    #[error("Could not locate Python {python}")]
    PythonNotFound { python: String },

    #[error("A virtual environment name must be a single non-empty path component")]
    InvalidName,

    #[error("Could not locate a Python executable for supposed virtual environment {}", .path.display())]
    NotAVirtualEnv { path: PathBuf },

    #[error(
        "Virtual environment at {} has actual version {actual}, not expected version {expected}",
        .path.display()
    )]
    VersionMismatch {
        path: PathBuf,
        actual: String,
        expected: String,
    },

    #[error("Operation not supported by the {driver} driver: {operation}")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },

    #[error("Could not parse {context}: {details}")]
    Parse {
        context: &'static str,
        details: String,
    },

    #[error("IO error ({kind}): {message}")]
    IoError {
        kind: std::io::ErrorKind,
        message: String,
    },
}

fn format_reasons(reasons: &[(String, String)]) -> String {
    let mut out = String::new();
    for (name, reason) in reasons {
        out.push_str("\n  ");
        out.push_str(name);
        out.push_str(": ");
        out.push_str(&reason.replace('\n', " "));
    }
    out
}

impl VenvError {
    pub fn configuration(setting: &'static str, details: impl Into<String>) -> Self {
        Self::Configuration {
            setting,
            details: details.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::EnvironmentNotFound { name: name.into() }
    }

    pub fn exists(name: impl Into<String>) -> Self {
        Self::EnvironmentExists { name: name.into() }
    }

    pub fn parse(context: &'static str, details: impl Into<String>) -> Self {
        Self::Parse {
            context,
            details: details.into(),
        }
    }

    /// Whether this failure means the backend is missing rather than broken.
    ///
    /// The selector treats these as "unavailable" and moves on to the next
    /// candidate driver.
    #[must_use]
    pub fn is_unavailability(&self) -> bool {
        matches!(
            self,
            Self::CommandNotFound { .. } | Self::Configuration { .. } | Self::PythonNotFound { .. }
        )
    }
}

impl From<std::io::Error> for VenvError {
    fn from(err: std::io::Error) -> Self {
        VenvError::IoError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
