use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::VenvError;
use crate::types::MakeOptions;

/// Which family of tool a driver delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    PlainDirectory,
    WrapperScript,
    ShellFunction,
    VersionManagerPlugin,
}

/// Outcome of probing a driver, as reported by `venvman drivers`.
#[derive(Debug, Clone, Serialize)]
pub struct DriverStatus {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: DriverKind,
    pub available: bool,
    pub reason: Option<String>,
}

/// A virtual environment backend.
///
/// Implementations translate each operation into commands for one concrete
/// tool. Every call re-queries the tool; nothing is cached between calls.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn kind(&self) -> DriverKind;

    /// Probe the backend without changing anything.
    ///
    /// Returns the reason the backend can't be used on failure.
    async fn check_availability(&self) -> Result<(), VenvError>;

    async fn is_available(&self) -> bool {
        self.check_availability().await.is_ok()
    }

    /// Names of the environments known to the backend, sorted.
    async fn list(&self) -> Result<Vec<String>, VenvError>;

    async fn create(&self, name: &str, options: &MakeOptions) -> Result<PathBuf, VenvError>;

    async fn remove(&self, name: &str) -> Result<(), VenvError>;

    async fn resolve(&self, name: &str) -> Result<PathBuf, VenvError>;

    async fn python_version(&self, env_dir: &Path) -> Result<String, VenvError>;

    async fn status(&self) -> DriverStatus {
        let outcome = self.check_availability().await;
        DriverStatus {
            name: self.name(),
            display_name: self.display_name(),
            kind: self.kind(),
            available: outcome.is_ok(),
            reason: outcome.err().map(|e| e.to_string()),
        }
    }
}
