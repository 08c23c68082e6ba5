use log::{info, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

use venvman_backend::{
    Driver, DriverKind, DriverStatus, MakeOptions, VenvError, compatible_versions,
    validate_name,
};
use venvman_drivers::interpreter;
use venvman_shell::{CommandOutput, Executor, Settings};

use crate::registry::DriverRegistry;

/// Entry point for every environment operation.
///
/// Each call picks a driver from the registry. By default the choice is made
/// again on every call; [`VenvManager::with_cached_selection`] makes the
/// first choice stick for the manager's lifetime.
#[derive(Debug)]
pub struct VenvManager {
    settings: Settings,
    registry: DriverRegistry,
    selected: Option<OnceCell<&'static str>>,
}

impl VenvManager {
    /// A manager configured from the process environment.
    pub fn from_env() -> Result<Self, VenvError> {
        Ok(Self::with_settings(Settings::from_env()?))
    }

    #[must_use]
    pub fn with_settings(settings: Settings) -> Self {
        let registry = DriverRegistry::builtin(&settings);
        Self::with_registry(settings, registry)
    }

    #[must_use]
    pub fn with_registry(settings: Settings, registry: DriverRegistry) -> Self {
        Self {
            settings,
            registry,
            selected: None,
        }
    }

    #[must_use]
    pub fn with_cached_selection(mut self) -> Self {
        self.selected = Some(OnceCell::new());
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// The driver that handles operations right now.
    pub async fn driver(&self) -> Result<&dyn Driver, VenvError> {
        let Some(cache) = &self.selected else {
            return self.registry.select(&self.settings).await;
        };

        let name = cache
            .get_or_try_init(|| async {
                self.registry
                    .select(&self.settings)
                    .await
                    .map(|driver| driver.name())
            })
            .await?;
        self.registry
            .get(name)
            .ok_or_else(|| VenvError::configuration("driver", format!("unknown driver {name}")))
    }

    pub async fn driver_name(&self) -> Result<&'static str, VenvError> {
        Ok(self.driver().await?.name())
    }

    pub async fn has_driver(&self) -> bool {
        self.driver().await.is_ok()
    }

    pub async fn driver_statuses(&self) -> Vec<DriverStatus> {
        self.registry.statuses().await
    }

    /// Run only the setup step, with its output visible.
    pub async fn check_environment(&self) -> Result<CommandOutput, VenvError> {
        Executor::from_settings(&self.settings)?
            .check_environment()
            .await
    }

    pub async fn list_virtual_envs(&self) -> Result<Vec<String>, VenvError> {
        self.driver().await?.list().await
    }

    pub async fn make_virtual_env(
        &self,
        name: &str,
        python_version: Option<&str>,
    ) -> Result<PathBuf, VenvError> {
        let options = MakeOptions::default().with_python_version(python_version);
        self.make_virtual_env_with(name, &options).await
    }

    pub async fn make_virtual_env_with(
        &self,
        name: &str,
        options: &MakeOptions,
    ) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        let driver = self.driver().await?;
        info!("Making virtual environment {name:?} with {}", driver.name());
        driver.create(name, options).await
    }

    pub async fn remove_virtual_env(&self, name: &str) -> Result<(), VenvError> {
        validate_name(name)?;
        let driver = self.driver().await?;
        info!("Removing virtual environment {name:?} with {}", driver.name());
        driver.remove(name).await
    }

    /// Remove `name` if it exists.
    pub async fn discard_virtual_env(&self, name: &str) -> Result<(), VenvError> {
        match self.remove_virtual_env(name).await {
            Err(VenvError::EnvironmentNotFound { .. }) => Ok(()),
            other => other,
        }
    }

    pub async fn resolve_virtual_env(&self, name: &str) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        self.driver().await?.resolve(name).await
    }

    /// Make sure `name` exists, and if `expected_version` is given, that it
    /// runs a compatible interpreter (`3.8` matches `3.8.2`).
    ///
    /// An incompatible environment is replaced when `force` is set and
    /// reported as [`VenvError::VersionMismatch`] otherwise.
    pub async fn ensure_virtual_env(
        &self,
        name: &str,
        expected_version: Option<&str>,
        force: bool,
    ) -> Result<PathBuf, VenvError> {
        self.ensure_virtual_env_with(name, expected_version, force, &MakeOptions::default())
            .await
    }

    /// Like [`VenvManager::ensure_virtual_env`], creating missing
    /// environments with `options`.
    pub async fn ensure_virtual_env_with(
        &self,
        name: &str,
        expected_version: Option<&str>,
        force: bool,
        options: &MakeOptions,
    ) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        let driver = self.driver().await?;
        if driver.kind() != DriverKind::PlainDirectory {
            self.verify_setup().await?;
        }
        let options = options.clone().with_python_version(expected_version);

        match driver.resolve(name).await {
            Ok(path) => {
                let Some(expected) = expected_version else {
                    return Ok(path);
                };
                let actual = driver.python_version(&path).await?;
                if compatible_versions(&actual, expected) {
                    return Ok(path);
                }

                let mismatch = VenvError::VersionMismatch {
                    path,
                    actual,
                    expected: expected.to_string(),
                };
                warn!("{mismatch}");
                if !force {
                    return Err(mismatch);
                }
                driver.remove(name).await?;
                driver.create(name, &options).await
            }
            Err(VenvError::EnvironmentNotFound { .. }) => driver.create(name, &options).await,
            Err(e) => Err(e),
        }
    }

    /// Source the setup file on its own and fail if that exits non-zero.
    async fn verify_setup(&self) -> Result<(), VenvError> {
        let output = self.check_environment().await?;
        if output.success() {
            return Ok(());
        }
        let setup = self
            .settings
            .setup_file
            .as_ref()
            .map_or_else(|| "setup file".to_string(), |path| path.display().to_string());
        Err(VenvError::Execution {
            command: format!(". {setup}"),
            status: output.status,
            output: output.diagnostic().to_string(),
        })
    }

    /// Ensure `name`, hand its path to `f`, then remove the environment
    /// whatever `f` returned.
    pub async fn with_virtual_env<F, Fut, T>(
        &self,
        name: &str,
        expected_version: Option<&str>,
        force: bool,
        f: F,
    ) -> Result<T, VenvError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = T>,
    {
        let path = self.ensure_virtual_env(name, expected_version, force).await?;
        let value = f(path).await;
        self.remove_virtual_env(name).await?;
        Ok(value)
    }

    /// Interpreter version of the environment at `env_dir`, e.g. `3.11.4`.
    pub async fn python_version(&self, env_dir: &Path) -> Result<String, VenvError> {
        self.driver().await?.python_version(env_dir).await
    }
}

/// Path of the interpreter inside the environment at `env_dir`.
pub fn python_executable_path(env_dir: &Path) -> Result<PathBuf, VenvError> {
    interpreter::environment_python(env_dir)
}

/// First line of the environment interpreter's `--version` output, such as
/// `Python 3.11.4`.
pub async fn python_name(env_dir: &Path) -> Result<String, VenvError> {
    interpreter::python_name(env_dir).await
}

// The free functions read the environment on every call.

pub async fn list_virtual_envs() -> Result<Vec<String>, VenvError> {
    VenvManager::from_env()?.list_virtual_envs().await
}

pub async fn make_virtual_env(
    name: &str,
    python_version: Option<&str>,
) -> Result<PathBuf, VenvError> {
    VenvManager::from_env()?
        .make_virtual_env(name, python_version)
        .await
}

pub async fn make_virtual_env_with(
    name: &str,
    options: &MakeOptions,
) -> Result<PathBuf, VenvError> {
    VenvManager::from_env()?
        .make_virtual_env_with(name, options)
        .await
}

pub async fn remove_virtual_env(name: &str) -> Result<(), VenvError> {
    VenvManager::from_env()?.remove_virtual_env(name).await
}

pub async fn discard_virtual_env(name: &str) -> Result<(), VenvError> {
    VenvManager::from_env()?.discard_virtual_env(name).await
}

pub async fn resolve_virtual_env(name: &str) -> Result<PathBuf, VenvError> {
    VenvManager::from_env()?.resolve_virtual_env(name).await
}

pub async fn ensure_virtual_env(
    name: &str,
    expected_version: Option<&str>,
    force: bool,
) -> Result<PathBuf, VenvError> {
    VenvManager::from_env()?
        .ensure_virtual_env(name, expected_version, force)
        .await
}

pub async fn with_virtual_env<F, Fut, T>(
    name: &str,
    expected_version: Option<&str>,
    force: bool,
    f: F,
) -> Result<T, VenvError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = T>,
{
    VenvManager::from_env()?
        .with_virtual_env(name, expected_version, force, f)
        .await
}

pub async fn python_version(env_dir: &Path) -> Result<String, VenvError> {
    VenvManager::from_env()?.python_version(env_dir).await
}

pub async fn check_environment() -> Result<CommandOutput, VenvError> {
    VenvManager::from_env()?.check_environment().await
}

pub async fn driver_name() -> Result<&'static str, VenvError> {
    VenvManager::from_env()?.driver_name().await
}

pub async fn has_driver() -> bool {
    match VenvManager::from_env() {
        Ok(manager) => manager.has_driver().await,
        Err(_) => false,
    }
}
