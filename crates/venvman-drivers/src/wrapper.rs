use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use venvman_backend::{Driver, DriverKind, MakeOptions, VenvError, validate_name};
use venvman_shell::{Executor, Settings, quote};

use crate::interpreter;
use crate::parse::{parse_destination, parse_name_listing};

/// The two tools that expose `mkvirtualenv`/`rmvirtualenv` as shell
/// functions. They differ only in the listing command and in how strictly
/// they report success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperFlavor {
    VirtualenvWrapper,
    VirtualenvSh,
}

impl WrapperFlavor {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::VirtualenvWrapper => "virtualenvwrapper",
            Self::VirtualenvSh => "virtualenv-sh",
        }
    }

    fn kind(self) -> DriverKind {
        match self {
            Self::VirtualenvWrapper => DriverKind::WrapperScript,
            Self::VirtualenvSh => DriverKind::ShellFunction,
        }
    }

    fn list_command(self) -> &'static str {
        match self {
            Self::VirtualenvWrapper => "lsvirtualenv -b",
            Self::VirtualenvSh => "lsvirtualenvs -b",
        }
    }

    /// virtualenvwrapper returns 1 from several commands that worked.
    fn success_statuses(self) -> &'static [i32] {
        match self {
            Self::VirtualenvWrapper => &[0, 1],
            Self::VirtualenvSh => &[0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct WrapperDriver {
    flavor: WrapperFlavor,
    settings: Settings,
}

impl WrapperDriver {
    #[must_use]
    pub fn new(flavor: WrapperFlavor, settings: Settings) -> Self {
        Self { flavor, settings }
    }

    #[must_use]
    pub fn virtualenvwrapper(settings: Settings) -> Self {
        Self::new(WrapperFlavor::VirtualenvWrapper, settings)
    }

    #[must_use]
    pub fn virtualenv_sh(settings: Settings) -> Self {
        Self::new(WrapperFlavor::VirtualenvSh, settings)
    }

    fn executor(&self) -> Result<Executor, VenvError> {
        Executor::from_settings(&self.settings)
    }

    async fn execute(&self, command: &str) -> Result<String, VenvError> {
        info!("Executing {} command: {command}", self.flavor.name());
        self.executor()?
            .run_checked(command, self.flavor.success_statuses())
            .await
    }

    fn environment_dir(&self, name: &str) -> Result<PathBuf, VenvError> {
        Ok(self.settings.workon_home_dir()?.join(name))
    }
}

/// The `mkvirtualenv` command line for `name`.
#[must_use]
pub fn make_command(name: &str, options: &MakeOptions) -> String {
    let mut words = vec!["mkvirtualenv".to_string(), quote(name)];

    if let Some(project) = &options.project_path {
        words.push("-a".to_string());
        words.push(quote(&project.to_string_lossy()));
    }
    for package in &options.packages {
        words.push("-i".to_string());
        words.push(quote(package));
    }
    if let Some(requirements) = &options.requirements_file {
        words.push(format!("-r{}", quote(&requirements.to_string_lossy())));
    }
    if let Some(python) = &options.python {
        words.push(quote(&format!("--python={}", python.executable_name())));
    }
    if options.system_site_packages {
        words.push("--system-site-packages".to_string());
    }
    words.extend(options.seed_package_flags().iter().map(|flag| quote(flag)));

    words.join(" ")
}

#[async_trait]
impl Driver for WrapperDriver {
    fn name(&self) -> &'static str {
        self.flavor.name()
    }

    fn display_name(&self) -> &'static str {
        self.flavor.name()
    }

    fn kind(&self) -> DriverKind {
        self.flavor.kind()
    }

    async fn check_availability(&self) -> Result<(), VenvError> {
        self.list().await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<String>, VenvError> {
        let output = self.execute(self.flavor.list_command()).await?;
        Ok(parse_name_listing(&output))
    }

    async fn create(&self, name: &str, options: &MakeOptions) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        if self.list().await?.iter().any(|existing| existing == name) {
            return Err(VenvError::exists(name));
        }

        let output = self.execute(&make_command(name, options)).await?;

        match parse_destination(&output) {
            Some(dest) => {
                debug!("Found dest = {}", dest.display());
                Ok(dest)
            }
            None => {
                let dir = self.environment_dir(name)?;
                warn!(
                    "Could not find dest for virtualenv {name:?}, assuming {}",
                    dir.display()
                );
                Ok(dir)
            }
        }
    }

    async fn remove(&self, name: &str) -> Result<(), VenvError> {
        validate_name(name)?;
        if !self.list().await?.iter().any(|existing| existing == name) {
            return Err(VenvError::not_found(name));
        }

        self.execute(&format!("rmvirtualenv {}", quote(name))).await?;
        Ok(())
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        if self.list().await?.iter().any(|existing| existing == name) {
            self.environment_dir(name)
        } else {
            Err(VenvError::not_found(name))
        }
    }

    async fn python_version(&self, env_dir: &Path) -> Result<String, VenvError> {
        interpreter::python_version(env_dir).await
    }
}
