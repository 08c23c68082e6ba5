use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

use venvman_backend::{Driver, DriverKind, MakeOptions, PythonRequest, VenvError, validate_name};
use venvman_shell::{COMMAND_NOT_FOUND_STATUS, CommandOutput, Executor, Settings, quote};

use crate::interpreter;
use crate::parse::{CondaEnvironment, parse_conda_environments, parse_conda_location};

const NAME: &str = "conda";
const LIST_COMMAND: &str = "conda info --envs";

#[derive(Debug, Clone)]
pub struct CondaDriver {
    settings: Settings,
}

impl CondaDriver {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, VenvError> {
        debug!("Running conda command: {command}");
        Executor::from_settings(&self.settings)?.run(command).await
    }

    async fn environments(&self) -> Result<Vec<CondaEnvironment>, VenvError> {
        let output = self.run(LIST_COMMAND).await?;
        if output.status == COMMAND_NOT_FOUND_STATUS {
            return Err(VenvError::CommandNotFound {
                details: format!("{}. Have you installed conda?", output.diagnostic()),
            });
        }
        let stdout = output.into_checked(LIST_COMMAND, &[0])?;
        Ok(parse_conda_environments(&stdout))
    }

    async fn find(&self, name: &str) -> Result<Option<PathBuf>, VenvError> {
        Ok(self
            .environments()
            .await?
            .into_iter()
            .find(|env| env.name == name)
            .map(|env| env.path))
    }
}

/// The `conda create` command line for `name`. Extra packages are handed to
/// conda directly so they are solved together with the interpreter.
pub fn create_command(name: &str, options: &MakeOptions) -> Result<String, VenvError> {
    let unsupported = |operation| VenvError::Unsupported {
        driver: NAME,
        operation,
    };
    if options.project_path.is_some() {
        return Err(unsupported("associating a project path"));
    }
    if options.system_site_packages {
        return Err(unsupported("system site packages"));
    }

    let mut words: Vec<String> = ["conda", "create", "--yes", "--name"]
        .into_iter()
        .map(str::to_string)
        .collect();
    words.push(quote(name));
    match &options.python {
        Some(PythonRequest::Version(version)) => words.push(quote(&format!("python={version}"))),
        Some(PythonRequest::Executable(_)) => {
            return Err(unsupported("selecting a python executable"));
        }
        None => {}
    }
    words.extend(options.packages.iter().map(|package| quote(package)));

    Ok(words.join(" "))
}

#[async_trait]
impl Driver for CondaDriver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "Conda"
    }

    fn kind(&self) -> DriverKind {
        DriverKind::VersionManagerPlugin
    }

    async fn check_availability(&self) -> Result<(), VenvError> {
        self.environments().await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<String>, VenvError> {
        Ok(self
            .environments()
            .await?
            .into_iter()
            .map(|env| env.name)
            .collect())
    }

    async fn create(&self, name: &str, options: &MakeOptions) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        let command = create_command(name, options)?;
        if self.find(name).await?.is_some() {
            return Err(VenvError::exists(name));
        }

        info!("Creating conda environment {name:?}");
        let stdout = self.run(&command).await?.into_checked(&command, &[0])?;

        let env_dir = match parse_conda_location(&stdout) {
            Some(location) => {
                debug!("Found environment location: {}", location.display());
                location
            }
            None => self.resolve(name).await?,
        };

        interpreter::pip_install(&env_dir, &[], options.requirements_file.as_deref()).await?;
        Ok(env_dir)
    }

    async fn remove(&self, name: &str) -> Result<(), VenvError> {
        validate_name(name)?;
        if self.find(name).await?.is_none() {
            return Err(VenvError::not_found(name));
        }

        let command = format!("conda remove --yes --name {} --all", quote(name));
        info!("Removing conda environment {name:?}");
        self.run(&command).await?.into_checked(&command, &[0])?;
        Ok(())
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        self.find(name)
            .await?
            .ok_or_else(|| VenvError::not_found(name))
    }

    async fn python_version(&self, env_dir: &Path) -> Result<String, VenvError> {
        interpreter::python_version(env_dir).await
    }
}
