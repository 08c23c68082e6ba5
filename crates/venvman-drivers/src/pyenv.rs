use async_trait::async_trait;
use log::{debug, error, info};
use std::path::{Path, PathBuf};

use venvman_backend::{Driver, DriverKind, MakeOptions, PythonRequest, VenvError, validate_name};
use venvman_shell::{COMMAND_NOT_FOUND_STATUS, CommandOutput, Executor, Settings, quote};

use crate::interpreter;
use crate::parse::parse_pyenv_listing;

const NAME: &str = "pyenv-virtualenv";
const LIST_COMMAND: &str = "pyenv virtualenvs --bare";
const NO_SUCH_PYTHON: &str = "is not installed in pyenv";

#[derive(Debug, Clone)]
pub struct PyenvDriver {
    settings: Settings,
}

impl PyenvDriver {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, VenvError> {
        debug!("Running pyenv command: {command}");
        Executor::from_settings(&self.settings)?.run(command).await
    }

    async fn contains(&self, name: &str) -> Result<bool, VenvError> {
        Ok(self.list().await?.iter().any(|existing| existing == name))
    }

    async fn prefix(&self, name: &str) -> Result<PathBuf, VenvError> {
        let command = format!("pyenv prefix {}", quote(name));
        let output = self.run(&command).await?.into_checked(&command, &[0])?;
        let prefix = output.trim();
        if prefix.is_empty() {
            return Err(VenvError::parse("pyenv prefix output", "empty output"));
        }
        Ok(PathBuf::from(prefix))
    }
}

/// Classify the exit status of `pyenv virtualenvs`: 127 means pyenv itself
/// is missing, 1 means pyenv does not know the `virtualenvs` subcommand.
pub fn check_listing(output: CommandOutput) -> Result<Vec<String>, VenvError> {
    match output.status {
        0 => Ok(parse_pyenv_listing(&output.stdout)),
        COMMAND_NOT_FOUND_STATUS => Err(VenvError::CommandNotFound {
            details: format!("{}. Have you installed pyenv?", output.diagnostic()),
        }),
        1 => Err(VenvError::CommandNotFound {
            details: format!("{}. Have you installed pyenv-virtualenv?", output.diagnostic()),
        }),
        _ => output.into_checked(LIST_COMMAND, &[0]).map(|_| Vec::new()),
    }
}

/// The `pyenv virtualenv` command line for `name`. A bare version is passed
/// positionally; anything else goes to virtualenv as `--python`.
pub fn create_command(name: &str, options: &MakeOptions) -> Result<String, VenvError> {
    if options.project_path.is_some() {
        return Err(VenvError::Unsupported {
            driver: NAME,
            operation: "associating a project path",
        });
    }

    let mut words = vec!["pyenv".to_string(), "virtualenv".to_string()];
    if let Some(PythonRequest::Executable(python)) = &options.python {
        words.push(quote(&format!("--python={python}")));
    }
    if options.system_site_packages {
        words.push("--system-site-packages".to_string());
    }
    words.extend(options.seed_package_flags().iter().map(|flag| quote(flag)));
    if let Some(PythonRequest::Version(version)) = &options.python {
        words.push(quote(version));
    }
    words.push(quote(name));

    Ok(words.join(" "))
}

#[async_trait]
impl Driver for PyenvDriver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "pyenv-virtualenv"
    }

    fn kind(&self) -> DriverKind {
        DriverKind::VersionManagerPlugin
    }

    async fn check_availability(&self) -> Result<(), VenvError> {
        self.list().await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<String>, VenvError> {
        check_listing(self.run(LIST_COMMAND).await?)
    }

    async fn create(&self, name: &str, options: &MakeOptions) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        let command = create_command(name, options)?;
        if self.contains(name).await? {
            return Err(VenvError::exists(name));
        }

        info!("Creating pyenv virtualenv {name:?}");
        let output = self.run(&command).await?;
        if output.stdout.contains(NO_SUCH_PYTHON) || output.stderr.contains(NO_SUCH_PYTHON) {
            return Err(VenvError::PythonNotFound {
                python: options
                    .python
                    .as_ref()
                    .map_or_else(|| "(default)".to_string(), ToString::to_string),
            });
        }
        output.into_checked(&command, &[0])?;

        let env_dir = self.prefix(name).await?;
        interpreter::pip_install(
            &env_dir,
            &options.packages,
            options.requirements_file.as_deref(),
        )
        .await?;
        Ok(env_dir)
    }

    async fn remove(&self, name: &str) -> Result<(), VenvError> {
        validate_name(name)?;
        if !self.contains(name).await? {
            return Err(VenvError::not_found(name));
        }

        let command = format!("pyenv uninstall -f {}", quote(name));
        info!("Removing pyenv virtualenv {name:?}");
        let output = self.run(&command).await?;
        // pyenv reports some failures on stderr with status 0.
        if !output.success() || !output.stderr.trim().is_empty() {
            error!("{command} failed: {}", output.stderr);
            return Err(VenvError::Execution {
                command,
                status: output.status,
                output: output.diagnostic().to_string(),
            });
        }
        Ok(())
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        if !self.contains(name).await? {
            return Err(VenvError::not_found(name));
        }
        self.prefix(name).await
    }

    async fn python_version(&self, env_dir: &Path) -> Result<String, VenvError> {
        interpreter::python_version(env_dir).await
    }
}
