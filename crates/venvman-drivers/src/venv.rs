use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

use venvman_backend::{Driver, DriverKind, MakeOptions, PackageSpec, VenvError, validate_name};
use venvman_shell::{Settings, VENV_DIR_VAR, run_program};

use crate::interpreter;

const NAME: &str = "venv";
const MARKER_FILE: &str = "pyvenv.cfg";

/// Environments are subdirectories of one base directory, created with the
/// standard library `venv` module.
#[derive(Debug, Clone)]
pub struct VenvDriver {
    settings: Settings,
}

impl VenvDriver {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn base_dir(&self) -> Result<PathBuf, VenvError> {
        self.settings.venvs_dir()
    }

    /// The base directory, or `None` if it does not exist yet.
    async fn existing_base_dir(&self) -> Result<Option<PathBuf>, VenvError> {
        let base = self.base_dir()?;
        match tokio::fs::metadata(&base).await {
            Ok(metadata) if metadata.is_dir() => Ok(Some(base)),
            Ok(_) => Err(VenvError::configuration(
                VENV_DIR_VAR,
                format!("{} is not a directory", base.display()),
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn environment_dir(&self, name: &str) -> Result<Option<PathBuf>, VenvError> {
        let Some(base) = self.existing_base_dir().await? else {
            return Ok(None);
        };
        let dir = base.join(name);
        Ok(is_environment(&dir).await.then_some(dir))
    }
}

async fn is_environment(dir: &Path) -> bool {
    tokio::fs::metadata(dir.join(MARKER_FILE))
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

/// Arguments after the interpreter for `python -m venv`.
#[must_use]
pub fn venv_args(env_dir: &Path, options: &MakeOptions) -> Vec<String> {
    let mut args = vec![
        "-m".to_string(),
        "venv".to_string(),
        env_dir.to_string_lossy().into_owned(),
    ];
    if options.system_site_packages {
        args.push("--system-site-packages".to_string());
    }
    match &options.pip {
        PackageSpec::Omit => args.push("--without-pip".to_string()),
        PackageSpec::Version(version) if version == "latest" => {
            args.push("--upgrade-deps".to_string());
        }
        PackageSpec::Default | PackageSpec::Version(_) => {}
    }
    args
}

/// Requirements installed after creation: pinned seed packages, then the
/// caller's packages.
#[must_use]
pub fn post_install_requirements(options: &MakeOptions) -> Vec<String> {
    let pip = match &options.pip {
        PackageSpec::Version(version) if version == "latest" || version == "bundle" => None,
        spec => spec.requirement("pip"),
    };

    pip.into_iter()
        .chain(options.setuptools.requirement("setuptools"))
        .chain(options.wheel.requirement("wheel"))
        .chain(options.packages.iter().cloned())
        .collect()
}

#[async_trait]
impl Driver for VenvDriver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "venv"
    }

    fn kind(&self) -> DriverKind {
        DriverKind::PlainDirectory
    }

    async fn check_availability(&self) -> Result<(), VenvError> {
        interpreter::find_interpreter(None)?;
        self.existing_base_dir().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, VenvError> {
        let Some(base) = self.existing_base_dir().await? else {
            debug!("venv base directory does not exist yet");
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&base).await?;
        while let Some(entry) = entries.next_entry().await? {
            if is_environment(&entry.path()).await {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create(&self, name: &str, options: &MakeOptions) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        if options.project_path.is_some() {
            return Err(VenvError::Unsupported {
                driver: NAME,
                operation: "associating a project path",
            });
        }

        let base = self.base_dir()?;
        let env_dir = base.join(name);
        if tokio::fs::try_exists(&env_dir).await? {
            return Err(VenvError::exists(name));
        }
        let python = interpreter::find_interpreter(options.python.as_ref())?;

        tokio::fs::create_dir_all(&base).await?;
        let args = venv_args(&env_dir, options);
        let command = format!("{} {}", python.display(), args.join(" "));
        info!("Creating venv {name:?}: {command}");
        run_program(&python, &args)
            .await?
            .into_checked(&command, &[0])?;

        interpreter::pip_install(
            &env_dir,
            &post_install_requirements(options),
            options.requirements_file.as_deref(),
        )
        .await?;

        Ok(env_dir)
    }

    async fn remove(&self, name: &str) -> Result<(), VenvError> {
        validate_name(name)?;
        let env_dir = self
            .environment_dir(name)
            .await?
            .ok_or_else(|| VenvError::not_found(name))?;

        info!("Removing venv {}", env_dir.display());
        tokio::fs::remove_dir_all(&env_dir).await?;
        Ok(())
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf, VenvError> {
        validate_name(name)?;
        self.environment_dir(name)
            .await?
            .ok_or_else(|| VenvError::not_found(name))
    }

    async fn python_version(&self, env_dir: &Path) -> Result<String, VenvError> {
        interpreter::python_version(env_dir).await
    }
}
