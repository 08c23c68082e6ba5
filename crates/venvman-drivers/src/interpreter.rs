use log::{debug, info};
use std::path::{Path, PathBuf};

use venvman_backend::{PythonRequest, VenvError, parse_python_version_output};
use venvman_platform::python_executable_path;
use venvman_shell::run_program;

const DEFAULT_INTERPRETERS: [&str; 2] = ["python3", "python"];

/// The interpreter inside an environment, which must exist.
pub fn environment_python(env_dir: &Path) -> Result<PathBuf, VenvError> {
    let python = python_executable_path(env_dir);
    if python.is_file() {
        Ok(python)
    } else {
        Err(VenvError::NotAVirtualEnv {
            path: env_dir.to_path_buf(),
        })
    }
}

/// First line of `python --version` for the environment's interpreter,
/// e.g. `Python 3.11.4`.
pub async fn python_name(env_dir: &Path) -> Result<String, VenvError> {
    let python = environment_python(env_dir)?;
    let output = run_program(&python, ["--version"]).await?;
    let command = format!("{} --version", python.display());

    // Python 2 prints its version on stderr.
    let text = if output.stdout.trim().is_empty() {
        output.stderr.clone()
    } else {
        output.stdout.clone()
    };
    output.into_checked(&command, &[0])?;

    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| VenvError::parse("python version output", command))
}

pub async fn python_version(env_dir: &Path) -> Result<String, VenvError> {
    let name = python_name(env_dir).await?;
    parse_python_version_output(&name)
}

/// Find the interpreter a new environment should be built from.
pub fn find_interpreter(request: Option<&PythonRequest>) -> Result<PathBuf, VenvError> {
    let Some(request) = request else {
        return DEFAULT_INTERPRETERS
            .iter()
            .find_map(|name| which::which(name).ok())
            .ok_or_else(|| VenvError::PythonNotFound {
                python: DEFAULT_INTERPRETERS.join(" or "),
            });
    };

    if let PythonRequest::Executable(candidate) = request {
        let path = Path::new(candidate);
        if path.components().count() > 1 {
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(VenvError::PythonNotFound {
                    python: candidate.clone(),
                })
            };
        }
    }

    let name = request.executable_name();
    let found = which::which(&name).map_err(|_| VenvError::PythonNotFound {
        python: name.clone(),
    })?;
    debug!("Resolved python request {request} to {}", found.display());
    Ok(found)
}

/// Install requirements into an environment with its own pip.
pub async fn pip_install(
    env_dir: &Path,
    requirements: &[String],
    requirements_file: Option<&Path>,
) -> Result<(), VenvError> {
    if requirements.is_empty() && requirements_file.is_none() {
        return Ok(());
    }

    let python = environment_python(env_dir)?;
    let mut args: Vec<String> = vec![
        "-m".to_string(),
        "pip".to_string(),
        "install".to_string(),
        "--quiet".to_string(),
    ];
    args.extend(requirements.iter().cloned());
    if let Some(file) = requirements_file {
        args.push("-r".to_string());
        args.push(file.to_string_lossy().into_owned());
    }

    info!(
        "Installing into {}: {}",
        env_dir.display(),
        args[4..].join(" ")
    );
    let command = format!("{} {}", python.display(), args.join(" "));
    run_program(&python, &args)
        .await?
        .into_checked(&command, &[0])?;
    Ok(())
}
