//! Create, list, resolve and remove Python virtual environments through
//! whichever backend tool is installed: virtualenvwrapper, virtualenv-sh,
//! pyenv-virtualenv, conda, or plain `python -m venv` directories.
//!
//! ```no_run
//! # async fn demo() -> Result<(), venvman::VenvError> {
//! let path = venvman::make_virtual_env("demo", Some("3.11")).await?;
//! let version = venvman::python_version(&path).await?;
//! venvman::remove_virtual_env("demo").await?;
//! # let _ = version;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_errors_doc)]

mod api;
mod registry;

pub use api::{
    VenvManager, check_environment, discard_virtual_env, driver_name, ensure_virtual_env,
    has_driver, list_virtual_envs, make_virtual_env, make_virtual_env_with, python_executable_path,
    python_name, python_version, remove_virtual_env, resolve_virtual_env, with_virtual_env,
};
pub use registry::{DriverRegistry, preferred_order};

pub use venvman_backend::{
    Driver, DriverKind, DriverStatus, MakeOptions, PackageSpec, PythonRequest, VenvError,
    compatible_versions, read_pyvenv_config,
};
pub use venvman_shell::{CommandOutput, Settings};
