//! Backend drivers for the tools venvman delegates to.

#![allow(clippy::missing_errors_doc)]

mod conda;
pub mod interpreter;
mod parse;
mod pyenv;
mod venv;
mod wrapper;

use venvman_backend::Driver;
use venvman_shell::Settings;

pub use conda::CondaDriver;
pub use parse::{
    CondaEnvironment, parse_conda_environments, parse_conda_location, parse_destination,
    parse_name_listing, parse_pyenv_listing,
};
pub use pyenv::PyenvDriver;
pub use venv::VenvDriver;
pub use wrapper::{WrapperDriver, WrapperFlavor};

/// Every built-in driver, in default priority order.
#[must_use]
pub fn builtin_drivers(settings: &Settings) -> Vec<Box<dyn Driver>> {
    vec![
        Box::new(WrapperDriver::virtualenvwrapper(settings.clone())),
        Box::new(WrapperDriver::virtualenv_sh(settings.clone())),
        Box::new(PyenvDriver::new(settings.clone())),
        Box::new(CondaDriver::new(settings.clone())),
        Box::new(VenvDriver::new(settings.clone())),
    ]
}
