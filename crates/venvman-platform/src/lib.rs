mod commands;
mod paths;

pub use commands::CapturedCommand;
pub use paths::{AppPaths, AppPathsError, default_venvs_dir, expand, python_executable_path};
