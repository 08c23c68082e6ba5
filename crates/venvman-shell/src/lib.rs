#![allow(clippy::missing_errors_doc)]

mod command;
mod exec;
mod locate;
mod settings;

pub use command::{ShellInvocation, quote};
pub use exec::{
    COMMAND_NOT_FOUND_STATUS, CommandOutput, Executor, has_interactive_warning,
    remove_interactive_shell_warnings, run_program,
};
pub use locate::Shell;
pub use settings::{
    EXCLUDED_DRIVERS_VAR, INTERACTIVE_SHELL_VAR, LOGIN_SHELL_VAR, PREFERRED_DRIVERS_VAR,
    SETUP_FILEPATH_VAR, SHELL_VAR, Settings, USE_SETUP_VAR, VENV_DIR_VAR, WORKON_HOME_VAR,
    parse_bool, parse_list,
};
