//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use venvman::{MakeOptions, PackageSpec, PythonRequest};

/// Manage Python virtual environments with whichever backend is installed.
#[derive(Parser, Debug)]
#[command(name = "venvman")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// More output; repeat for debug and trace logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to the default log file in the data directory
    #[arg(long, global = true)]
    pub log: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the environments known to the selected driver
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Create an environment
    Make(MakeArgs),

    /// Remove an environment
    Remove {
        name: String,

        /// Succeed even if the environment does not exist
        #[arg(long)]
        discard: bool,
    },

    /// Print the directory of an environment
    Resolve { name: String },

    /// Create an environment unless a compatible one exists
    Ensure {
        name: String,

        /// Required interpreter version; "3.8" matches "3.8.2"
        #[arg(long)]
        version: Option<String>,

        /// Replace an existing environment with an incompatible version
        #[arg(long)]
        force: bool,
    },

    /// Print the interpreter version of the environment at PATH
    PythonVersion { path: PathBuf },

    /// Print the name of the driver that would handle operations
    Driver,

    /// Show every registered driver and whether it is usable
    Drivers {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Source the setup file with its output visible
    Check,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MakeArgs {
    pub name: String,

    /// Interpreter: a version such as 3.11, an executable name, or a path
    #[arg(long)]
    pub python: Option<PythonRequest>,

    /// Project directory to associate with the environment
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Package to install after creation (repeatable)
    #[arg(short = 'i', long = "install", value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Requirements file to install after creation
    #[arg(short = 'r', long, value_name = "FILE")]
    pub requirements: Option<PathBuf>,

    /// Give the environment access to the system site-packages
    #[arg(long)]
    pub system_site_packages: bool,

    /// pip: default, no, latest, bundle, or a version
    #[arg(long, value_name = "SPEC", default_value = "default")]
    pub pip: PackageSpec,

    /// setuptools: default, no, latest, bundle, or a version
    #[arg(long, value_name = "SPEC", default_value = "default")]
    pub setuptools: PackageSpec,

    /// wheel: default, no, latest, bundle, or a version
    #[arg(long, value_name = "SPEC", default_value = "default")]
    pub wheel: PackageSpec,
}

impl MakeArgs {
    #[must_use]
    pub fn options(&self) -> MakeOptions {
        MakeOptions {
            python: self.python.clone(),
            project_path: self.project.clone(),
            packages: self.packages.clone(),
            requirements_file: self.requirements.clone(),
            system_site_packages: self.system_site_packages,
            pip: self.pip.clone(),
            setuptools: self.setuptools.clone(),
            wheel: self.wheel.clone(),
        }
    }
}
