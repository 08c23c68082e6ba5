mod error;
mod traits;
mod types;

pub use error::VenvError;
pub use traits::{Driver, DriverKind, DriverStatus};
pub use types::{
    MakeOptions, PackageSpec, PythonRequest, compatible_versions, parse_python_version_output,
    read_pyvenv_config, validate_name,
};
