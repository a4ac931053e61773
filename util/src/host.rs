//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software
/// checkout, which contains the `params` and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "ARTEMIS_SW_ROOT";

/// Get the software root directory from the environment.
pub fn get_artemis_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
