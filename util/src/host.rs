//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the linecar software from the environment.
///
/// The `LINECAR_SW_ROOT` variable shall point at the repository root, which
/// contains the `params` and `sessions` directories.
pub fn get_linecar_sw_root() -> Result<PathBuf, env::VarError> {
    Ok(PathBuf::from(env::var("LINECAR_SW_ROOT")?))
}
