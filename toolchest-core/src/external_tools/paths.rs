//! Data-directory resolution for installed tools.
//!
//! Downloads and installed executables share one flat data directory:
//!
//! - `$TOOLCHEST_DATA_DIR` when set
//! - otherwise the OS data directory (`~/.local/share/toolchest` on Linux,
//!   `~/Library/Application Support/toolchest` on macOS,
//!   `%APPDATA%\toolchest` on Windows)
//! - otherwise `{temp}/toolchest`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TOOLCHEST_DATA_DIR";

/// Subdirectory name under the OS data folder.
const APP_DIR: &str = "toolchest";

// ============================================================================
// Path Resolution
// ============================================================================

/// Returns the data directory to install tools into.
pub fn default_data_dir() -> PathBuf {
    resolve_data_dir(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn resolve_data_dir(env_override: Option<PathBuf>) -> PathBuf {
    match env_override.filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR),
    }
}

/// Makes `path` absolute against the current working directory.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

/// Ensures the data directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}
