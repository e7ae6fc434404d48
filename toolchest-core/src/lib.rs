//! Toolchest Core Library
//!
//! Installs a fixed set of native command-line tools (exiv2, fpcalc, ffprobe,
//! ffmpeg, Apache Tika and the Java runtime Tika needs) into a local data
//! directory and hands back paths to their executables.
//!
//! - Platform-aware selection of pinned downloads
//! - Checksum verification before anything is unpacked
//! - Idempotent, single-flight installs
//! - Concurrent batch installs with a bounded worker pool

pub mod config;
pub mod external_tools;

// Re-exports for convenience
pub use config::{ProvisionConfig, DEFAULT_MAX_CONCURRENCY};
pub use external_tools::{
    ExternalToolManager, InstallError, InstallReport, InstalledArtifact, PlatformTag, ToolId,
    ToolInfo, ToolStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Installs every managed tool with `config`.
///
/// Returns true iff all tools are installed afterwards. Per-tool failures are
/// logged; use [`ExternalToolManager::install_all_report`] to inspect them.
pub async fn install_all(config: ProvisionConfig) -> anyhow::Result<bool> {
    let manager = ExternalToolManager::new(config)?;
    Ok(manager.install_all().await)
}
