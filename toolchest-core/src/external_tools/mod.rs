//! Provisioning of pinned third-party command-line tools.
//!
//! Tools are downloaded on demand from fixed HTTPS URLs, verified against
//! registry checksums and unpacked into one data directory. A tool counts as
//! installed once all of its executables carry the executable bit, which is
//! the last thing an install writes.
//!
//! # Architecture
//!
//! - `types`: Core types (ToolId, PlatformTag, ToolSpec, InstalledArtifact)
//! - `catalog`: Static tool definitions with download URLs and checksums
//! - `integrity`: Streaming BLAKE3 / SHA-256 file hashing
//! - `downloader`: Verified, cached downloads over a pluggable transport
//! - `extractor`: Archive extraction (zip, tar.gz)
//! - `hooks`: Per-tool post-install fix-ups
//! - `installer`: Single-tool, single-flight installation
//! - `manager`: High-level API and concurrent batch installs
//! - `env`: Launch commands for installed tools
//! - `paths`: Data-directory resolution
//!
//! # Example
//!
//! ```ignore
//! use toolchest_core::{ExternalToolManager, ProvisionConfig, ToolId};
//!
//! let manager = ExternalToolManager::new(ProvisionConfig::from_env())?;
//! let ffprobe = manager.install(ToolId::Ffprobe).await?;
//! println!("ffprobe installed at: {}", ffprobe.path().display());
//! ```

pub mod catalog;
pub mod downloader;
pub mod env;
pub mod error;
pub mod extractor;
pub mod hooks;
pub mod installer;
pub mod integrity;
pub mod manager;
pub mod paths;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use catalog::{get_all_tool_definitions, get_tool_definition};
pub use downloader::{Fetcher, HttpTransport, Transport};
pub use env::command_for;
pub use error::{ExtractError, FetchError, InstallError, InstallStep};
pub use extractor::{extract, Selector};
pub use hooks::{DarwinLibraryLink, NoHook, PostInstallHook};
pub use installer::{InstallContext, ToolInstaller};
pub use integrity::{hash_file, verify};
pub use manager::{ExternalToolManager, InstallReport, ToolInfo};
pub use paths::{default_data_dir, DATA_DIR_ENV};
pub use types::{
    ArchiveFormat, ArchiveLayout, Bitness, Checksum, ChecksumSource, HashAlgorithm,
    InstalledArtifact, Os, PlatformSpecs, PlatformTag, ToolDefinition, ToolId, ToolSpec,
    ToolStatus,
};
