//! Error types for tool provisioning.
//!
//! Leaf components report [`FetchError`] and [`ExtractError`]; installers wrap
//! them in [`InstallError`] together with the tool that failed.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::types::ToolId;

/// Errors raised while fetching and verifying a download.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Only https downloads are supported: {0}")]
    InsecureUrl(String),

    #[error("Invalid download URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid digest file {url}: {reason}")]
    InvalidDigest { url: String, reason: String },

    #[error("Failed integrity check for {}: expected {expected}, got {actual}", .path.display())]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Download of {url} failed: {source:#}")]
    Transport {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised while extracting an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported archive format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Archive {} has no member {member}", .archive.display())]
    MemberNotFound { archive: PathBuf, member: String },

    #[error("Failed to read zip archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Installation step a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Resolve,
    Download,
    Extract,
    Permissions,
    Dependency,
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Permissions => "permissions",
            Self::Dependency => "dependency",
        };
        f.write_str(name)
    }
}

/// A failed `ensure_installed` call.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Unsupported host platform: {os} ({bits}-bit)")]
    UnsupportedHost { os: String, bits: u32 },

    #[error("Platform {platform} is not supported for {tool}")]
    UnsupportedPlatform { tool: ToolId, platform: String },

    #[error("{tool} is not managed by this installer set")]
    NotManaged { tool: ToolId },

    #[error("{tool}: download failed: {source}")]
    Download {
        tool: ToolId,
        #[source]
        source: FetchError,
    },

    #[error("{tool}: extract failed: {source}")]
    Extract {
        tool: ToolId,
        #[source]
        source: ExtractError,
    },

    #[error("{tool}: post-install fix-up failed for {}: {source}", .path.display())]
    Hook {
        tool: ToolId,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{tool}: could not mark {} executable: {source}", .path.display())]
    Permissions {
        tool: ToolId,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{tool}: {} is not executable after install", .path.display())]
    NotExecutable { tool: ToolId, path: PathBuf },

    #[error("{tool}: required runtime {dependency} is not available: {reason}")]
    Dependency {
        tool: ToolId,
        dependency: ToolId,
        reason: String,
    },

    #[error("{tool}: install timed out after {}s", .after.as_secs())]
    TimedOut { tool: ToolId, after: Duration },

    #[error("{tool}: install task aborted: {reason}")]
    Aborted { tool: ToolId, reason: String },
}

impl InstallError {
    /// Tool the failure belongs to, if any.
    pub fn tool(&self) -> Option<ToolId> {
        match self {
            Self::UnsupportedHost { .. } => None,
            Self::UnsupportedPlatform { tool, .. }
            | Self::NotManaged { tool }
            | Self::Download { tool, .. }
            | Self::Extract { tool, .. }
            | Self::Hook { tool, .. }
            | Self::Permissions { tool, .. }
            | Self::NotExecutable { tool, .. }
            | Self::Dependency { tool, .. }
            | Self::TimedOut { tool, .. }
            | Self::Aborted { tool, .. } => Some(*tool),
        }
    }

    /// Installation step that failed.
    pub fn step(&self) -> InstallStep {
        match self {
            Self::UnsupportedHost { .. }
            | Self::UnsupportedPlatform { .. }
            | Self::NotManaged { .. } => InstallStep::Resolve,
            Self::Download { .. } | Self::TimedOut { .. } | Self::Aborted { .. } => {
                InstallStep::Download
            }
            Self::Extract { .. } => InstallStep::Extract,
            Self::Hook { .. } | Self::Permissions { .. } | Self::NotExecutable { .. } => {
                InstallStep::Permissions
            }
            Self::Dependency { .. } => InstallStep::Dependency,
        }
    }

    /// True when the failure is a checksum mismatch after a fresh download.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::Download {
                source: FetchError::Integrity { .. },
                ..
            }
        )
    }
}
