//! Core types for external tool provisioning.
//!
//! This module defines the foundational types used across the external tools
//! infrastructure: tool identifiers, platform detection, checksums, archive
//! layouts, per-platform registry entries and installed artifacts.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::error::InstallError;
use super::hooks::PostInstallHook;

// ============================================================================
// External Tool Identifiers
// ============================================================================

/// Unique identifier for each managed tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolId {
    /// Exiv2 - image metadata extractor.
    Exiv2,
    /// fpcalc - Chromaprint audio fingerprinter.
    Fpcalc,
    /// ffprobe - media stream prober.
    Ffprobe,
    /// ffmpeg - media transcoder.
    Ffmpeg,
    /// Apache Tika - document text and metadata extractor.
    Tika,
    /// Java runtime used to launch Tika.
    Java,
}

impl ToolId {
    /// Returns all managed tool IDs.
    pub fn all() -> &'static [ToolId] {
        &[
            Self::Exiv2,
            Self::Fpcalc,
            Self::Ffprobe,
            Self::Ffmpeg,
            Self::Tika,
            Self::Java,
        ]
    }

    /// Returns the lowercase string identifier for this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exiv2 => "exiv2",
            Self::Fpcalc => "fpcalc",
            Self::Ffprobe => "ffprobe",
            Self::Ffmpeg => "ffmpeg",
            Self::Tika => "tika",
            Self::Java => "java",
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exiv2" | "exiv" => Ok(Self::Exiv2),
            "fpcalc" | "chromaprint" => Ok(Self::Fpcalc),
            "ffprobe" => Ok(Self::Ffprobe),
            "ffmpeg" => Ok(Self::Ffmpeg),
            "tika" => Ok(Self::Tika),
            "java" | "jre" => Ok(Self::Java),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Operating system family of a platform tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Linux,
    Darwin,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Darwin => "darwin",
        }
    }

    /// Maps a host OS name (`std::env::consts::OS` style) to an OS family.
    fn from_host_name(name: &str) -> Option<Self> {
        match name {
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::Darwin),
            _ => None,
        }
    }
}

/// Pointer width of a platform tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bitness {
    B32,
    B64,
}

impl Bitness {
    pub fn bits(&self) -> u32 {
        match self {
            Self::B32 => 32,
            Self::B64 => 64,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::B32),
            64 => Some(Self::B64),
            _ => None,
        }
    }
}

/// Canonical `(os, bitness)` key used to select platform-specific downloads.
///
/// Rendered as `"<os>-<bits>"`, e.g. `linux-64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformTag {
    pub os: Os,
    pub bitness: Bitness,
}

impl PlatformTag {
    pub const WINDOWS_64: PlatformTag = PlatformTag::new(Os::Windows, Bitness::B64);
    pub const LINUX_64: PlatformTag = PlatformTag::new(Os::Linux, Bitness::B64);
    pub const DARWIN_64: PlatformTag = PlatformTag::new(Os::Darwin, Bitness::B64);

    pub const fn new(os: Os, bitness: Bitness) -> Self {
        Self { os, bitness }
    }

    /// Returns the tag of the running host.
    ///
    /// Resolved once per process. Fails with [`InstallError::UnsupportedHost`]
    /// when the host OS or pointer width is not recognized.
    pub fn current() -> Result<Self, InstallError> {
        static HOST: OnceLock<Option<PlatformTag>> = OnceLock::new();

        (*HOST.get_or_init(|| Self::from_host(std::env::consts::OS, usize::BITS)))
            .ok_or_else(|| InstallError::UnsupportedHost {
                os: std::env::consts::OS.to_string(),
                bits: usize::BITS,
            })
    }

    fn from_host(os: &str, pointer_bits: u32) -> Option<Self> {
        Some(Self::new(
            Os::from_host_name(os)?,
            Bitness::from_bits(pointer_bits)?,
        ))
    }

    /// Returns the canonical key string, e.g. `darwin-64`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.os.as_str(), self.bitness.bits())
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.bitness.bits())
    }
}

impl std::str::FromStr for PlatformTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (os, bits) = lower
            .split_once('-')
            .ok_or_else(|| format!("Invalid platform tag: {}", s))?;
        let os = Os::from_host_name(os).ok_or_else(|| format!("Unknown OS in platform tag: {}", s))?;
        let bitness = bits
            .parse::<u32>()
            .ok()
            .and_then(Bitness::from_bits)
            .ok_or_else(|| format!("Unknown bitness in platform tag: {}", s))?;
        Ok(Self::new(os, bitness))
    }
}

impl TryFrom<String> for PlatformTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlatformTag> for String {
    fn from(tag: PlatformTag) -> Self {
        tag.key()
    }
}

// ============================================================================
// Checksums
// ============================================================================

/// Content hash algorithm used for a registry checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Blake3,
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Expected content hash of a download, as hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    pub hex: Cow<'static, str>,
}

impl Checksum {
    pub const fn blake3(hex: &'static str) -> Self {
        Self {
            algorithm: HashAlgorithm::Blake3,
            hex: Cow::Borrowed(hex),
        }
    }

    pub const fn sha256(hex: &'static str) -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            hex: Cow::Borrowed(hex),
        }
    }

    pub fn new(algorithm: HashAlgorithm, hex: impl Into<Cow<'static, str>>) -> Self {
        Self {
            algorithm,
            hex: hex.into(),
        }
    }

    /// Compares against a computed hex digest, ignoring case.
    pub fn matches(&self, actual_hex: &str) -> bool {
        self.hex.eq_ignore_ascii_case(actual_hex)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Where the expected checksum of a download comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumSource {
    /// Digest recorded in the registry.
    Pinned(Checksum),
    /// Digest file published next to the asset, `<hex>  <file name>` format.
    Published {
        algorithm: HashAlgorithm,
        url: &'static str,
    },
}

impl From<Checksum> for ChecksumSource {
    fn from(checksum: Checksum) -> Self {
        Self::Pinned(checksum)
    }
}

// ============================================================================
// Archive Formats and Layouts
// ============================================================================

/// Container format of a downloaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip)
    Zip,
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or file name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// Infers the archive format from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_name)
    }
}

/// How the installable files are obtained from a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// The download is the artifact itself (no container).
    Direct,
    /// Unpack every member next to the archive; executables live at known
    /// relative paths inside it.
    ExtractAll,
    /// Copy the first regular member whose base name equals `member` to the
    /// tool's binary path.
    PickMember { member: &'static str },
}

// ============================================================================
// Registry Entries
// ============================================================================

/// Registry entry for one tool on one platform.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// HTTPS download URL.
    pub url: &'static str,
    /// Expected checksum of the downloaded file.
    pub checksum: ChecksumSource,
    /// How to get the executables out of the download.
    pub layout: ArchiveLayout,
    /// Primary executable, relative to the data directory.
    pub binary: &'static str,
    /// Further executables shipped with the tool, relative to the data directory.
    pub companions: &'static [&'static str],
}

/// Per-platform registry entries for a tool.
///
/// Only 64-bit platforms carry entries; 32-bit hosts are unsupported.
#[derive(Debug, Clone)]
pub struct PlatformSpecs {
    pub windows_64: Option<ToolSpec>,
    pub linux_64: Option<ToolSpec>,
    pub darwin_64: Option<ToolSpec>,
}

impl PlatformSpecs {
    /// Returns the entry for the given platform.
    pub fn get(&self, platform: PlatformTag) -> Option<&ToolSpec> {
        match (platform.os, platform.bitness) {
            (Os::Windows, Bitness::B64) => self.windows_64.as_ref(),
            (Os::Linux, Bitness::B64) => self.linux_64.as_ref(),
            (Os::Darwin, Bitness::B64) => self.darwin_64.as_ref(),
            (_, Bitness::B32) => None,
        }
    }

    /// Iterates over every registered entry.
    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        [&self.windows_64, &self.linux_64, &self.darwin_64]
            .into_iter()
            .flatten()
    }
}

/// Complete definition of a managed tool.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Unique identifier for this tool.
    pub id: ToolId,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// Brief description of what the tool does.
    pub description: &'static str,
    /// Pinned version.
    pub version: &'static str,
    /// Runtime the tool is launched through; installed before the tool itself.
    pub runtime: Option<ToolId>,
    /// Platform-specific registry entries.
    pub specs: PlatformSpecs,
    /// Fix-up run after extraction, before executables are marked.
    pub hook: &'static dyn PostInstallHook,
}

impl ToolDefinition {
    /// Returns the registry entry for the given platform.
    pub fn spec(&self, platform: PlatformTag) -> Option<&ToolSpec> {
        self.specs.get(platform)
    }
}

// ============================================================================
// Installed Artifacts
// ============================================================================

/// An installed tool: its primary executable and any companions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub tool: ToolId,
    path: PathBuf,
    companions: Vec<PathBuf>,
}

impl InstalledArtifact {
    pub fn new(tool: ToolId, path: PathBuf, companions: Vec<PathBuf>) -> Self {
        Self {
            tool,
            path,
            companions,
        }
    }

    /// Absolute path to the primary executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn companions(&self) -> &[PathBuf] {
        &self.companions
    }

    /// Every executable of the artifact, companions first.
    pub fn executables(&self) -> impl Iterator<Item = &Path> {
        self.companions
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(self.path.as_path()))
    }

    /// True when every executable exists and is marked executable.
    pub fn is_installed(&self) -> bool {
        self.executables().all(is_executable)
    }
}

/// Checks if `path` is a regular file with an executable bit set.
///
/// On Windows, existence as a regular file is the equivalent.
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

// ============================================================================
// Tool Status
// ============================================================================

/// Current installation status of a managed tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// Tool is not installed.
    NotInstalled,
    /// Tool is installed and ready to use.
    Installed {
        /// Path to the primary executable.
        path: PathBuf,
    },
    /// Tool is not supported on this platform.
    UnsupportedPlatform,
}

impl ToolStatus {
    /// Returns true if the tool is ready to use.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_id_as_str() {
        assert_eq!(ToolId::Exiv2.as_str(), "exiv2");
        assert_eq!(ToolId::Fpcalc.as_str(), "fpcalc");
        assert_eq!(ToolId::Ffprobe.as_str(), "ffprobe");
        assert_eq!(ToolId::Ffmpeg.as_str(), "ffmpeg");
        assert_eq!(ToolId::Tika.as_str(), "tika");
        assert_eq!(ToolId::Java.as_str(), "java");
    }

    #[test]
    fn test_tool_id_from_str() {
        assert_eq!("exiv2".parse::<ToolId>().unwrap(), ToolId::Exiv2);
        assert_eq!("chromaprint".parse::<ToolId>().unwrap(), ToolId::Fpcalc);
        assert_eq!("FFMPEG".parse::<ToolId>().unwrap(), ToolId::Ffmpeg);
        assert_eq!("jre".parse::<ToolId>().unwrap(), ToolId::Java);
        assert!("unknown".parse::<ToolId>().is_err());
    }

    #[test]
    fn test_tool_id_all() {
        let all = ToolId::all();
        assert_eq!(all.len(), 6);
        for id in all {
            assert_eq!(id.as_str().parse::<ToolId>().unwrap(), *id);
        }
    }

    #[test]
    fn test_platform_tag_key() {
        assert_eq!(PlatformTag::LINUX_64.key(), "linux-64");
        assert_eq!(PlatformTag::DARWIN_64.to_string(), "darwin-64");
        assert_eq!(
            PlatformTag::new(Os::Windows, Bitness::B32).key(),
            "windows-32"
        );
    }

    #[test]
    fn test_platform_tag_parse() {
        assert_eq!(
            "linux-64".parse::<PlatformTag>().unwrap(),
            PlatformTag::LINUX_64
        );
        assert_eq!(
            "macos-64".parse::<PlatformTag>().unwrap(),
            PlatformTag::DARWIN_64
        );
        assert!("linux".parse::<PlatformTag>().is_err());
        assert!("beos-64".parse::<PlatformTag>().is_err());
        assert!("linux-16".parse::<PlatformTag>().is_err());
    }

    #[test]
    fn test_platform_tag_serde_as_string() {
        let json = serde_json::to_string(&PlatformTag::WINDOWS_64).unwrap();
        assert_eq!(json, "\"windows-64\"");
        let back: PlatformTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlatformTag::WINDOWS_64);
    }

    #[test]
    fn test_platform_from_host() {
        assert_eq!(
            PlatformTag::from_host("macos", 64),
            Some(PlatformTag::DARWIN_64)
        );
        assert_eq!(
            PlatformTag::from_host("linux", 32),
            Some(PlatformTag::new(Os::Linux, Bitness::B32))
        );
        assert_eq!(PlatformTag::from_host("freebsd", 64), None);
        assert_eq!(PlatformTag::from_host("linux", 128), None);
    }

    #[test]
    fn test_platform_current_is_stable() {
        #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
        {
            let first = PlatformTag::current().unwrap();
            assert_eq!(PlatformTag::current().unwrap(), first);
        }
    }

    #[test]
    fn test_checksum_matches_ignores_case() {
        let checksum = Checksum::blake3("ABCDEF0123");
        assert!(checksum.matches("abcdef0123"));
        assert!(checksum.matches("ABCDEF0123"));
        assert!(!checksum.matches("abcdef0124"));
    }

    #[test]
    fn test_archive_format_from_name() {
        assert_eq!(
            ArchiveFormat::from_name("https://example.com/tool.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_name("tool.TGZ"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_name("tool-1.0-linux-64.zip"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::from_name("tool.tar.xz"), None);
        assert_eq!(ArchiveFormat::from_name("tool.jar"), None);
    }

    #[test]
    fn test_platform_specs_32_bit_unsupported() {
        let spec = ToolSpec {
            url: "https://example.test/tool.zip",
            checksum: Checksum::blake3("00").into(),
            layout: ArchiveLayout::Direct,
            binary: "tool",
            companions: &[],
        };
        let specs = PlatformSpecs {
            windows_64: Some(spec.clone()),
            linux_64: Some(spec.clone()),
            darwin_64: Some(spec),
        };

        assert!(specs.get(PlatformTag::LINUX_64).is_some());
        assert!(specs.get(PlatformTag::new(Os::Linux, Bitness::B32)).is_none());
        assert!(specs.get(PlatformTag::new(Os::Windows, Bitness::B32)).is_none());
        assert_eq!(specs.iter().count(), 3);
    }

    #[test]
    fn test_tool_status_is_ready() {
        assert!(!ToolStatus::NotInstalled.is_ready());
        assert!(ToolStatus::Installed {
            path: PathBuf::from("/opt/tool")
        }
        .is_ready());
        assert!(!ToolStatus::UnsupportedPlatform.is_ready());
    }

    #[cfg(unix)]
    #[test]
    fn test_artifact_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let binary = temp_dir.path().join("tool");
        let companion = temp_dir.path().join("tool-json");
        std::fs::write(&binary, b"#!/bin/sh\n").unwrap();
        std::fs::write(&companion, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();
        std::fs::set_permissions(&companion, std::fs::Permissions::from_mode(0o755)).unwrap();

        let artifact = InstalledArtifact::new(ToolId::Exiv2, binary.clone(), vec![companion]);
        assert!(!artifact.is_installed(), "existence alone is not enough");

        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(artifact.is_installed());
    }

    #[test]
    fn test_artifact_missing_file_not_installed() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let artifact = InstalledArtifact::new(ToolId::Ffmpeg, temp_dir.path().join("ffmpeg"), vec![]);
        assert!(!artifact.is_installed());
        assert!(!is_executable(temp_dir.path()));
    }
}
