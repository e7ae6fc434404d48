//! Tool catalog with hardcoded definitions.
//!
//! Download URLs, checksums and archive layouts for every managed tool. Local
//! file names carry the tool version, which keeps each tool's files disjoint
//! inside the shared data directory.

use super::hooks::{DarwinLibraryLink, NoHook};
use super::types::{
    ArchiveLayout, Checksum, ChecksumSource, HashAlgorithm, PlatformSpecs, ToolDefinition, ToolId,
    ToolSpec,
};

const BINARIES_BASE: &str = "https://github.com/iscc/iscc-binaries/releases/download/v1.0.0";

macro_rules! binaries_url {
    ($file:literal) => {
        concat!(
            "https://github.com/iscc/iscc-binaries/releases/download/v1.0.0/",
            $file
        )
    };
}

// ============================================================================
// Exiv2 Definition
// ============================================================================

const EXIV2_VERSION: &str = "0.27.5";

static EXIV2_DYLIB_LINK: DarwinLibraryLink = DarwinLibraryLink {
    library: "libexiv2.27.dylib",
};

static EXIV2_DEFINITION: ToolDefinition = ToolDefinition {
    id: ToolId::Exiv2,
    display_name: "Exiv2",
    description: "Image metadata reader and writer",
    version: EXIV2_VERSION,
    runtime: None,
    specs: PlatformSpecs {
        windows_64: Some(ToolSpec {
            url: binaries_url!("exiv2-0.27.5-2019msvc64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "3e00112648ed98a60a381fc3c6dd10ec263b1d56dec4f07dce86a7736517ebcd",
            )),
            layout: ArchiveLayout::ExtractAll,
            binary: "exiv2-0.27.5-2019msvc64/bin/exiv2.exe",
            companions: &["exiv2-0.27.5-2019msvc64/bin/exiv2json.exe"],
        }),
        linux_64: Some(ToolSpec {
            url: binaries_url!("exiv2-0.27.5-Linux64.tar.gz"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "6c6339f7f575ed794c4669e7eab4ef400a6cf7981f78ea26fc985d24d9620d58",
            )),
            layout: ArchiveLayout::ExtractAll,
            binary: "exiv2-0.27.5-Linux64/bin/exiv2",
            companions: &["exiv2-0.27.5-Linux64/bin/exiv2json"],
        }),
        darwin_64: Some(ToolSpec {
            url: binaries_url!("exiv2-0.27.5-Darwin.tar.gz"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "aaf574fa910721fdc653519a2ca8ecf3d4e9b06213167ad630fcb9e18d329af4",
            )),
            layout: ArchiveLayout::ExtractAll,
            binary: "exiv2-0.27.5-Darwin/bin/exiv2",
            companions: &["exiv2-0.27.5-Darwin/bin/exiv2json"],
        }),
    },
    hook: &EXIV2_DYLIB_LINK,
};

// ============================================================================
// fpcalc Definition
// ============================================================================

const FPCALC_VERSION: &str = "1.5.1";

static FPCALC_DEFINITION: ToolDefinition = ToolDefinition {
    id: ToolId::Fpcalc,
    display_name: "fpcalc",
    description: "Chromaprint audio fingerprint calculator",
    version: FPCALC_VERSION,
    runtime: None,
    specs: PlatformSpecs {
        windows_64: Some(ToolSpec {
            url: binaries_url!("chromaprint-fpcalc-1.5.1-windows-x86_64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "e29364a879ddf7bea403b0474a556e43f40d525e0d8d5adb81578f1fbf16d9ba",
            )),
            layout: ArchiveLayout::PickMember {
                member: "fpcalc.exe",
            },
            binary: "fpcalc-1.5.1.exe",
            companions: &[],
        }),
        linux_64: Some(ToolSpec {
            url: binaries_url!("chromaprint-fpcalc-1.5.1-linux-x86_64.tar.gz"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "190977d9419daed8a555240b9c6ddf6a12940c5ff470647095ee6242e217de5c",
            )),
            layout: ArchiveLayout::PickMember { member: "fpcalc" },
            binary: "fpcalc-1.5.1",
            companions: &[],
        }),
        darwin_64: Some(ToolSpec {
            url: binaries_url!("chromaprint-fpcalc-1.5.1-macos-x86_64.tar.gz"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "afea164b0bc9b91e5205d126f96a21836a91ea2d24200e1b7612a7304ea3b4f1",
            )),
            layout: ArchiveLayout::PickMember { member: "fpcalc" },
            binary: "fpcalc-1.5.1",
            companions: &[],
        }),
    },
    hook: &NoHook,
};

// ============================================================================
// FFmpeg Definitions
// ============================================================================

const FFMPEG_VERSION: &str = "4.4.1";

static FFPROBE_DEFINITION: ToolDefinition = ToolDefinition {
    id: ToolId::Ffprobe,
    display_name: "ffprobe",
    description: "Media stream and container inspector",
    version: FFMPEG_VERSION,
    runtime: None,
    specs: PlatformSpecs {
        windows_64: Some(ToolSpec {
            url: binaries_url!("ffprobe-4.4.1-win-64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "6c6c7d49465f70f3a4c60dc2d5aeddb4049527c82ee6e2b4c6ad0a2a9fc9188e",
            )),
            layout: ArchiveLayout::PickMember {
                member: "ffprobe.exe",
            },
            binary: "ffprobe-4.4.1.exe",
            companions: &[],
        }),
        linux_64: Some(ToolSpec {
            url: binaries_url!("ffprobe-4.4.1-linux-64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "bfa86d00341cacbbcaad6c38c706ad1df9f268b1d1e5a1f19206ab47a95aad8f",
            )),
            layout: ArchiveLayout::PickMember { member: "ffprobe" },
            binary: "ffprobe-4.4.1",
            companions: &[],
        }),
        darwin_64: Some(ToolSpec {
            url: binaries_url!("ffprobe-4.4.1-osx-64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "1904fdf6d0250e3c44aa5f44b0bf31033b40329f1c3e51d3d06438273174506d",
            )),
            layout: ArchiveLayout::PickMember { member: "ffprobe" },
            binary: "ffprobe-4.4.1",
            companions: &[],
        }),
    },
    hook: &NoHook,
};

static FFMPEG_DEFINITION: ToolDefinition = ToolDefinition {
    id: ToolId::Ffmpeg,
    display_name: "ffmpeg",
    description: "Media transcoder",
    version: FFMPEG_VERSION,
    runtime: None,
    specs: PlatformSpecs {
        windows_64: Some(ToolSpec {
            url: binaries_url!("ffmpeg-4.4.1-win-64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "b77405ee98580971cb36c4ca0c7f888283dcffc347c282b304abbb3c1eee6fc2",
            )),
            layout: ArchiveLayout::PickMember {
                member: "ffmpeg.exe",
            },
            binary: "ffmpeg-4.4.1.exe",
            companions: &[],
        }),
        linux_64: Some(ToolSpec {
            url: binaries_url!("ffmpeg-4.4.1-linux-64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "a8ac9f1e28ad31ca366dba17dd0c486926d533d76ffc9b47a976308245ab064e",
            )),
            layout: ArchiveLayout::PickMember { member: "ffmpeg" },
            binary: "ffmpeg-4.4.1",
            companions: &[],
        }),
        darwin_64: Some(ToolSpec {
            url: binaries_url!("ffmpeg-4.4.1-osx-64.zip"),
            checksum: ChecksumSource::Pinned(Checksum::blake3(
                "33f980b5b59ddfc663170a419110e9504527c092b21ba6592c525f7a7c183887",
            )),
            layout: ArchiveLayout::PickMember { member: "ffmpeg" },
            binary: "ffmpeg-4.4.1",
            companions: &[],
        }),
    },
    hook: &NoHook,
};

// ============================================================================
// Tika Definition
// ============================================================================

const TIKA_VERSION: &str = "2.3.0";

const TIKA_SPEC: ToolSpec = ToolSpec {
    url: binaries_url!("tika-app-2.3.0.jar"),
    checksum: ChecksumSource::Pinned(Checksum::blake3(
        "e3f6ff0841b9014333fc6de4b849704384abf362100edfa573a6e4104b654491",
    )),
    layout: ArchiveLayout::Direct,
    binary: "tika-app-2.3.0.jar",
    companions: &[],
};

static TIKA_DEFINITION: ToolDefinition = ToolDefinition {
    id: ToolId::Tika,
    display_name: "Apache Tika",
    description: "Document text and metadata extractor (runs on Java)",
    version: TIKA_VERSION,
    runtime: Some(ToolId::Java),
    specs: PlatformSpecs {
        windows_64: Some(TIKA_SPEC),
        linux_64: Some(TIKA_SPEC),
        darwin_64: Some(TIKA_SPEC),
    },
    hook: &NoHook,
};

// ============================================================================
// Java Runtime Definition
// ============================================================================

const JAVA_VERSION: &str = "16.0.2+7";

macro_rules! jre_url {
    ($suffix:literal) => {
        concat!(
            "https://github.com/AdoptOpenJDK/openjdk16-binaries/releases/download/",
            "jdk-16.0.2%2B7_openj9-0.27.0/OpenJDK16U-jre_x64_",
            $suffix
        )
    };
}

// The runtime comes from AdoptOpenJDK rather than iscc-binaries; its digests
// are the SHA-256 files published with each release asset.
static JAVA_DEFINITION: ToolDefinition = ToolDefinition {
    id: ToolId::Java,
    display_name: "Java Runtime",
    description: "OpenJ9 JRE used to launch Tika",
    version: JAVA_VERSION,
    runtime: None,
    specs: PlatformSpecs {
        windows_64: Some(ToolSpec {
            url: jre_url!("windows_openj9_16.0.2_7_openj9-0.27.0.zip"),
            checksum: ChecksumSource::Published {
                algorithm: HashAlgorithm::Sha256,
                url: jre_url!("windows_openj9_16.0.2_7_openj9-0.27.0.zip.sha256.txt"),
            },
            layout: ArchiveLayout::ExtractAll,
            binary: "jdk-16.0.2+7-jre/bin/java.exe",
            companions: &[],
        }),
        linux_64: Some(ToolSpec {
            url: jre_url!("linux_openj9_16.0.2_7_openj9-0.27.0.tar.gz"),
            checksum: ChecksumSource::Published {
                algorithm: HashAlgorithm::Sha256,
                url: jre_url!("linux_openj9_16.0.2_7_openj9-0.27.0.tar.gz.sha256.txt"),
            },
            layout: ArchiveLayout::ExtractAll,
            binary: "jdk-16.0.2+7-jre/bin/java",
            companions: &[],
        }),
        darwin_64: Some(ToolSpec {
            url: jre_url!("mac_openj9_16.0.2_7_openj9-0.27.0.tar.gz"),
            checksum: ChecksumSource::Published {
                algorithm: HashAlgorithm::Sha256,
                url: jre_url!("mac_openj9_16.0.2_7_openj9-0.27.0.tar.gz.sha256.txt"),
            },
            layout: ArchiveLayout::ExtractAll,
            binary: "jdk-16.0.2+7-jre/Contents/Home/bin/java",
            companions: &[],
        }),
    },
    hook: &NoHook,
};

// ============================================================================
// Catalog Lookup Functions
// ============================================================================

/// Returns the tool definition for the given tool ID.
pub fn get_tool_definition(id: ToolId) -> &'static ToolDefinition {
    match id {
        ToolId::Exiv2 => &EXIV2_DEFINITION,
        ToolId::Fpcalc => &FPCALC_DEFINITION,
        ToolId::Ffprobe => &FFPROBE_DEFINITION,
        ToolId::Ffmpeg => &FFMPEG_DEFINITION,
        ToolId::Tika => &TIKA_DEFINITION,
        ToolId::Java => &JAVA_DEFINITION,
    }
}

/// Returns all tool definitions, in [`ToolId::all`] order.
pub fn get_all_tool_definitions() -> Vec<&'static ToolDefinition> {
    ToolId::all()
        .iter()
        .map(|id| get_tool_definition(*id))
        .collect()
}

/// Release base URL of the pinned native tool builds.
pub fn binaries_base_url() -> &'static str {
    BINARIES_BASE
}
