//! Per-tool post-install fix-ups.
//!
//! Most tools need nothing beyond the executable bit. Exiv2 on macOS also needs
//! its dylib next to the binary, which [`DarwinLibraryLink`] provides.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use super::types::{Os, PlatformTag};

/// Fix-up run after a tool's files are placed and before they are marked
/// executable.
pub trait PostInstallHook: fmt::Debug + Send + Sync {
    /// `binary` is the absolute path of the tool's primary executable.
    fn post_install(&self, platform: PlatformTag, binary: &Path) -> io::Result<()> {
        let _ = (platform, binary);
        Ok(())
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl PostInstallHook for NoHook {}

/// Symlinks `<bin>/<library>` to `<bin>/../lib/<library>` on darwin.
///
/// Saves setting `DYLD_LIBRARY_PATH` for every invocation of the binary.
#[derive(Debug, Clone, Copy)]
pub struct DarwinLibraryLink {
    pub library: &'static str,
}

impl PostInstallHook for DarwinLibraryLink {
    fn post_install(&self, platform: PlatformTag, binary: &Path) -> io::Result<()> {
        if platform.os != Os::Darwin {
            return Ok(());
        }

        let bin_dir = binary.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no parent directory", binary.display()),
            )
        })?;

        let link = bin_dir.join(self.library);
        if fs::symlink_metadata(&link).is_ok() {
            debug!("{} already present", link.display());
            return Ok(());
        }

        let target = Path::new("..").join("lib").join(self.library);
        create_symlink(&target, &link)?;
        debug!("Linked {} -> {}", link.display(), target.display());
        Ok(())
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
