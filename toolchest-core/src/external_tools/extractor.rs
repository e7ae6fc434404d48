//! Archive extraction for downloaded tool packages.
//!
//! Two modes are supported for zip and tar.gz archives:
//!
//! - [`Selector::All`] unpacks every member below a destination directory.
//! - [`Selector::Member`] copies the first regular file with a given base
//!   name to a target path, ignoring directory structure.
//!
//! A full extraction keeps the executable bits stored in the archive, except
//! on the tool's declared executables: the installer marks those last, once
//! the whole tool is in place. Nothing is written through a path that
//! resolves outside the destination directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::ExtractError;
use super::types::ArchiveFormat;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// What to take out of an archive.
#[derive(Debug, Clone, Copy)]
pub enum Selector<'a> {
    /// Unpack everything below `dest_dir`; each path in `expect` must exist
    /// afterwards.
    All {
        dest_dir: &'a Path,
        expect: &'a [PathBuf],
    },
    /// Copy the first regular member named `name` (by base name) to `target`.
    Member { name: &'a str, target: &'a Path },
}

/// Extracts from the archive at `archive`, picking the format from its name.
pub fn extract(archive: &Path, selector: Selector<'_>) -> Result<(), ExtractError> {
    let format = ArchiveFormat::from_path(archive)
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive.to_path_buf()))?;

    info!("Extracting {:?} archive {}", format, archive.display());

    match selector {
        Selector::All { dest_dir, expect } => {
            fs::create_dir_all(dest_dir).map_err(io_error(dest_dir))?;
            let root = fs::canonicalize(dest_dir).map_err(io_error(dest_dir))?;
            let held: Vec<PathBuf> = expect
                .iter()
                .filter_map(|path| path.strip_prefix(dest_dir).ok())
                .map(normalized)
                .collect();
            match format {
                ArchiveFormat::Zip => extract_zip_all(archive, &root, &held)?,
                ArchiveFormat::TarGz => {
                    extract_tar_all(open_tar_gz(archive)?, archive, &root, &held)?
                }
            }
            for path in expect {
                if !path.exists() {
                    return Err(ExtractError::MemberNotFound {
                        archive: archive.to_path_buf(),
                        member: path.display().to_string(),
                    });
                }
            }
            Ok(())
        }
        Selector::Member { name, target } => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            remove_if_present(target)?;
            let found = match format {
                ArchiveFormat::Zip => extract_zip_member(archive, name, target)?,
                ArchiveFormat::TarGz => {
                    extract_tar_member(open_tar_gz(archive)?, archive, name, target)?
                }
            };
            if found {
                debug!("Extracted {} to {}", name, target.display());
                Ok(())
            } else {
                Err(ExtractError::MemberNotFound {
                    archive: archive.to_path_buf(),
                    member: name.to_string(),
                })
            }
        }
    }
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn open_zip(archive_path: &Path) -> Result<zip::ZipArchive<BufReader<File>>, ExtractError> {
    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    zip::ZipArchive::new(BufReader::new(file)).map_err(|source| ExtractError::Zip {
        path: archive_path.to_path_buf(),
        source,
    })
}

fn extract_zip_all(archive_path: &Path, root: &Path, held: &[PathBuf]) -> Result<(), ExtractError> {
    let mut archive = open_zip(archive_path)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ExtractError::Zip {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                warn!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };
        let mode = entry.unix_mode();

        if entry.is_dir() {
            create_dir_within(root, &entry_path)?;
        } else if mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .map_err(io_error(&root.join(&entry_path)))?;
            link_within(root, &entry_path, Path::new(&target))?;
        } else {
            write_within(root, &entry_path, &mut entry, mode, held)?;
        }
    }

    debug!("ZIP extraction complete");
    Ok(())
}

fn extract_zip_member(archive_path: &Path, name: &str, target: &Path) -> Result<bool, ExtractError> {
    let mut archive = open_zip(archive_path)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| ExtractError::Zip {
            path: archive_path.to_path_buf(),
            source,
        })?;
        if !entry.is_file() {
            continue;
        }
        let matches = Path::new(entry.name())
            .file_name()
            .is_some_and(|base| base == name);
        if matches {
            write_entry(&mut entry, target)?;
            return Ok(true);
        }
    }

    Ok(false)
}

// ============================================================================
// TAR.GZ Extraction
// ============================================================================

fn open_tar_gz(
    archive_path: &Path,
) -> Result<tar::Archive<flate2::read::GzDecoder<BufReader<File>>>, ExtractError> {
    let file = File::open(archive_path).map_err(io_error(archive_path))?;
    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    Ok(tar::Archive::new(decoder))
}

fn extract_tar_all<R: Read>(
    mut archive: tar::Archive<R>,
    archive_path: &Path,
    root: &Path,
    held: &[PathBuf],
) -> Result<(), ExtractError> {
    for entry_result in archive.entries().map_err(io_error(archive_path))? {
        let mut entry = entry_result.map_err(io_error(archive_path))?;
        let entry_type = entry.header().entry_type();
        let path = entry.path().map_err(io_error(archive_path))?.into_owned();

        if !is_safe_relative(&path) {
            warn!("Skipping unsafe path in tar: {}", path.display());
            continue;
        }

        if entry_type.is_hard_link() {
            warn!("Skipping hard link in tar: {}", path.display());
        } else if entry_type.is_symlink() {
            match entry.link_name().map_err(io_error(archive_path))? {
                Some(target) => link_within(root, &path, &target)?,
                None => warn!("Skipping symlink without target: {}", path.display()),
            }
        } else if entry_type.is_dir() {
            create_dir_within(root, &path)?;
        } else if entry_type.is_file() {
            let mode = entry.header().mode().ok();
            write_within(root, &path, &mut entry, mode, held)?;
        } else {
            debug!("Skipping {:?} entry {}", entry_type, path.display());
        }
    }

    debug!("TAR extraction complete");
    Ok(())
}

fn extract_tar_member<R: Read>(
    mut archive: tar::Archive<R>,
    archive_path: &Path,
    name: &str,
    target: &Path,
) -> Result<bool, ExtractError> {
    for entry_result in archive.entries().map_err(io_error(archive_path))? {
        let mut entry = entry_result.map_err(io_error(archive_path))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .map_err(io_error(archive_path))?
            .file_name()
            .is_some_and(|base| base == name);
        if matches {
            write_entry(&mut entry, target)?;
            return Ok(true);
        }
    }

    Ok(false)
}

// ============================================================================
// Helpers
// ============================================================================

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExtractError + '_ {
    move |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Streams `reader` into a fresh file at `dest`.
fn write_entry<R: Read>(reader: &mut R, dest: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    // Never write through a link left by an earlier entry or install.
    remove_if_present(dest)?;
    let mut outfile = File::create(dest).map_err(io_error(dest))?;
    io::copy(reader, &mut outfile).map_err(io_error(dest))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), ExtractError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => fs::remove_file(path).map_err(io_error(path)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path)(e)),
    }
}

fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// True when the deepest existing ancestor of `path` (the path itself
/// included) resolves below `root`. `root` must be canonical.
fn resolves_inside(root: &Path, path: &Path) -> bool {
    let mut existing = path;
    while fs::symlink_metadata(existing).is_err() {
        match existing.parent() {
            Some(parent) => existing = parent,
            None => return false,
        }
    }
    fs::canonicalize(existing).is_ok_and(|resolved| resolved.starts_with(root))
}

/// True when a link in the canonical directory `parent` pointing at `target`
/// lands below `root`. `..` is only accepted before the first normal
/// component, where it climbs real directories.
fn link_target_inside(root: &Path, parent: &Path, target: &Path) -> bool {
    let mut resolved = parent.to_path_buf();
    let mut descending = false;
    for component in target.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                descending = true;
            }
            Component::CurDir => {}
            Component::ParentDir if !descending => {
                if !resolved.pop() {
                    return false;
                }
            }
            _ => return false,
        }
    }
    resolved.starts_with(root)
}

fn create_dir_within(root: &Path, relative: &Path) -> Result<(), ExtractError> {
    let dest_path = root.join(relative);
    if !resolves_inside(root, &dest_path) {
        warn!(
            "Skipping directory that resolves outside the extraction root: {}",
            relative.display()
        );
        return Ok(());
    }
    fs::create_dir_all(&dest_path).map_err(io_error(&dest_path))
}

/// Writes a regular member below `root`. Its stored exec bits carry over
/// unless it is one of the `held` executables.
fn write_within<R: Read>(
    root: &Path,
    relative: &Path,
    reader: &mut R,
    mode: Option<u32>,
    held: &[PathBuf],
) -> Result<(), ExtractError> {
    let dest_path = root.join(relative);
    let parent_inside = dest_path
        .parent()
        .is_some_and(|parent| resolves_inside(root, parent));
    if !parent_inside {
        warn!(
            "Skipping file that resolves outside the extraction root: {}",
            relative.display()
        );
        return Ok(());
    }

    write_entry(reader, &dest_path)?;

    let executable = mode.is_some_and(|mode| mode & 0o111 != 0);
    if executable && !held.contains(&normalized(relative)) {
        make_executable(&dest_path).map_err(io_error(&dest_path))?;
    }
    Ok(())
}

fn link_within(root: &Path, link: &Path, target: &Path) -> Result<(), ExtractError> {
    let dest_path = root.join(link);
    let Some(parent) = dest_path.parent() else {
        return Ok(());
    };
    if !resolves_inside(root, parent) {
        warn!(
            "Skipping symlink that resolves outside the extraction root: {}",
            link.display()
        );
        return Ok(());
    }

    fs::create_dir_all(parent).map_err(io_error(parent))?;
    let real_parent = fs::canonicalize(parent).map_err(io_error(parent))?;
    if !link_target_inside(root, &real_parent, target) {
        warn!(
            "Skipping symlink that escapes the extraction root: {} -> {}",
            link.display(),
            target.display()
        );
        return Ok(());
    }

    remove_if_present(&dest_path)?;
    create_symlink(target, &dest_path).map_err(io_error(&dest_path))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    debug!(
        "Not recreating symlink {} -> {} on this platform",
        link.display(),
        target.display()
    );
    Ok(())
}

// ============================================================================
// Permissions
// ============================================================================

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_tools::testing::{tar_gz_bytes, write_file, zip_bytes};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_extract_zip_all() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("test.zip");
        let extract_dir = temp_dir.path().join("extracted");
        write_file(
            &archive_path,
            &zip_bytes(&[
                ("hello.txt", b"Hello, World!"),
                ("subdir/nested.txt", b"Nested content"),
            ]),
        );

        let expect = [extract_dir.join("subdir/nested.txt")];
        extract(
            &archive_path,
            Selector::All {
                dest_dir: &extract_dir,
                expect: &expect,
            },
        )
        .unwrap();

        let content = fs::read_to_string(extract_dir.join("hello.txt")).unwrap();
        assert_eq!(content, "Hello, World!");
        assert!(extract_dir.join("subdir/nested.txt").exists());
    }

    #[test]
    fn test_extract_tar_gz_all() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("test.tar.gz");
        let extract_dir = temp_dir.path().join("extracted");
        write_file(
            &archive_path,
            &tar_gz_bytes(&[("pkg/bin/tool", b"#!/bin/sh\n"), ("pkg/lib/libtool.so", b"elf")]),
        );

        let expect = [extract_dir.join("pkg/bin/tool")];
        extract(
            &archive_path,
            Selector::All {
                dest_dir: &extract_dir,
                expect: &expect,
            },
        )
        .unwrap();

        assert_eq!(fs::read(extract_dir.join("pkg/bin/tool")).unwrap(), b"#!/bin/sh\n");
        assert!(extract_dir.join("pkg/lib/libtool.so").exists());
    }

    #[test]
    fn test_extract_all_missing_expected_path() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("test.tar.gz");
        write_file(&archive_path, &tar_gz_bytes(&[("readme.txt", b"docs")]));

        let expect = [temp_dir.path().join("bin/tool")];
        let err = extract(
            &archive_path,
            Selector::All {
                dest_dir: temp_dir.path(),
                expect: &expect,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::MemberNotFound { .. }), "{err}");
    }

    #[test]
    fn test_extract_member_by_base_name() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("fpcalc.tar.gz");
        write_file(
            &archive_path,
            &tar_gz_bytes(&[
                ("chromaprint-fpcalc-1.5.1-linux-x86_64/LICENSE", b"license"),
                ("chromaprint-fpcalc-1.5.1-linux-x86_64/fpcalc", b"binary"),
            ]),
        );

        let target = temp_dir.path().join("fpcalc-1.5.1");
        extract(
            &archive_path,
            Selector::Member {
                name: "fpcalc",
                target: &target,
            },
        )
        .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"binary");
        // Nothing else is unpacked.
        assert!(!temp_dir
            .path()
            .join("chromaprint-fpcalc-1.5.1-linux-x86_64")
            .exists());
    }

    #[test]
    fn test_extract_zip_member_replaces_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("ffprobe-4.4.1-linux-64.zip");
        write_file(&archive_path, &zip_bytes(&[("ffprobe", b"new")]));

        let target = temp_dir.path().join("ffprobe-4.4.1");
        write_file(&target, b"old and longer");

        extract(
            &archive_path,
            Selector::Member {
                name: "ffprobe",
                target: &target,
            },
        )
        .unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_extract_member_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("tool.zip");
        write_file(&archive_path, &zip_bytes(&[("other", b"x"), ("dir/ffprobe.txt", b"y")]));

        let target = temp_dir.path().join("ffprobe");
        let err = extract(
            &archive_path,
            Selector::Member {
                name: "ffprobe",
                target: &target,
            },
        )
        .unwrap_err();

        match err {
            ExtractError::MemberNotFound { member, .. } => assert_eq!(member, "ffprobe"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!target.exists());
    }

    #[test]
    fn test_extract_unknown_format() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("tool.tar.xz");
        write_file(&archive_path, b"not really");

        let err = extract(
            &archive_path,
            Selector::All {
                dest_dir: temp_dir.path(),
                expect: &[],
            },
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_corrupt_zip_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("broken.zip");
        write_file(&archive_path, b"PK but not quite");

        let err = extract(
            &archive_path,
            Selector::Member {
                name: "tool",
                target: &temp_dir.path().join("tool"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::Zip { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_exec_bits_kept_except_declared() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("jre.tar.gz");
        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            for (path, mode) in [
                ("jre/bin/java", 0o755),
                ("jre/lib/jspawnhelper", 0o755),
                ("jre/lib/modules", 0o644),
            ] {
                let data = b"elf";
                let mut header = tar::Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_size(data.len() as u64);
                header.set_mode(mode);
                header.set_cksum();
                builder.append(&header, &data[..]).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }

        let extract_dir = temp_dir.path().join("out");
        let expect = [extract_dir.join("jre/bin/java")];
        extract(
            &archive_path,
            Selector::All {
                dest_dir: &extract_dir,
                expect: &expect,
            },
        )
        .unwrap();

        let exec_bits = |path: &str| {
            fs::metadata(extract_dir.join(path))
                .unwrap()
                .permissions()
                .mode()
                & 0o111
        };
        assert_ne!(exec_bits("jre/lib/jspawnhelper"), 0);
        assert_eq!(exec_bits("jre/lib/modules"), 0);
        assert_eq!(exec_bits("jre/bin/java"), 0, "declared executables are marked by the installer");
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("script.sh");

        {
            let mut file = File::create(&file_path).unwrap();
            file.write_all(b"#!/bin/bash\necho hello").unwrap();
            fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();
        }

        assert_eq!(fs::metadata(&file_path).unwrap().permissions().mode() & 0o111, 0);

        make_executable(&file_path).unwrap();

        assert_ne!(fs::metadata(&file_path).unwrap().permissions().mode() & 0o111, 0);
    }

    #[test]
    fn test_link_target_inside() {
        let root = Path::new("/data");
        assert!(link_target_inside(root, Path::new("/data/jre/lib"), Path::new("jli/libjli.so")));
        assert!(link_target_inside(
            root,
            Path::new("/data/jre/Contents/MacOS"),
            Path::new("../Home/lib/libjli.dylib")
        ));
        assert!(link_target_inside(root, Path::new("/data/x"), Path::new("..")));
        assert!(!link_target_inside(root, Path::new("/data"), Path::new("../escaped_file.txt")));
        assert!(!link_target_inside(root, Path::new("/data/a"), Path::new("../../x")));
        assert!(!link_target_inside(root, Path::new("/data/a"), Path::new("/etc/passwd")));
        // `..` after a normal component could climb out of a linked directory.
        assert!(!link_target_inside(root, Path::new("/data"), Path::new("a/../b")));
    }

    #[test]
    fn test_tar_symlink_escape_blocked() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("malicious.tar.gz");
        let extract_dir = temp_dir.path().join("extracted");
        let escape_target = temp_dir.path().join("escaped_file.txt");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_path("escape_link").unwrap();
            header.set_size(0);
            header.set_mode(0o777);
            header.set_cksum();

            builder
                .append_link(&mut header, "escape_link", "../escaped_file.txt")
                .unwrap();

            let data = b"This should NOT appear outside extraction dir!";
            let mut file_header = tar::Header::new_gnu();
            file_header.set_path("escape_link").unwrap();
            file_header.set_size(data.len() as u64);
            file_header.set_mode(0o644);
            file_header.set_cksum();

            builder.append(&file_header, &data[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract(
            &archive_path,
            Selector::All {
                dest_dir: &extract_dir,
                expect: &[],
            },
        )
        .unwrap();

        assert!(
            !escape_target.exists(),
            "Symlink escape attack succeeded - file was written outside extraction dir!"
        );
        assert!(extract_dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_inner_symlink_recreated() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("jre.tar.gz");
        let extract_dir = temp_dir.path().join("extracted");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            let data = b"lib";
            let mut file_header = tar::Header::new_gnu();
            file_header.set_path("jre/lib/jli/libjli.so").unwrap();
            file_header.set_size(data.len() as u64);
            file_header.set_mode(0o644);
            file_header.set_cksum();
            builder.append(&file_header, &data[..]).unwrap();

            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder
                .append_link(&mut header, "jre/lib/libjli.so", "jli/libjli.so")
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract(
            &archive_path,
            Selector::All {
                dest_dir: &extract_dir,
                expect: &[],
            },
        )
        .unwrap();

        let link = extract_dir.join("jre/lib/libjli.so");
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("jli/libjli.so"));
        assert_eq!(fs::read(&link).unwrap(), b"lib");
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_chained_symlinks_cannot_escape() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("chained.tar.gz");
        let extract_dir = temp_dir.path().join("extracted");

        {
            let file = File::create(&archive_path).unwrap();
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);

            // x/y points back at the root; x/y/z would then point above it.
            for (link, target) in [("x/y", ".."), ("x/y/z", "../outside")] {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_size(0);
                header.set_mode(0o777);
                builder.append_link(&mut header, link, target).unwrap();
            }

            let data = b"written through links";
            let mut header = tar::Header::new_gnu();
            header.set_path("x/y/z/pwned").unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &data[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        extract(
            &archive_path,
            Selector::All {
                dest_dir: &extract_dir,
                expect: &[],
            },
        )
        .unwrap();

        assert!(!temp_dir.path().join("outside").exists());
        assert!(!temp_dir.path().join("outside/pwned").exists());
        // The file still lands, but below the root.
        assert!(extract_dir.join("z/pwned").exists());
    }
}
