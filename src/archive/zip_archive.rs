//! Zip backend.
//!
//! Entries are written as plain files first. On Unix a second pass then
//! turns entries whose stored mode marks a symbolic link into real links
//! (the placeholder's content is the link target) and applies the stored
//! permission bits to everything else. Links whose target does not exist
//! are dropped rather than created dangling.

use super::ArchiveBackend;
use super::entry::{ArchiveEntry, validate_entry_path};
use super::error::ArchiveError;
use camino::Utf8Path;
use log::debug;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use zip::ZipArchive;

/// File-type mask of a POSIX mode.
pub(crate) const S_IFMT: u32 = 0o170_000;
/// File-type bits of a symbolic link.
pub(crate) const S_IFLNK: u32 = 0o120_000;

/// Extraction backend for `.zip` archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBackend;

impl ArchiveBackend for ZipBackend {
    fn entries(&self, archive: &Utf8Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut zip = open(archive)?;
        let mut entries = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let mut file = zip.by_index(index).map_err(zip_err(archive))?;
            validate_entry_path(file.name())?;

            let mode = file.unix_mode();
            let link_target = if !file.is_dir() && mode.is_some_and(is_symlink_mode) {
                let mut target = String::new();
                file.read_to_string(&mut target)
                    .map_err(|source| ArchiveError::Read {
                        archive: archive.to_owned(),
                        source,
                    })?;
                Some(target)
            } else {
                None
            };

            entries.push(ArchiveEntry {
                path: file.name().to_owned(),
                is_dir: file.is_dir(),
                mode,
                link_target,
            });
        }

        Ok(entries)
    }

    fn unpack(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ArchiveError> {
        let mut zip = open(archive)?;
        let mut written: Vec<(PathBuf, Option<u32>)> = Vec::with_capacity(zip.len());

        for index in 0..zip.len() {
            let mut file = zip.by_index(index).map_err(zip_err(archive))?;
            let relative = file
                .enclosed_name()
                .ok_or_else(|| ArchiveError::PathTraversal {
                    path: file.name().to_owned(),
                })?;
            let target = dest.as_std_path().join(relative);

            if file.is_dir() {
                fs::create_dir_all(&target).map_err(ArchiveError::io(&target))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
            }
            let mut out = File::create(&target).map_err(ArchiveError::io(&target))?;
            io::copy(&mut file, &mut out).map_err(ArchiveError::io(&target))?;
            written.push((target, file.unix_mode()));
        }

        restore_unix_metadata(&written)
    }
}

const fn is_symlink_mode(mode: u32) -> bool {
    mode & S_IFMT == S_IFLNK
}

#[cfg(unix)]
fn restore_unix_metadata(written: &[(PathBuf, Option<u32>)]) -> Result<(), ArchiveError> {
    use std::os::unix::fs::{PermissionsExt, symlink};

    for (path, mode) in written {
        let Some(mode) = *mode else {
            continue;
        };

        if is_symlink_mode(mode) {
            let target = fs::read_to_string(path).map_err(ArchiveError::io(path))?;
            fs::remove_file(path).map_err(ArchiveError::io(path))?;
            let resolved = path.parent().map(|dir| dir.join(&target));
            if resolved.is_some_and(|p| p.exists()) {
                symlink(&target, path).map_err(ArchiveError::io(path))?;
            } else {
                debug!("skipping dangling symlink {} -> {target}", path.display());
            }
            continue;
        }

        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
            .map_err(ArchiveError::io(path))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn restore_unix_metadata(_written: &[(PathBuf, Option<u32>)]) -> Result<(), ArchiveError> {
    Ok(())
}

fn open(archive: &Utf8Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Read {
        archive: archive.to_owned(),
        source,
    })?;
    ZipArchive::new(file).map_err(zip_err(archive))
}

fn zip_err(archive: &Utf8Path) -> impl Fn(zip::result::ZipError) -> ArchiveError + '_ {
    move |source| ArchiveError::Zip {
        archive: archive.to_owned(),
        source,
    }
}
