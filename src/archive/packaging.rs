//! Packing a directory tree into a distributable archive.
//!
//! The inverse of extraction: every file under `source_root/relative_dir`
//! is stored with its path relative to `source_root`, so the archive
//! unpacks to a single `relative_dir` root. Unix modes and symlinks are
//! preserved in both formats. Empty directories are not stored.

use super::error::ArchiveError;
use super::format::ArchiveFormat;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A file collected for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackEntry {
    source: Utf8PathBuf,
    name: String,
    is_symlink: bool,
}

/// Packs `source_root/relative_dir` into `archive_path`.
///
/// Returns the number of entries written.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] when a file cannot be read or the archive
/// cannot be written, [`ArchiveError::Zip`] for zip encoder failures,
/// [`ArchiveError::InvalidPackDir`] when `relative_dir` leaves
/// `source_root`, and [`ArchiveError::NonUtf8Path`] for paths that are not
/// valid UTF-8.
pub fn pack_directory(
    source_root: &Utf8Path,
    relative_dir: &str,
    archive_path: &Utf8Path,
    format: ArchiveFormat,
) -> Result<usize, ArchiveError> {
    let entries = collect_entries(source_root, relative_dir)?;
    info!(
        "Packing {} entries from {source_root}/{relative_dir} into {archive_path}",
        entries.len()
    );

    match format {
        ArchiveFormat::TarGz => write_tar_gz(archive_path, &entries)?,
        ArchiveFormat::Zip => write_zip(archive_path, &entries)?,
    }
    Ok(entries.len())
}

fn collect_entries(source_root: &Utf8Path, relative_dir: &str) -> Result<Vec<PackEntry>, ArchiveError> {
    let prefix = pack_prefix(relative_dir)?;
    let walk_root = source_root.join(relative_dir);
    let mut entries = Vec::new();

    for entry in WalkDir::new(&walk_root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().map_or_else(|| walk_root.clone().into(), ToOwned::to_owned);
            ArchiveError::Io {
                path,
                source: err.into(),
            }
        })?;
        let is_symlink = entry.path_is_symlink();
        if entry.file_type().is_dir() {
            continue;
        }

        let source = Utf8PathBuf::try_from(entry.path().to_path_buf()).map_err(|err| {
            ArchiveError::NonUtf8Path {
                path: err.into_path_buf(),
            }
        })?;
        // walkdir depth counts the components below `walk_root`
        let mut below: Vec<&str> = source
            .components()
            .rev()
            .take(entry.depth())
            .map(|component| component.as_str())
            .collect();
        below.reverse();
        let name = prefix.iter().copied().chain(below).collect::<Vec<_>>().join("/");

        debug!("pack {name}");
        entries.push(PackEntry {
            source,
            name,
            is_symlink,
        });
    }

    Ok(entries)
}

/// Splits `relative_dir` into plain components, rejecting `..`, roots and
/// prefixes so entry names stay inside the archive.
fn pack_prefix(relative_dir: &str) -> Result<Vec<&str>, ArchiveError> {
    Utf8Path::new(relative_dir)
        .components()
        .filter(|component| *component != Utf8Component::CurDir)
        .map(|component| match component {
            Utf8Component::Normal(name) => Ok(name),
            _ => Err(ArchiveError::InvalidPackDir {
                dir: relative_dir.to_owned(),
            }),
        })
        .collect()
}

fn write_tar_gz(archive_path: &Utf8Path, entries: &[PackEntry]) -> Result<(), ArchiveError> {
    let io_err = ArchiveError::io(archive_path);
    let file = File::create(archive_path).map_err(ArchiveError::io(archive_path))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    for entry in entries {
        builder
            .append_path_with_name(&entry.source, &entry.name)
            .map_err(ArchiveError::io(entry.source.as_std_path()))?;
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map(drop)
        .map_err(io_err)
}

fn write_zip(archive_path: &Utf8Path, entries: &[PackEntry]) -> Result<(), ArchiveError> {
    let zip_err = |source| ArchiveError::Zip {
        archive: archive_path.to_owned(),
        source,
    };
    let file = File::create(archive_path).map_err(ArchiveError::io(archive_path))?;
    let mut writer = ZipWriter::new(file);
    let base = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        if entry.is_symlink {
            let target = fs::read_link(&entry.source).map_err(ArchiveError::io(entry.source.as_std_path()))?;
            let target = target.to_string_lossy().replace('\\', "/");
            writer
                .add_symlink(entry.name.as_str(), target, base)
                .map_err(zip_err)?;
            continue;
        }

        let options = base.unix_permissions(file_mode(&entry.source)?);
        writer.start_file(entry.name.as_str(), options).map_err(zip_err)?;
        let mut source = File::open(&entry.source).map_err(ArchiveError::io(entry.source.as_std_path()))?;
        io::copy(&mut source, &mut writer).map_err(ArchiveError::io(entry.source.as_std_path()))?;
    }

    writer.finish().map(drop).map_err(zip_err)
}

#[cfg(unix)]
fn file_mode(path: &Utf8Path) -> Result<u32, ArchiveError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(ArchiveError::io(path.as_std_path()))?;
    Ok(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Utf8Path) -> Result<u32, ArchiveError> {
    Ok(0o644)
}
