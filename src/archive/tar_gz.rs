//! Gzip-compressed tarball backend.
//!
//! The `tar` crate restores modes and symlinks natively, so unpacking needs
//! no post-processing.

use super::ArchiveBackend;
use super::entry::{ArchiveEntry, validate_entry_path};
use super::error::ArchiveError;
use camino::Utf8Path;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::BufReader;

type TarGzArchive = tar::Archive<GzDecoder<BufReader<File>>>;

/// Extraction backend for `.tar.gz` archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzBackend;

impl ArchiveBackend for TarGzBackend {
    fn entries(&self, archive: &Utf8Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let read_err = |source: std::io::Error| ArchiveError::Read {
            archive: archive.to_owned(),
            source,
        };
        let mut tar = open(archive)?;
        let mut entries = Vec::new();

        for entry in tar.entries().map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            let kind = entry.header().entry_type();
            // `git archive` leads with a pax_global_header record
            if kind.is_pax_global_extensions() || kind.is_pax_local_extensions() {
                continue;
            }
            let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            validate_entry_path(&path)?;

            let header = entry.header();
            let link_target = if kind.is_symlink() {
                entry
                    .link_name()
                    .map_err(read_err)?
                    .map(|target| target.to_string_lossy().into_owned())
            } else {
                None
            };

            entries.push(ArchiveEntry {
                path,
                is_dir: kind.is_dir(),
                mode: header.mode().ok(),
                link_target,
            });
        }

        Ok(entries)
    }

    fn unpack(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ArchiveError> {
        let mut tar = open(archive)?;
        tar.set_preserve_permissions(true);
        tar.set_overwrite(true);
        tar.unpack(dest.as_std_path())
            .map_err(|source| ArchiveError::Read {
                archive: archive.to_owned(),
                source,
            })
    }
}

fn open(archive: &Utf8Path) -> Result<TarGzArchive, ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Read {
        archive: archive.to_owned(),
        source,
    })?;
    Ok(tar::Archive::new(GzDecoder::new(BufReader::new(file))))
}
