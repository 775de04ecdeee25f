//! Archive normalisation.
//!
//! Upstream toolchains ship as `.tar.gz` or `.zip` archives that usually,
//! but not always, wrap their content in one versioned top-level directory
//! (`cmake-3.28.1-linux-x86_64/`, `android-ndk-r26b/`). [`extract`] hides
//! that difference: the content always lands at `output_dir/output_name`,
//! with the wrapper directory stripped when there is exactly one.
//!
//! Extraction is two-phase. The archive is unpacked in full and, when a
//! single root was detected, the root directory is renamed into place.
//! Re-running an extraction replaces the previous result wholesale.

mod entry;
mod error;
mod format;
pub mod packaging;
mod tar_gz;
mod zip_archive;

pub use entry::{ArchiveEntry, detect_root};
pub use error::ArchiveError;
pub use format::ArchiveFormat;
pub use packaging::pack_directory;
pub use tar_gz::TarGzBackend;
pub use zip_archive::ZipBackend;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use log::info;
use pinbuild_common::{make_dir_all, remove_all};
use std::fs;

/// A container format reader.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveBackend {
    /// Lists every entry in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::PathTraversal`] when an entry would escape
    /// the extraction directory, or a read error for malformed archives.
    fn entries(&self, archive: &Utf8Path) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    /// Unpacks every entry beneath `dest`, preserving entry paths.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive cannot be read or a file cannot be
    /// written.
    fn unpack(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ArchiveError>;
}

/// Extracts `archive` so that its content lands at `output_dir/output_name`.
///
/// The format comes from `hint` when given, otherwise from the file name.
/// Any existing `output_dir/output_name` is removed first. When every entry
/// sits beneath one top-level directory that directory is stripped;
/// otherwise entries keep their archive paths beneath the destination.
///
/// Returns the destination directory.
///
/// # Errors
///
/// Returns [`ArchiveError::UnsupportedFormat`] when the format cannot be
/// determined, [`ArchiveError::InvalidOutputName`] when `output_name` is not
/// a single path component, and I/O or decoder errors otherwise.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use pinbuild::archive::extract;
///
/// let dest = extract(
///     Utf8Path::new("_download/cmake-3.28.1-linux-x86_64.tar.gz"),
///     Utf8Path::new("_install"),
///     "cmake",
///     None,
/// )?;
/// assert_eq!(dest, Utf8Path::new("_install/cmake"));
/// # Ok::<(), pinbuild::ArchiveError>(())
/// ```
pub fn extract(
    archive: &Utf8Path,
    output_dir: &Utf8Path,
    output_name: &str,
    hint: Option<ArchiveFormat>,
) -> Result<Utf8PathBuf, ArchiveError> {
    let format = ArchiveFormat::resolve(archive, hint)?;
    extract_with(format.backend(), archive, output_dir, output_name)
}

/// Runs the extraction algorithm of [`extract`] with an explicit backend.
///
/// # Errors
///
/// As for [`extract`], minus format detection.
pub fn extract_with(
    backend: &dyn ArchiveBackend,
    archive: &Utf8Path,
    output_dir: &Utf8Path,
    output_name: &str,
) -> Result<Utf8PathBuf, ArchiveError> {
    validate_output_name(output_name)?;
    let dest = output_dir.join(output_name);
    info!("Extract {archive} to {dest}");

    remove_all(&dest)?;
    let entries = backend.entries(archive)?;

    let Some(root) = detect_root(&entries) else {
        make_dir_all(&dest)?;
        backend.unpack(archive, &dest)?;
        return Ok(dest);
    };

    info!("Directory {root} is stripped");
    let extracted = output_dir.join(&root);
    if extracted != dest {
        remove_all(&extracted)?;
    }
    make_dir_all(output_dir)?;
    backend.unpack(archive, output_dir)?;

    if extracted != dest {
        fs::rename(&extracted, &dest).map_err(|source| ArchiveError::Relocate {
            from: extracted.clone(),
            to: dest.clone(),
            source,
        })?;
    }
    Ok(dest)
}

fn validate_output_name(name: &str) -> Result<(), ArchiveError> {
    let mut components = Utf8Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Utf8Component::Normal(_)), None) => Ok(()),
        _ => Err(ArchiveError::InvalidOutputName {
            name: name.to_owned(),
        }),
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
