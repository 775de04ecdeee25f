//! Error types for archive extraction and packaging.

use camino::Utf8PathBuf;
use pinbuild_common::FsError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors arising from archive extraction and packaging.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Neither a hint nor the file name identifies a supported format.
    #[error("unsupported archive format for {path}: expected a .tar.gz or .zip file")]
    UnsupportedFormat {
        /// The archive path.
        path: Utf8PathBuf,
    },

    /// A format hint string is not recognised.
    #[error("unknown archive format hint: {hint}")]
    UnknownFormatHint {
        /// The rejected hint.
        hint: String,
    },

    /// The output name is empty or is not a single path component.
    #[error("invalid extraction output name: {name:?}")]
    InvalidOutputName {
        /// The rejected name.
        name: String,
    },

    /// The directory to pack is not a plain relative path.
    #[error("directory to pack must be relative without `..`: {dir:?}")]
    InvalidPackDir {
        /// The rejected directory.
        dir: String,
    },

    /// An entry path attempts to escape the extraction directory.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending entry name.
        path: String,
    },

    /// The archive could not be opened or its tar stream could not be read.
    #[error("failed to read archive {archive}")]
    Read {
        /// The archive path.
        archive: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The zip container is malformed.
    #[error("malformed zip archive {archive}")]
    Zip {
        /// The archive path.
        archive: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: zip::result::ZipError,
    },

    /// Writing an extracted or packed file failed.
    #[error("I/O error at {}", .path.display())]
    Io {
        /// The file being written or read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The stripped root could not be moved to its destination.
    #[error("failed to move {from} to {to}")]
    Relocate {
        /// Extracted root directory.
        from: Utf8PathBuf,
        /// Requested destination.
        to: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A path on disk is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// Preparing or clearing a directory failed.
    #[error(transparent)]
    Fs(#[from] FsError),
}

impl ArchiveError {
    /// Returns `true` for caller mistakes that retrying cannot fix.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. }
                | Self::UnknownFormatHint { .. }
                | Self::InvalidOutputName { .. }
                | Self::InvalidPackDir { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
