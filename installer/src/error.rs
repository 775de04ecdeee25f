//! Error types for the msquic build orchestrator.
//!
//! Every lower layer reports its own error enum; [`InstallerError`] wraps
//! them so the binary can print one chain and pick an exit code.

use crate::config::ConfigError;
use crate::download::DownloadError;
use camino::Utf8PathBuf;
use pinbuild::{ArchiveError, FetchError, MarkerError, ProcessError, VersionsError};
use pinbuild_common::{FsError, SearchPathError};
use thiserror::Error;

/// Errors that can occur while building or packaging msquic.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The `VERSION` file is missing, malformed, or lacks a key.
    #[error(transparent)]
    Versions(#[from] VersionsError),

    /// `pinbuild.toml` could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A toolchain archive could not be fetched.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// A toolchain archive could not be extracted, or a package written.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A version marker could not be read or written.
    #[error(transparent)]
    Marker(#[from] MarkerError),

    /// The msquic sources could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// cmake, lipo, or xcrun failed.
    #[error("{step} failed")]
    Tool {
        /// Build step being performed.
        step: &'static str,
        /// Underlying process failure.
        #[source]
        source: ProcessError,
    },

    /// A build directory could not be prepared.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// The child-process search path could not be assembled.
    #[error(transparent)]
    SearchPath(#[from] SearchPathError),

    /// A build product or license file could not be copied.
    #[error("failed to copy {from} to {to}")]
    Copy {
        /// Source file.
        from: Utf8PathBuf,
        /// Destination file.
        to: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A generated file could not be written.
    #[error("failed to write {path}")]
    Write {
        /// File being written.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Returns `true` for mistakes in the inputs rather than the environment.
    ///
    /// Configuration errors are never worth retrying.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Versions(_) | Self::Config(_) => true,
            Self::Archive(err) => err.is_configuration(),
            _ => false,
        }
    }

    pub(crate) fn tool(step: &'static str) -> impl FnOnce(ProcessError) -> Self {
        move |source| Self::Tool { step, source }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
