//! Archive container formats and their detection.

use super::error::ArchiveError;
use super::tar_gz::TarGzBackend;
use super::zip_archive::ZipBackend;
use super::ArchiveBackend;
use camino::Utf8Path;
use std::fmt;
use std::str::FromStr;

/// The supported container formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// A gzip-compressed tarball (`.tar.gz`).
    TarGz,
    /// A zip file (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Detects the format from the file name suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use pinbuild::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::from_file_name(Utf8Path::new("cmake-3.28.1-linux-x86_64.tar.gz")),
    ///     Some(ArchiveFormat::TarGz)
    /// );
    /// assert_eq!(ArchiveFormat::from_file_name(Utf8Path::new("ndk.zip")), Some(ArchiveFormat::Zip));
    /// assert_eq!(ArchiveFormat::from_file_name(Utf8Path::new("ndk.7z")), None);
    /// ```
    #[must_use]
    pub fn from_file_name(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?;
        if name.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Uses `hint` when given, otherwise the file name suffix.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnsupportedFormat`] when there is no hint and
    /// the suffix is not recognised.
    pub fn resolve(path: &Utf8Path, hint: Option<Self>) -> Result<Self, ArchiveError> {
        hint.or_else(|| Self::from_file_name(path))
            .ok_or_else(|| ArchiveError::UnsupportedFormat {
                path: path.to_owned(),
            })
    }

    /// The conventional file extension, without a leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// The MIME type used when publishing packages in this format.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::TarGz => "application/gzip",
            Self::Zip => "application/zip",
        }
    }

    /// The extraction backend for this format.
    #[must_use]
    pub fn backend(self) -> &'static dyn ArchiveBackend {
        match self {
            Self::TarGz => &TarGzBackend,
            Self::Zip => &ZipBackend,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = ArchiveError;

    fn from_str(hint: &str) -> Result<Self, Self::Err> {
        match hint {
            "gzip" | "tar.gz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            other => Err(ArchiveError::UnknownFormatHint {
                hint: other.to_owned(),
            }),
        }
    }
}
