//! Toolchain archive downloads.
//!
//! [`download`] is the fetch primitive: it places one URL at a file path,
//! treats an existing file as already fetched, and never leaves a partial
//! file behind on failure. The transport sits behind [`Downloader`] so
//! tests run without network access.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use pinbuild_common::{FsError, remove_all};
use std::fs::File;
use std::io;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Errors arising from downloads.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL could not be parsed.
    #[error("invalid download URL {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },

    /// The URL path has no final segment to name the file after.
    #[error("cannot derive a file name from {url}")]
    NoFileName {
        /// The URL.
        url: String,
    },

    /// The server answered 404.
    #[error("not found: {url}")]
    NotFound {
        /// The URL.
        url: String,
    },

    /// The request failed for any other reason.
    #[error("download failed for {url}: {reason}")]
    Http {
        /// The URL.
        url: String,
        /// Human-readable failure.
        reason: String,
    },

    /// The response body could not be written.
    #[error("failed to write {path}")]
    Write {
        /// Destination file.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A partial file could not be removed after a failure.
    #[error(transparent)]
    Cleanup(#[from] FsError),
}

/// Transport for fetching one URL into one file.
#[cfg_attr(test, mockall::automock)]
pub trait Downloader {
    /// Writes the body of `url` to `dest`, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] when the request or the write fails. The
    /// destination may be left partially written.
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError>;
}

/// HTTP transport using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError> {
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let write_err = |source| DownloadError::Write {
            path: dest.to_owned(),
            source,
        };
        let mut file = File::create(dest).map_err(write_err)?;
        io::copy(&mut response.into_body().as_reader(), &mut file).map_err(write_err)?;
        Ok(())
    }
}

/// Downloads `url` into `output_dir` and returns the file path.
///
/// The file is named `filename` when given, otherwise after the last
/// segment of the URL path. An existing file is returned untouched.
///
/// # Errors
///
/// Returns [`DownloadError`] when the URL is unusable or the transport
/// fails. On transport failure the partial file is removed first.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use pinbuild_installer::download::{HttpDownloader, download};
///
/// let archive = download(
///     &HttpDownloader,
///     "https://github.com/Kitware/CMake/releases/download/v3.28.1/cmake-3.28.1-linux-x86_64.tar.gz",
///     Utf8Path::new("_source"),
///     None,
/// )?;
/// assert_eq!(archive.file_name(), Some("cmake-3.28.1-linux-x86_64.tar.gz"));
/// # Ok::<(), pinbuild_installer::download::DownloadError>(())
/// ```
pub fn download(
    downloader: &dyn Downloader,
    url: &str,
    output_dir: &Utf8Path,
    filename: Option<&str>,
) -> Result<Utf8PathBuf, DownloadError> {
    let name = match filename {
        Some(name) => name.to_owned(),
        None => file_name_from_url(url)?,
    };
    let dest = output_dir.join(name);

    if dest.exists() {
        debug!("{dest} already downloaded");
        return Ok(dest);
    }

    info!("Downloading {url}");
    if let Err(err) = downloader.fetch(url, &dest) {
        remove_all(&dest)?;
        return Err(err);
    }
    Ok(dest)
}

/// Returns the last segment of the URL path.
fn file_name_from_url(url: &str) -> Result<String, DownloadError> {
    let parsed = Url::parse(url).map_err(|source| DownloadError::InvalidUrl {
        url: url.to_owned(),
        source,
    })?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| DownloadError::NoFileName {
            url: url.to_owned(),
        })
}

/// Shared `ureq` agent.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| ureq::Agent::new_with_config(ureq::Agent::config_builder().build()))
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
