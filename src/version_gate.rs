//! Idempotent steps guarded by version marker files.
//!
//! A [`VersionGate`] wraps an expensive step (download, extract, build) and
//! records the version it applied in a small plain-text marker file. A
//! later run with the same version string is skipped without invoking the
//! step; a different string, or an explicit force, runs it again.
//!
//! The comparison is textual equality after trimming surrounding
//! whitespace. There is no version ordering and no locking: two gates
//! sharing one marker path in parallel processes may both run their step.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use pinbuild_common::{FsError, make_dir_all, remove_all};
use std::fs;
use std::io;
use thiserror::Error;

/// Errors raised while reading, writing, or discarding a version marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The marker exists but could not be read.
    #[error("failed to read version marker {path}")]
    Read {
        /// Marker location.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The marker could not be written after a successful step.
    #[error("failed to write version marker {path}")]
    Write {
        /// Marker location.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The marker (or its parent directory) could not be created or removed.
    #[error("failed to update version marker {path}")]
    Fs {
        /// Marker location.
        path: Utf8PathBuf,
        /// Underlying filesystem failure.
        #[source]
        source: FsError,
    },
}

/// The result of a gated step.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    /// The step ran and produced a value; the marker now holds the version.
    Ran(T),
    /// The marker already held the requested version; the step did not run.
    Skipped,
}

impl<T> StepOutcome<T> {
    /// Returns `true` when the step was not invoked.
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Returns the step's value when it ran.
    pub fn ran(self) -> Option<T> {
        match self {
            Self::Ran(value) => Some(value),
            Self::Skipped => None,
        }
    }
}

/// A named step guarded by a version marker file.
#[derive(Debug, Clone)]
pub struct VersionGate {
    name: String,
    marker: Utf8PathBuf,
}

impl VersionGate {
    /// Creates a gate for `name` persisting its marker at `marker`.
    #[must_use]
    pub fn new(name: impl Into<String>, marker: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            marker: marker.into(),
        }
    }

    /// The step name used in log output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The marker file location.
    #[must_use]
    pub fn marker(&self) -> &Utf8Path {
        &self.marker
    }

    /// Runs `step` unless the marker already records `version`.
    ///
    /// With `force` the marker is discarded first, so the step always runs.
    /// The marker is written verbatim only after `step` succeeds; a failing
    /// step leaves it exactly as it was so the next run retries.
    ///
    /// # Errors
    ///
    /// Propagates the step's own error unchanged, and converts marker
    /// failures into the caller's error type through `From<MarkerError>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use pinbuild::{MarkerError, VersionGate};
    ///
    /// let temp = tempfile::tempdir()?;
    /// let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
    /// let gate = VersionGate::new("cmake", root.join("cmake.version"));
    ///
    /// let first = gate.run("3.28.1", false, || Ok::<_, MarkerError>("installed"))?;
    /// assert_eq!(first.ran(), Some("installed"));
    ///
    /// let second = gate.run("3.28.1", false, || Ok::<_, MarkerError>("installed again"))?;
    /// assert!(second.is_skipped());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn run<T, E, F>(&self, version: &str, force: bool, step: F) -> Result<StepOutcome<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<MarkerError>,
    {
        if force {
            info!("{}: forced, discarding marker {}", self.name, self.marker);
            self.invalidate()?;
        }

        if self.is_current(version)? {
            info!("{}: version {} already applied, skipping", self.name, version.trim());
            return Ok(StepOutcome::Skipped);
        }

        info!("{}: applying version {}", self.name, version.trim());
        let value = step()?;
        self.record(version)?;
        Ok(StepOutcome::Ran(value))
    }

    /// Returns `true` when the marker exists and records `version`.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Read`] when the marker exists but cannot be
    /// read.
    pub fn is_current(&self, version: &str) -> Result<bool, MarkerError> {
        match fs::read_to_string(&self.marker) {
            Ok(recorded) => {
                debug!("{}: marker {} holds {:?}", self.name, self.marker, recorded.trim());
                Ok(recorded.trim() == version.trim())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MarkerError::Read {
                path: self.marker.clone(),
                source,
            }),
        }
    }

    /// Deletes the marker so the next [`run`](Self::run) executes its step.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Fs`] when the marker cannot be removed.
    pub fn invalidate(&self) -> Result<(), MarkerError> {
        remove_all(&self.marker).map_err(|source| MarkerError::Fs {
            path: self.marker.clone(),
            source,
        })
    }

    fn record(&self, version: &str) -> Result<(), MarkerError> {
        if let Some(parent) = self.marker.parent().filter(|p| !p.as_str().is_empty()) {
            make_dir_all(parent).map_err(|source| MarkerError::Fs {
                path: self.marker.clone(),
                source,
            })?;
        }
        fs::write(&self.marker, version).map_err(|source| MarkerError::Write {
            path: self.marker.clone(),
            source,
        })?;
        debug!("{}: recorded {:?} in {}", self.name, version, self.marker);
        Ok(())
    }
}
