//! The pinned `VERSION` file.
//!
//! One `KEY=VALUE` pair per line. Blank lines and lines starting with `#`
//! are ignored, whitespace around keys and values is trimmed, and double
//! quotes around values are dropped:
//!
//! ```text
//! # toolchains
//! CMAKE_VERSION=3.28.1
//! MSQUIC_VERSION="v2.2.4"
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or querying pinned versions.
#[derive(Debug, Error)]
pub enum VersionsError {
    /// The file could not be read.
    #[error("failed to read version file {path}")]
    Read {
        /// File location.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A non-comment line is not a `KEY=VALUE` pair.
    #[error("line {line_number} is not a KEY=VALUE pair: {line}")]
    Malformed {
        /// One-based line number.
        line_number: usize,
        /// The offending line, trimmed.
        line: String,
    },

    /// A required key is absent.
    #[error("{key} is missing from the version file")]
    Missing {
        /// The key that was looked up.
        key: String,
    },
}

/// Pinned version identifiers keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PinnedVersions {
    entries: BTreeMap<String, String>,
}

impl PinnedVersions {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionsError::Read`] when the file cannot be read and
    /// [`VersionsError::Malformed`] for lines that are not pairs.
    pub fn load(path: &Utf8Path) -> Result<Self, VersionsError> {
        let source = fs::read_to_string(path).map_err(|source| VersionsError::Read {
            path: path.to_owned(),
            source,
        })?;
        source.parse()
    }

    /// Returns the value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value recorded for `key`, treating absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`VersionsError::Missing`] when the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinbuild::PinnedVersions;
    ///
    /// let versions: PinnedVersions = "CMAKE_VERSION=3.28.1\n".parse()?;
    /// assert_eq!(versions.require("CMAKE_VERSION")?, "3.28.1");
    /// assert!(versions.require("MSQUIC_VERSION").is_err());
    /// # Ok::<(), pinbuild::VersionsError>(())
    /// ```
    pub fn require(&self, key: &str) -> Result<&str, VersionsError> {
        self.get(key).ok_or_else(|| VersionsError::Missing {
            key: key.to_owned(),
        })
    }

    /// Iterates over the pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromStr for PinnedVersions {
    type Err = VersionsError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut entries = BTreeMap::new();
        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let malformed = || VersionsError::Malformed {
                line_number: index + 1,
                line: line.to_owned(),
            };
            let (key, value) = line.split_once('=').ok_or_else(malformed)?;
            let key = key.trim();
            if key.is_empty() {
                return Err(malformed());
            }
            let value = value.trim().trim_matches('"');
            entries.insert(key.to_owned(), value.to_owned());
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_pairs_comments_and_quotes() {
        let source = "# pinned\n\nCMAKE_VERSION=3.28.1\n  MSQUIC_VERSION = \"v2.2.4\"  \n";

        let versions: PinnedVersions = source.parse().expect("parse");

        assert_eq!(versions.get("CMAKE_VERSION"), Some("3.28.1"));
        assert_eq!(versions.get("MSQUIC_VERSION"), Some("v2.2.4"));
        assert_eq!(versions.iter().count(), 2);
    }

    #[rstest]
    fn later_lines_override_earlier_ones() {
        let versions: PinnedVersions = "A=1\nA=2\n".parse().expect("parse");

        assert_eq!(versions.get("A"), Some("2"));
    }

    #[rstest]
    fn value_may_contain_equals_signs() {
        let versions: PinnedVersions = "URL=https://x/?a=b\n".parse().expect("parse");

        assert_eq!(versions.get("URL"), Some("https://x/?a=b"));
    }

    #[rstest]
    #[case::no_separator("JUST_A_WORD", 1)]
    #[case::empty_key("\n=value", 2)]
    fn rejects_malformed_lines(#[case] source: &str, #[case] expected_line: usize) {
        let err = source.parse::<PinnedVersions>().expect_err("malformed");

        assert!(
            matches!(err, VersionsError::Malformed { line_number, .. } if line_number == expected_line),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    fn require_reports_the_missing_key() {
        let versions = PinnedVersions::default();

        let err = versions.require("ANDROID_NDK_VERSION").expect_err("missing");

        assert!(err.to_string().contains("ANDROID_NDK_VERSION"));
    }

    #[rstest]
    fn load_reads_from_disk() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().join("VERSION")).expect("UTF-8 path");
        fs::write(&path, "CMAKE_VERSION=3.28.1\n").expect("write");

        let versions = PinnedVersions::load(&path).expect("load");

        assert_eq!(versions.require("CMAKE_VERSION").expect("present"), "3.28.1");
    }
}
