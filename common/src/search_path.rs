//! PATH-like list manipulation.
//!
//! Builds the search path handed to child processes. The process
//! environment is read but never modified.

use log::debug;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the executable search path variable.
pub const PATH_VAR: &str = "PATH";

/// Error raised when a search path cannot be rendered back to a string.
#[derive(Debug, Error)]
#[error("search path entry contains the platform path separator")]
pub struct SearchPathError(#[from] env::JoinPathsError);

/// An ordered list of directories joined with the platform separator
/// (`:` on Unix, `;` on Windows).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    /// Splits a PATH-like value into its entries, dropping empty segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinbuild_common::SearchPath;
    /// use std::ffi::OsStr;
    ///
    /// let joined = std::env::join_paths(["/usr/bin", "/bin"]).expect("joinable");
    /// let path = SearchPath::parse(&joined);
    /// assert_eq!(path.entries().len(), 2);
    /// assert!(SearchPath::parse(OsStr::new("")).is_empty());
    /// ```
    #[must_use]
    pub fn parse(value: &OsStr) -> Self {
        Self {
            entries: env::split_paths(value)
                .filter(|entry| !entry.as_os_str().is_empty())
                .collect(),
        }
    }

    /// Reads the current process `PATH`, treating an unset variable as empty.
    #[must_use]
    pub fn from_env() -> Self {
        env::var_os(PATH_VAR)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    /// Places `dir` ahead of every existing entry.
    pub fn prepend(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        debug!("search path: prepend {}", dir.display());
        self.entries.insert(0, dir.to_path_buf());
    }

    /// Places `dir` after every existing entry.
    pub fn append(&mut self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        debug!("search path: append {}", dir.display());
        self.entries.push(dir.to_path_buf());
    }

    /// Returns the entries in lookup order.
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Returns `true` when the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Joins the entries with the platform separator.
    ///
    /// # Errors
    ///
    /// Returns [`SearchPathError`] when an entry itself contains the
    /// separator character.
    pub fn join(&self) -> Result<OsString, SearchPathError> {
        Ok(env::join_paths(&self.entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn joined(parts: &[&str]) -> OsString {
        env::join_paths(parts).expect("test entries are joinable")
    }

    #[rstest]
    fn prepend_places_entry_first() {
        let mut path = SearchPath::parse(&joined(&["/usr/bin", "/bin"]));

        path.prepend("/opt/cmake/bin");

        assert_eq!(
            path.entries(),
            &[
                PathBuf::from("/opt/cmake/bin"),
                PathBuf::from("/usr/bin"),
                PathBuf::from("/bin"),
            ]
        );
    }

    #[rstest]
    fn append_places_entry_last() {
        let mut path = SearchPath::parse(&joined(&["/usr/bin"]));

        path.append("/opt/ndk/bin");

        assert_eq!(
            path.entries(),
            &[PathBuf::from("/usr/bin"), PathBuf::from("/opt/ndk/bin")]
        );
    }

    #[rstest]
    fn join_round_trips_through_parse() {
        let mut path = SearchPath::default();
        path.prepend("/b");
        path.prepend("/a");

        let rendered = path.join().expect("joinable");

        assert_eq!(rendered, joined(&["/a", "/b"]));
    }

    #[rstest]
    fn prepend_to_an_empty_path_yields_a_single_entry() {
        let mut path = SearchPath::parse(OsStr::new(""));

        path.prepend("/only");

        assert_eq!(path.join().expect("joinable"), OsString::from("/only"));
    }

    #[rstest]
    fn from_env_reads_path_variable() {
        let value = joined(&["/first", "/second"]);

        let path = temp_env::with_var(PATH_VAR, Some(&value), SearchPath::from_env);

        assert_eq!(
            path.entries(),
            &[PathBuf::from("/first"), PathBuf::from("/second")]
        );
    }

    #[rstest]
    fn from_env_treats_unset_path_as_empty() {
        let path = temp_env::with_var_unset(PATH_VAR, SearchPath::from_env);

        assert!(path.is_empty());
    }

    #[cfg(unix)]
    #[rstest]
    fn join_rejects_entries_containing_the_separator() {
        let mut path = SearchPath::default();
        path.append("/has:colon");

        assert!(path.join().is_err());
    }
}
