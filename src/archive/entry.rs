//! Format-agnostic archive entries and common-root detection.

use super::error::ArchiveError;
use std::path::{Component, Path};

/// One entry of an archive, independent of the container format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name as stored, `/`-separated. Zip directory entries carry a
    /// trailing `/`; tar directory entries may not.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Stored POSIX mode including the file-type bits, when recorded.
    pub mode: Option<u32>,
    /// Symlink target, when the entry is a symbolic link.
    pub link_target: Option<String>,
}

impl ArchiveEntry {
    /// A regular file entry without mode information.
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            mode: None,
            link_target: None,
        }
    }

    /// A directory entry without mode information.
    #[must_use]
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            is_dir: true,
            ..Self::file(path)
        }
    }

    /// Attaches a stored mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Returns the single top-level directory shared by every entry.
///
/// Leading `./` segments are ignored. An entry sitting directly at the root
/// only keeps the archive single-rooted when it is itself a directory; a
/// bare root-level file, two distinct first segments, or an empty archive
/// all yield `None`, meaning nothing is stripped.
///
/// # Examples
///
/// ```
/// use pinbuild::{ArchiveEntry, detect_root};
///
/// let wrapped = [
///     ArchiveEntry::dir("libfoo-1.2/"),
///     ArchiveEntry::file("libfoo-1.2/src/lib.c"),
/// ];
/// assert_eq!(detect_root(&wrapped).as_deref(), Some("libfoo-1.2"));
///
/// let flat = [ArchiveEntry::file("README"), ArchiveEntry::file("src/lib.c")];
/// assert_eq!(detect_root(&flat), None);
/// ```
#[must_use]
pub fn detect_root(entries: &[ArchiveEntry]) -> Option<String> {
    let mut root: Option<&str> = None;

    for entry in entries {
        let name = strip_current_dir(&entry.path).trim_end_matches('/');
        if name.is_empty() || name == "." {
            continue;
        }

        let segment = match name.split_once('/') {
            Some((first, _)) => first,
            None if entry.is_dir => name,
            None => return None,
        };

        match root {
            Some(existing) if existing != segment => return None,
            _ => root = Some(segment),
        }
    }

    root.map(str::to_owned)
}

fn strip_current_dir(mut name: &str) -> &str {
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    name
}

/// Rejects entry names that would escape the extraction directory via
/// `..` components or absolute paths.
pub(crate) fn validate_entry_path(name: &str) -> Result<(), ArchiveError> {
    let path = Path::new(name);
    let escapes = name.starts_with('/')
        || path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ArchiveError::PathTraversal {
            path: name.to_owned(),
        });
    }
    Ok(())
}
