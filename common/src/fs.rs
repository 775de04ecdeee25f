//! Filesystem helpers with `mkdir -p` and `rm -rf` semantics.
//!
//! Removal tolerates write-protected trees: when the first attempt fails
//! with a permission error the owner write bit is restored across the tree
//! and the removal is retried exactly once. Any other failure is returned to
//! the caller unchanged.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised by the filesystem helpers.
#[derive(Debug, Error)]
pub enum FsError {
    /// A directory (or one of its parents) could not be created.
    #[error("failed to create directory {path}")]
    CreateDir {
        /// Directory that was being created.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A file, symlink, or directory tree could not be removed.
    #[error("failed to remove {path}")]
    Remove {
        /// Path that was being removed.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Write protection could not be cleared before retrying a removal.
    #[error("failed to clear write protection under {path}")]
    ClearWriteProtection {
        /// Root of the tree being unprotected.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Creates `path` and any missing parents.
///
/// Succeeds without touching the filesystem when the directory already
/// exists.
///
/// # Errors
///
/// Returns [`FsError::CreateDir`] when the directory cannot be created, for
/// example because a regular file occupies the path.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use pinbuild_common::make_dir_all;
///
/// let temp = tempfile::tempdir()?;
/// let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
/// let nested = root.join("a/b/c");
/// make_dir_all(&nested)?;
/// make_dir_all(&nested)?;
/// assert!(nested.is_dir());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn make_dir_all(path: &Utf8Path) -> Result<(), FsError> {
    if path.is_dir() {
        debug!("mkdir -p {path} => already exists");
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|source| FsError::CreateDir {
        path: path.to_owned(),
        source,
    })?;
    debug!("mkdir -p {path} => directory created");
    Ok(())
}

/// Removes `path` whether it is a file, a symlink, or a directory tree.
///
/// Symlinks are removed without following them. A missing path is not an
/// error.
///
/// # Errors
///
/// Returns [`FsError::Remove`] when removal fails for a reason other than
/// write protection, or when the single retry after clearing protection
/// also fails. Returns [`FsError::ClearWriteProtection`] when the tree
/// cannot be unprotected.
pub fn remove_all(path: &Utf8Path) -> Result<(), FsError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("rm -rf {path} => path not found");
            return Ok(());
        }
        Err(source) => {
            return Err(FsError::Remove {
                path: path.to_owned(),
                source,
            });
        }
    };

    if metadata.is_dir() {
        remove_with_retry(path, || fs::remove_dir_all(path))?;
        debug!("rm -rf {path} => directory removed");
    } else {
        remove_with_retry(path, || fs::remove_file(path))?;
        debug!("rm -rf {path} => file removed");
    }
    Ok(())
}

fn remove_with_retry(path: &Utf8Path, remove: impl Fn() -> io::Result<()>) -> Result<(), FsError> {
    match remove() {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            debug!("rm -rf {path} => permission denied, clearing write protection and retrying");
            clear_write_protection(path)?;
            remove().map_err(|source| FsError::Remove {
                path: path.to_owned(),
                source,
            })
        }
        Err(source) => Err(FsError::Remove {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Restores the owner write bit on every non-symlink entry under `root`.
fn clear_write_protection(root: &Utf8Path) -> Result<(), FsError> {
    let unprotect_err = |source: io::Error| FsError::ClearWriteProtection {
        path: root.to_owned(),
        source,
    };

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|err| unprotect_err(err.into()))?;
        if entry.path_is_symlink() {
            continue;
        }
        let metadata = entry.metadata().map_err(|err| unprotect_err(err.into()))?;
        let mut permissions = metadata.permissions();
        make_owner_writable(&mut permissions);
        fs::set_permissions(entry.path(), permissions).map_err(unprotect_err)?;
    }
    Ok(())
}

#[cfg(unix)]
fn make_owner_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;

    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
#[expect(
    clippy::permissions_set_readonly_false,
    reason = "Windows has no owner bit; clearing the read-only attribute is the only option"
)]
fn make_owner_writable(permissions: &mut fs::Permissions) {
    permissions.set_readonly(false);
}
