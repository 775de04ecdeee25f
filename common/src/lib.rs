//! Shared path helpers for pinbuild crates: directory creation, recursive
//! removal that tolerates write-protected trees, and PATH-like list
//! manipulation for child-process environments.

pub mod fs;
pub mod search_path;

pub use fs::{FsError, make_dir_all, remove_all};
pub use search_path::{PATH_VAR, SearchPath, SearchPathError};
