//! Core pinbuild library: pinned third-party build inputs.
//!
//! # Modules
//!
//! - [`archive`] - Archive normalisation: root detection, stripped
//!   extraction, zip mode and symlink restoration, and packaging
//! - [`fetch`] - Shallow single-commit git checkouts with submodules
//! - [`process`] - Subprocess seam with explicit working directories
//! - [`version_gate`] - Idempotent steps guarded by version marker files
//! - [`versions`] - The pinned `VERSION` file

pub mod archive;
pub mod fetch;
pub mod process;
pub mod version_gate;
pub mod versions;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use archive::{ArchiveEntry, ArchiveError, ArchiveFormat, detect_root, extract};
pub use fetch::{FetchError, PinnedRevision, ShallowFetcher};
pub use process::{CommandExecutor, CommandSpec, ProcessError, SystemCommandExecutor};
pub use version_gate::{MarkerError, StepOutcome, VersionGate};
pub use versions::{PinnedVersions, VersionsError};
