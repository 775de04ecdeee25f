//! Work directory layout.
//!
//! Everything lives under a base directory, split per target and
//! configuration so builds for different platforms never share state:
//!
//! ```text
//! <base>/_source/<target>/<config>    downloads and the msquic checkout
//! <base>/_build/<target>/<config>     cmake build trees
//! <base>/_install/<target>/<config>   toolchains, markers, msquic install
//! <base>/_package/<target>/<config>   distributable archives
//! ```

use crate::target::{Configuration, Target};
use camino::{Utf8Path, Utf8PathBuf};
use pinbuild_common::{FsError, make_dir_all};

/// Resolved work directories for one target and configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    base_dir: Utf8PathBuf,
    source_dir: Utf8PathBuf,
    build_dir: Utf8PathBuf,
    install_dir: Utf8PathBuf,
    package_dir: Utf8PathBuf,
}

impl Layout {
    /// Computes the layout without touching the filesystem.
    #[must_use]
    pub fn new(base_dir: &Utf8Path, target: Target, configuration: Configuration) -> Self {
        let leaf = |root: &str| base_dir.join(root).join(target.as_str()).join(configuration.dir_name());
        Self {
            base_dir: base_dir.to_owned(),
            source_dir: leaf("_source"),
            build_dir: leaf("_build"),
            install_dir: leaf("_install"),
            package_dir: leaf("_package"),
        }
    }

    /// Creates the source, build and install directories.
    ///
    /// The package directory is created on demand by packaging.
    ///
    /// # Errors
    ///
    /// Returns [`FsError`] when a directory cannot be created.
    pub fn create(&self) -> Result<(), FsError> {
        make_dir_all(&self.source_dir)?;
        make_dir_all(&self.build_dir)?;
        make_dir_all(&self.install_dir)
    }

    /// The base directory holding `VERSION`.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Downloads and source checkouts.
    #[must_use]
    pub fn source_dir(&self) -> &Utf8Path {
        &self.source_dir
    }

    /// Build trees.
    #[must_use]
    pub fn build_dir(&self) -> &Utf8Path {
        &self.build_dir
    }

    /// Toolchains, version markers and the msquic install tree.
    #[must_use]
    pub fn install_dir(&self) -> &Utf8Path {
        &self.install_dir
    }

    /// Distributable archives.
    #[must_use]
    pub fn package_dir(&self) -> &Utf8Path {
        &self.package_dir
    }

    /// The msquic checkout.
    #[must_use]
    pub fn msquic_source(&self) -> Utf8PathBuf {
        self.source_dir.join("msquic")
    }

    /// The msquic build tree.
    #[must_use]
    pub fn msquic_build(&self) -> Utf8PathBuf {
        self.build_dir.join("msquic")
    }

    /// The msquic install prefix.
    #[must_use]
    pub fn msquic_install(&self) -> Utf8PathBuf {
        self.install_dir.join("msquic")
    }

    /// The extracted CMake release.
    #[must_use]
    pub fn cmake_root(&self) -> Utf8PathBuf {
        self.install_dir.join("cmake")
    }

    /// The extracted Android NDK.
    #[must_use]
    pub fn android_ndk_root(&self) -> Utf8PathBuf {
        self.install_dir.join("android-ndk")
    }
}
