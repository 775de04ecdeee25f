//! Build toolchains and the child-process environment.
//!
//! CMake (and, for Android, the NDK) are downloaded as release archives and
//! extracted under the install directory. Each install is gated on the
//! pinned version, so a rerun with unchanged `VERSION` touches nothing.
//! The resulting `bin` directories are not added to this process's `PATH`;
//! they are collected in a [`BuildEnv`] that is applied to every child.

use crate::config::Config;
use crate::download::{Downloader, download};
use crate::error::{InstallerError, Result};
use crate::layout::Layout;
use crate::target::Target;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use pinbuild::archive::extract;
use pinbuild::{CommandSpec, StepOutcome, VersionGate};
use pinbuild_common::{PATH_VAR, SearchPath};
use std::ffi::OsString;

/// Environment variable naming the NDK root for the Android toolchain file.
pub const ANDROID_NDK_HOME: &str = "ANDROID_NDK_HOME";

/// Environment overrides applied to every build subprocess.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildEnv {
    search_path: SearchPath,
    vars: Vec<(String, OsString)>,
}

impl BuildEnv {
    /// Starts from the current process `PATH`.
    #[must_use]
    pub fn from_process() -> Self {
        Self::with_search_path(SearchPath::from_env())
    }

    /// Starts from an explicit search path.
    #[must_use]
    pub fn with_search_path(search_path: SearchPath) -> Self {
        Self {
            search_path,
            vars: Vec::new(),
        }
    }

    /// Puts `dir` first on the children's `PATH`.
    pub fn prepend_path(&mut self, dir: &Utf8Path) {
        self.search_path.prepend(dir);
    }

    /// Sets a variable for every child.
    pub fn set(&mut self, key: &str, value: impl Into<OsString>) {
        self.vars.push((key.to_owned(), value.into()));
    }

    /// The children's search path.
    #[must_use]
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Starts a command for `program` carrying this environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a `PATH` entry contains the separator.
    pub fn command(&self, program: &str) -> Result<CommandSpec> {
        let mut spec = CommandSpec::new(program).env(PATH_VAR, self.search_path.join()?);
        for (key, value) in &self.vars {
            spec = spec.env(key.as_str(), value.clone());
        }
        Ok(spec)
    }
}

/// Installs the pinned build toolchains for one target.
pub struct Toolchains<'a> {
    downloader: &'a dyn Downloader,
    config: &'a Config,
    layout: &'a Layout,
    force: bool,
}

impl<'a> Toolchains<'a> {
    /// Creates an installer. With `force` every gated install runs again.
    #[must_use]
    pub fn new(downloader: &'a dyn Downloader, config: &'a Config, layout: &'a Layout, force: bool) -> Self {
        Self {
            downloader,
            config,
            layout,
            force,
        }
    }

    /// Installs CMake `version` into `<install>/cmake` and returns its `bin`
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the download, the extraction or the marker
    /// update fails.
    pub fn install_cmake(&self, version: &str, target: Target) -> Result<Utf8PathBuf> {
        let release = target.cmake_release();
        let url = self
            .config
            .cmake_url(version, release.platform, release.format.extension());
        let install_dir = self.layout.install_dir();
        let gate = VersionGate::new("cmake", install_dir.join("cmake.version"));

        let outcome = gate.run(version, self.force, || {
            let archive = download(self.downloader, &url, self.layout.source_dir(), None)?;
            extract(&archive, install_dir, "cmake", Some(release.format))?;
            Ok::<(), InstallerError>(())
        })?;
        log_outcome("CMake", version, &outcome);

        Ok(target.cmake_bin_dir(&self.layout.cmake_root()))
    }

    /// Installs Android NDK `version` into `<install>/android-ndk` and
    /// returns the NDK root.
    ///
    /// # Errors
    ///
    /// Returns an error when the download, the extraction or the marker
    /// update fails.
    pub fn install_android_ndk(&self, version: &str) -> Result<Utf8PathBuf> {
        let url = self.config.android_ndk_url(version);
        let install_dir = self.layout.install_dir();
        let gate = VersionGate::new("android-ndk", install_dir.join("android-ndk.version"));

        let outcome = gate.run(version, self.force, || {
            let archive = download(self.downloader, &url, self.layout.source_dir(), None)?;
            extract(&archive, install_dir, "android-ndk", None)?;
            Ok::<(), InstallerError>(())
        })?;
        log_outcome("Android NDK", version, &outcome);

        Ok(self.layout.android_ndk_root())
    }
}

/// The NDK's host LLVM tools.
#[must_use]
pub fn android_ndk_bin_dir(ndk_root: &Utf8Path) -> Utf8PathBuf {
    ndk_root.join("toolchains/llvm/prebuilt/linux-x86_64/bin")
}

fn log_outcome(tool: &str, version: &str, outcome: &StepOutcome<()>) {
    if outcome.is_skipped() {
        info!("{tool} {version} is already installed");
    } else {
        info!("{tool} {version} installed");
    }
}

#[cfg(test)]
#[path = "toolchain_tests.rs"]
mod tests;
