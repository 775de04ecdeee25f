//! Build targets and configurations.
//!
//! A [`Target`] fixes everything that differs per platform: which CMake
//! release runs the build, where its `bin` directory sits after
//! extraction, what the static library is called, and how the result is
//! packaged.

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use pinbuild::ArchiveFormat;
use std::fmt;

/// A platform msquic can be built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Target {
    /// Windows on x86-64, built with MSVC.
    #[value(name = "windows_x86_64")]
    WindowsX86_64,
    /// macOS on Intel.
    #[value(name = "macos_x86_64")]
    MacosX86_64,
    /// macOS on Apple silicon.
    #[value(name = "macos_arm64")]
    MacosArm64,
    /// Ubuntu 20.04 on x86-64.
    #[value(name = "ubuntu-20.04_x86_64")]
    Ubuntu2004X86_64,
    /// iOS, as a simulator and device fat library.
    #[value(name = "ios")]
    Ios,
    /// Android arm64-v8a, cross-compiled on Linux with the NDK.
    #[value(name = "android")]
    Android,
}

/// A CMake binary release: its platform tag and archive format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmakeRelease {
    /// Platform component of the release file name.
    pub platform: &'static str,
    /// Archive format of the release.
    pub format: ArchiveFormat,
}

impl Target {
    /// Every supported target, in CLI order.
    pub const ALL: [Self; 6] = [
        Self::WindowsX86_64,
        Self::MacosX86_64,
        Self::MacosArm64,
        Self::Ubuntu2004X86_64,
        Self::Ios,
        Self::Android,
    ];

    /// The target's CLI and directory name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WindowsX86_64 => "windows_x86_64",
            Self::MacosX86_64 => "macos_x86_64",
            Self::MacosArm64 => "macos_arm64",
            Self::Ubuntu2004X86_64 => "ubuntu-20.04_x86_64",
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// The CMake release that runs on the build host for this target.
    #[must_use]
    pub const fn cmake_release(self) -> CmakeRelease {
        match self {
            Self::WindowsX86_64 => CmakeRelease {
                platform: "windows-x86_64",
                format: ArchiveFormat::Zip,
            },
            Self::MacosX86_64 | Self::MacosArm64 | Self::Ios => CmakeRelease {
                platform: "macos-universal",
                format: ArchiveFormat::TarGz,
            },
            Self::Ubuntu2004X86_64 | Self::Android => CmakeRelease {
                platform: "linux-x86_64",
                format: ArchiveFormat::TarGz,
            },
        }
    }

    /// The extracted CMake's `bin` directory, given the CMake install root.
    ///
    /// macOS releases ship as an app bundle.
    #[must_use]
    pub fn cmake_bin_dir(self, cmake_root: &Utf8Path) -> Utf8PathBuf {
        if self.is_apple() {
            cmake_root.join("CMake.app/Contents/bin")
        } else {
            cmake_root.join("bin")
        }
    }

    /// File name of the msquic static library.
    #[must_use]
    pub const fn library_name(self) -> &'static str {
        match self {
            Self::WindowsX86_64 => "msquic.lib",
            _ => "libmsquic.a",
        }
    }

    /// Archive format used for the distributable package.
    #[must_use]
    pub const fn package_format(self) -> ArchiveFormat {
        match self {
            Self::WindowsX86_64 => ArchiveFormat::Zip,
            _ => ArchiveFormat::TarGz,
        }
    }

    /// Whether the build runs on a macOS host.
    #[must_use]
    pub const fn is_apple(self) -> bool {
        matches!(self, Self::MacosX86_64 | Self::MacosArm64 | Self::Ios)
    }

    /// Architecture and compiler triple for macOS desktop targets.
    #[must_use]
    pub const fn macos_arch(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::MacosX86_64 => Some(("x86_64", "x86_64-apple-darwin")),
            Self::MacosArm64 => Some(("arm64", "aarch64-apple-darwin")),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The CMake build configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Configuration {
    /// Unoptimised with debug information.
    Debug,
    /// Optimised.
    #[default]
    Release,
    /// Optimised with debug information.
    RelWithDebInfo,
}

impl Configuration {
    /// Picks the configuration from the CLI flags.
    ///
    /// `--relwithdebinfo` wins over `--debug`.
    #[must_use]
    pub const fn from_flags(debug: bool, relwithdebinfo: bool) -> Self {
        if relwithdebinfo {
            Self::RelWithDebInfo
        } else if debug {
            Self::Debug
        } else {
            Self::Release
        }
    }

    /// Value passed as `CMAKE_BUILD_TYPE` and `--config`.
    #[must_use]
    pub const fn cmake_name(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Release => "Release",
            Self::RelWithDebInfo => "RelWithDebInfo",
        }
    }

    /// Directory component of the work layout.
    ///
    /// Only debug builds get their own tree; `RelWithDebInfo` shares the
    /// release tree. The tree follows the configuration actually built, so
    /// `--debug --relwithdebinfo` lands in `release/` and a `debug/` tree
    /// never holds optimised objects.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release | Self::RelWithDebInfo => "release",
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cmake_name())
    }
}
