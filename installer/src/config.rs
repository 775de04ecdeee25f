//! Optional `pinbuild.toml` overrides.
//!
//! Every key has a default pointing at the upstream hosts, so the file only
//! needs to exist when building against mirrors:
//!
//! ```toml
//! msquic_repository = "https://mirror.example/msquic.git"
//! cmake_download_base = "https://mirror.example/cmake"
//! android_ndk_download_base = "https://mirror.example/android"
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::io;
use thiserror::Error;
use url::Url;

/// File name looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "pinbuild.toml";

const MSQUIC_REPOSITORY: &str = "https://github.com/microsoft/msquic.git";
const CMAKE_DOWNLOAD_BASE: &str = "https://github.com/Kitware/CMake/releases/download";
const ANDROID_NDK_DOWNLOAD_BASE: &str = "https://dl.google.com/android/repository";

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}")]
    Read {
        /// File location.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("invalid configuration in {path}")]
    Parse {
        /// File location.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: toml::de::Error,
    },

    /// A URL-valued key does not hold a URL.
    #[error("{key} is not a valid URL: {value}")]
    InvalidUrl {
        /// The offending key.
        key: &'static str,
        /// Its value.
        value: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

/// Download and repository locations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Git URL of the msquic repository.
    pub msquic_repository: String,
    /// Base URL of the CMake release downloads.
    pub cmake_download_base: String,
    /// Base URL of the Android NDK downloads.
    pub android_ndk_download_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            msquic_repository: MSQUIC_REPOSITORY.to_owned(),
            cmake_download_base: CMAKE_DOWNLOAD_BASE.to_owned(),
            android_ndk_download_base: ANDROID_NDK_DOWNLOAD_BASE.to_owned(),
        }
    }
}

impl Config {
    /// Loads `explicit` when given, otherwise `base_dir/pinbuild.toml` when
    /// it exists, otherwise the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a file is found but cannot be read,
    /// parsed, or validated. A missing explicit file is a read error.
    pub fn discover(explicit: Option<&Utf8Path>, base_dir: &Utf8Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = base_dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            debug!("no {candidate}, using default download locations");
            Ok(Self::default())
        }
    }

    /// Loads and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        debug!("loaded configuration from {path}");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("msquic_repository", &self.msquic_repository),
            ("cmake_download_base", &self.cmake_download_base),
            ("android_ndk_download_base", &self.android_ndk_download_base),
        ] {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                key,
                value: value.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// URL of the CMake release archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinbuild_installer::config::Config;
    ///
    /// let url = Config::default().cmake_url("3.28.1", "linux-x86_64", "tar.gz");
    /// assert_eq!(
    ///     url,
    ///     "https://github.com/Kitware/CMake/releases/download/v3.28.1/cmake-3.28.1-linux-x86_64.tar.gz"
    /// );
    /// ```
    #[must_use]
    pub fn cmake_url(&self, version: &str, platform: &str, extension: &str) -> String {
        format!(
            "{}/v{version}/cmake-{version}-{platform}.{extension}",
            self.cmake_download_base.trim_end_matches('/')
        )
    }

    /// URL of the Linux-hosted Android NDK archive.
    #[must_use]
    pub fn android_ndk_url(&self, version: &str) -> String {
        format!(
            "{}/android-ndk-{version}-linux.zip",
            self.android_ndk_download_base.trim_end_matches('/')
        )
    }
}
