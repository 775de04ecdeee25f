//! CLI argument definitions for the msquic builder.
//!
//! The binary only parses these and hands the resulting [`BuildRequest`] to
//! the pipeline, so everything here is testable without touching the
//! filesystem.

use crate::pipeline::BuildRequest;
use crate::target::{Configuration, Target};
use camino::Utf8PathBuf;
use clap::Parser;

/// Build pinned msquic static libraries.
#[derive(Parser, Debug)]
#[command(name = "pinbuild")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build pinned msquic static libraries.\n\n",
    "Reads CMAKE_VERSION, MSQUIC_VERSION and (for Android) ANDROID_NDK_VERSION ",
    "from the VERSION file in the base directory, installs those toolchains ",
    "under _install/<target>/<configuration>, checks msquic out at the pinned ",
    "commit with one level of submodules, and builds the static library.\n\n",
    "Reruns with an unchanged VERSION file reuse the installed toolchains.",
))]
#[command(after_help = concat!(
    "TARGETS:\n",
    "  windows_x86_64, macos_x86_64, macos_arm64, ubuntu-20.04_x86_64, ios, android\n\n",
    "EXAMPLES:\n",
    "  Release build for Linux:\n",
    "    $ pinbuild ubuntu-20.04_x86_64\n\n",
    "  Debug build for Android, packaged for upload:\n",
    "    $ pinbuild android --debug --package\n\n",
    "  Use a mirror configured in a separate file:\n",
    "    $ pinbuild macos_arm64 --config mirrors/pinbuild.toml\n",
))]
pub struct Cli {
    /// Platform to build for.
    #[arg(value_enum, value_name = "TARGET")]
    pub target: Target,

    /// Build the Debug configuration.
    #[arg(long)]
    pub debug: bool,

    /// Build the RelWithDebInfo configuration (takes precedence over --debug).
    #[arg(long)]
    pub relwithdebinfo: bool,

    /// Write a distributable archive and msquic.env under _package.
    #[arg(long)]
    pub package: bool,

    /// Directory holding VERSION and the work trees.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub base_dir: Utf8PathBuf,

    /// Configuration file [default: <base-dir>/pinbuild.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Reinstall CMake and the Android NDK even when already current.
    #[arg(long)]
    pub force_toolchains: bool,

    /// Number of parallel build jobs [default: number of CPUs].
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    /// The build this invocation asks for.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use pinbuild_installer::cli::Cli;
    /// use pinbuild_installer::target::{Configuration, Target};
    ///
    /// let cli = Cli::parse_from(["pinbuild", "ios", "--debug", "-j", "2"]);
    /// let request = cli.build_request();
    /// assert_eq!(request.target, Target::Ios);
    /// assert_eq!(request.configuration, Configuration::Debug);
    /// assert_eq!(request.jobs, 2);
    /// ```
    #[must_use]
    pub fn build_request(&self) -> BuildRequest {
        BuildRequest {
            target: self.target,
            configuration: Configuration::from_flags(self.debug, self.relwithdebinfo),
            base_dir: self.base_dir.clone(),
            config_path: self.config.clone(),
            package: self.package,
            force_toolchains: self.force_toolchains,
            jobs: self.jobs.filter(|jobs| *jobs > 0).unwrap_or_else(num_cpus::get),
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
