//! End-to-end build orchestration.
//!
//! One [`run`] reads the pinned versions, installs the toolchains, fetches
//! msquic with its submodules, builds it, and optionally packages it. Every
//! step owns its output paths destructively, so a rerun converges on the
//! same result; only toolchain installs are skipped when already current.

use crate::builder::{BuildSettings, MsquicBuilder};
use crate::config::Config;
use crate::download::Downloader;
use crate::error::Result;
use crate::layout::Layout;
use crate::packaging::{PackageOutput, PackageRequest, package};
use crate::target::{Configuration, Target};
use crate::toolchain::{ANDROID_NDK_HOME, BuildEnv, Toolchains, android_ndk_bin_dir};
use camino::Utf8PathBuf;
use log::info;
use pinbuild::{CommandExecutor, PinnedRevision, PinnedVersions, ShallowFetcher};

/// Name of the pinned versions file in the base directory.
pub const VERSION_FILE: &str = "VERSION";

/// `VERSION` key of the CMake release.
pub const CMAKE_VERSION: &str = "CMAKE_VERSION";
/// `VERSION` key of the msquic commit or tag.
pub const MSQUIC_VERSION: &str = "MSQUIC_VERSION";
/// `VERSION` key of the Android NDK release.
pub const ANDROID_NDK_VERSION: &str = "ANDROID_NDK_VERSION";

/// What to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildRequest {
    /// Platform to build for.
    pub target: Target,
    /// CMake configuration.
    pub configuration: Configuration,
    /// Directory holding `VERSION` and the work trees.
    pub base_dir: Utf8PathBuf,
    /// Explicit configuration file, instead of `<base>/pinbuild.toml`.
    pub config_path: Option<Utf8PathBuf>,
    /// Whether to produce a distributable archive.
    pub package: bool,
    /// Reinstall toolchains even when their markers are current.
    pub force_toolchains: bool,
    /// Parallel build jobs.
    pub jobs: usize,
}

/// External collaborators of a run.
pub struct Services<'a> {
    /// Launches git, cmake, xcrun and lipo.
    pub executor: &'a dyn CommandExecutor,
    /// Fetches toolchain archives.
    pub downloader: &'a dyn Downloader,
    /// Environment the build tools start from.
    pub base_env: BuildEnv,
}

/// What a run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    /// The installed static library.
    pub library: Utf8PathBuf,
    /// msquic and its submodules, as checked out.
    pub sources: Vec<PinnedRevision>,
    /// The package, when requested.
    pub package: Option<PackageOutput>,
}

/// Builds msquic for `request.target`.
///
/// # Errors
///
/// Returns the first failing step's error. Configuration problems (missing
/// `VERSION` keys, a bad `pinbuild.toml`) are reported before any work.
pub fn run(request: &BuildRequest, services: Services<'_>) -> Result<BuildReport> {
    let versions = PinnedVersions::load(&request.base_dir.join(VERSION_FILE))?;
    let cmake_version = versions.require(CMAKE_VERSION)?;
    let msquic_version = versions.require(MSQUIC_VERSION)?;
    let ndk_version = match request.target {
        Target::Android => Some(versions.require(ANDROID_NDK_VERSION)?),
        _ => None,
    };
    let config = Config::discover(request.config_path.as_deref(), &request.base_dir)?;

    let layout = Layout::new(&request.base_dir, request.target, request.configuration);
    layout.create()?;

    let mut env = services.base_env;
    let toolchains = Toolchains::new(services.downloader, &config, &layout, request.force_toolchains);
    env.prepend_path(&toolchains.install_cmake(cmake_version, request.target)?);
    if let Some(ndk_version) = ndk_version {
        let ndk_root = toolchains.install_android_ndk(ndk_version)?;
        env.prepend_path(&android_ndk_bin_dir(&ndk_root));
        env.set(ANDROID_NDK_HOME, ndk_root.as_std_path());
    }

    let builder = MsquicBuilder::new(
        services.executor,
        &env,
        BuildSettings {
            target: request.target,
            configuration: request.configuration,
            layout: &layout,
            jobs: request.jobs,
        },
    );
    builder.reset_build_dir()?;

    let sources = ShallowFetcher::new(services.executor).materialize_with_submodules(
        &config.msquic_repository,
        msquic_version,
        &layout.msquic_source(),
    )?;
    let library = builder.build()?;
    info!("Installed {library}");

    let packaged = if request.package {
        Some(package(&PackageRequest {
            layout: &layout,
            target: request.target,
            msquic_version,
        })?)
    } else {
        None
    };

    Ok(BuildReport {
        library,
        sources,
        package: packaged,
    })
}
