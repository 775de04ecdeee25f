//! CMake build of the msquic static library.
//!
//! The build tree is configured once per target (twice for iOS, whose
//! simulator and device slices are merged with `lipo`), only the
//! `msquic_lib` target is built, and the library is copied into the install
//! prefix because `cmake --install` does not place it there.

use crate::error::{InstallerError, Result};
use crate::layout::Layout;
use crate::target::{Configuration, Target};
use crate::toolchain::BuildEnv;
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use pinbuild::{CommandExecutor, CommandSpec};
use pinbuild_common::{make_dir_all, remove_all};
use std::fs;

/// The CMake target that produces the static library.
const MSQUIC_TARGET: &str = "msquic_lib";

/// Minimum iOS version for both slices.
const IOS_DEPLOYMENT_TARGET: &str = "13.0";

/// Converts a native path into the forward-slash form CMake expects.
///
/// # Examples
///
/// ```
/// use pinbuild_installer::builder::cmake_path;
///
/// assert_eq!(cmake_path(r"C:\work\_install\msquic"), "C:/work/_install/msquic");
/// assert_eq!(cmake_path("/work/_install/msquic"), "/work/_install/msquic");
/// ```
#[must_use]
pub fn cmake_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Inputs of one msquic build.
#[derive(Clone, Copy, Debug)]
pub struct BuildSettings<'a> {
    /// Platform being built.
    pub target: Target,
    /// CMake configuration.
    pub configuration: Configuration,
    /// Work directories.
    pub layout: &'a Layout,
    /// Parallel build jobs.
    pub jobs: usize,
}

/// Runs the msquic CMake build.
pub struct MsquicBuilder<'a> {
    executor: &'a dyn CommandExecutor,
    env: &'a BuildEnv,
    settings: BuildSettings<'a>,
}

impl<'a> MsquicBuilder<'a> {
    /// Creates a builder launching tools through `executor` with `env`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, env: &'a BuildEnv, settings: BuildSettings<'a>) -> Self {
        Self {
            executor,
            env,
            settings,
        }
    }

    /// Empties the msquic build tree.
    ///
    /// # Errors
    ///
    /// Returns an error when the tree cannot be removed or recreated.
    pub fn reset_build_dir(&self) -> Result<Utf8PathBuf> {
        let build_dir = self.settings.layout.msquic_build();
        remove_all(&build_dir)?;
        make_dir_all(&build_dir)?;
        Ok(build_dir)
    }

    /// Configures, builds and installs msquic, then copies the static
    /// library into `<install>/msquic/lib`. Returns the copied library.
    ///
    /// Expects the sources to be checked out and the build tree to exist.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Tool`] when a tool fails and
    /// [`InstallerError::Copy`] when the library was not produced.
    pub fn build(&self) -> Result<Utf8PathBuf> {
        let layout = self.settings.layout;
        let configuration = self.settings.configuration;
        let build_dir = layout.msquic_build();
        let mut args = self.configure_args()?;
        info!(
            "Building msquic for {} ({configuration})",
            self.settings.target
        );

        let built = if self.settings.target == Target::Ios {
            self.build_ios_slices(&build_dir, &mut args)?
        } else {
            self.cmake_configure(&build_dir, &args)?;
            self.cmake_build(&build_dir)?;
            self.run(
                "cmake install",
                self.cmake(&build_dir)?
                    .args(["--install", ".", "--config", configuration.cmake_name()]),
            )?;
            build_dir
                .join("bin")
                .join(configuration.cmake_name())
                .join(self.settings.target.library_name())
        };

        let lib_dir = layout.msquic_install().join("lib");
        make_dir_all(&lib_dir)?;
        let installed = lib_dir.join(self.settings.target.library_name());
        fs::copy(&built, &installed).map_err(|source| InstallerError::Copy {
            from: built.clone(),
            to: installed.clone(),
            source,
        })?;
        Ok(installed)
    }

    /// The arguments of the configure step, minus the source directory.
    ///
    /// # Errors
    ///
    /// Returns an error when querying the macOS SDK path fails.
    pub fn configure_args(&self) -> Result<Vec<String>> {
        let BuildSettings {
            target,
            configuration,
            layout,
            ..
        } = self.settings;
        let mut args = vec![
            format!("-DCMAKE_BUILD_TYPE={}", configuration.cmake_name()),
            format!("-DCMAKE_INSTALL_PREFIX={}", cmake_path(layout.msquic_install().as_str())),
            "-DQUIC_BUILD_SHARED=OFF".to_owned(),
        ];

        if let Some((arch, triple)) = target.macos_arch() {
            let sysroot = self.capture(
                "xcrun",
                self.env
                    .command("xcrun")?
                    .args(["--sdk", "macosx", "--show-sdk-path"]),
            )?;
            args.extend([
                format!("-DCMAKE_SYSTEM_PROCESSOR={arch}"),
                format!("-DCMAKE_OSX_ARCHITECTURES={arch}"),
                format!("-DCMAKE_C_COMPILER_TARGET={triple}"),
                format!("-DCMAKE_CXX_COMPILER_TARGET={triple}"),
                format!("-DCMAKE_OBJCXX_COMPILER_TARGET={triple}"),
                format!("-DCMAKE_SYSROOT={sysroot}"),
            ]);
        }

        match target {
            Target::Ios => {
                let toolchain = layout.msquic_source().join("cmake/toolchains/ios.cmake");
                args.extend([
                    "-G".to_owned(),
                    "Xcode".to_owned(),
                    format!("-DCMAKE_TOOLCHAIN_FILE={}", cmake_path(toolchain.as_str())),
                    format!("-DDEPLOYMENT_TARGET={IOS_DEPLOYMENT_TARGET}"),
                    "-DENABLE_ARC=0".to_owned(),
                    format!("-DCMAKE_OSX_DEPLOYMENT_TARGET={IOS_DEPLOYMENT_TARGET}"),
                    // frame.c narrows QUIC_VAR_INT into an enum
                    "-DCMAKE_C_FLAGS=-Wno-shorten-64-to-32".to_owned(),
                ]);
            }
            Target::Android => {
                let ndk = layout.android_ndk_root();
                let toolchain = ndk.join("build/cmake/android.toolchain.cmake");
                args.extend([
                    "-DANDROID_ABI=arm64-v8a".to_owned(),
                    "-DANDROID_PLATFORM=android-29".to_owned(),
                    format!("-DANDROID_NDK={}", cmake_path(ndk.as_str())),
                    format!("-DCMAKE_TOOLCHAIN_FILE={}", cmake_path(toolchain.as_str())),
                ]);
            }
            _ => {}
        }

        Ok(args)
    }

    /// Builds the simulator and device slices and merges them.
    fn build_ios_slices(&self, build_dir: &Utf8Path, args: &mut Vec<String>) -> Result<Utf8PathBuf> {
        let configuration = self.settings.configuration.cmake_name();
        let library = self.settings.target.library_name();
        let mut slices = Vec::with_capacity(2);

        for (arch, platform) in [("x86_64", "SIMULATOR64"), ("arm64", "OS64")] {
            let slice_dir = build_dir.join(arch);
            make_dir_all(&slice_dir)?;
            args.push(format!("-DPLATFORM={platform}"));
            self.cmake_configure(&slice_dir, args)?;
            args.pop();
            self.cmake_build(&slice_dir)?;
            slices.push(slice_dir.join("bin").join(configuration).join(library));
        }

        // Installs headers; the library is replaced by the merged one below.
        let device_dir = build_dir.join("arm64");
        self.run("cmake install", self.cmake(&device_dir)?.args(["--install", "."]))?;

        let merged = build_dir.join(library);
        self.run(
            "lipo",
            self.env
                .command("lipo")?
                .args(["-create", "-output", merged.as_str()])
                .args(slices.iter().map(|slice| slice.as_str()))
                .current_dir(build_dir),
        )?;
        Ok(merged)
    }

    fn cmake_configure(&self, dir: &Utf8Path, args: &[String]) -> Result<()> {
        let source = self.settings.layout.msquic_source();
        self.run(
            "cmake configure",
            self.cmake(dir)?.arg(source.as_str()).args(args.iter().cloned()),
        )
    }

    fn cmake_build(&self, dir: &Utf8Path) -> Result<()> {
        self.run(
            "cmake build",
            self.cmake(dir)?.args([
                "--build".to_owned(),
                ".".to_owned(),
                "--target".to_owned(),
                MSQUIC_TARGET.to_owned(),
                format!("-j{}", self.settings.jobs),
                "--config".to_owned(),
                self.settings.configuration.cmake_name().to_owned(),
            ]),
        )
    }

    fn cmake(&self, dir: &Utf8Path) -> Result<CommandSpec> {
        Ok(self.env.command("cmake")?.current_dir(dir))
    }

    fn run(&self, step: &'static str, spec: CommandSpec) -> Result<()> {
        self.executor.run(&spec).map_err(InstallerError::tool(step))
    }

    fn capture(&self, step: &'static str, spec: CommandSpec) -> Result<String> {
        self.executor.capture(&spec).map_err(InstallerError::tool(step))
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
