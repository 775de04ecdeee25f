//! End-to-end runs of the build pipeline with a scripted world.
//!
//! Git and CMake are replaced by an executor that records every command and
//! plants the files the real tools would leave behind; downloads are served
//! from archives built on the fly.

use camino::{Utf8Path, Utf8PathBuf};
use pinbuild::test_utils::{TestEntry, write_tar_gz, write_zip};
use pinbuild::{ArchiveFormat, CommandExecutor, CommandSpec, ProcessError};
use pinbuild_common::{PATH_VAR, SearchPath};
use pinbuild_installer::download::{DownloadError, Downloader};
use pinbuild_installer::error::InstallerError;
use pinbuild_installer::pipeline::{BuildRequest, Services, run};
use pinbuild_installer::target::{Configuration, Target};
use pinbuild_installer::toolchain::{ANDROID_NDK_HOME, BuildEnv};
use rstest::{fixture, rstest};
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs;
use tempfile::TempDir;

const VERSIONS: &str = "\
# pinned inputs
CMAKE_VERSION=3.28.1
MSQUIC_VERSION=v2.2.4
ANDROID_NDK_VERSION=r26b
";

/// Records commands and fakes their side effects.
#[derive(Default)]
struct FakeTools {
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeTools {
    fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    fn calls_to(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|spec| spec.program() == program)
            .count()
    }

    fn plant(path: &Utf8Path, content: &[u8]) {
        fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        fs::write(path, content).expect("plant file");
    }
}

impl CommandExecutor for FakeTools {
    fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
        self.calls.borrow_mut().push(spec.clone());
        let dir = spec.working_dir().expect("commands run in a directory");
        let args = spec.arguments();
        match (spec.program(), args.first().map(String::as_str)) {
            ("git", Some("reset")) => Self::plant(&dir.join("LICENSE"), b"MIT License"),
            ("cmake", Some("--build")) => {
                let configuration = args.last().expect("--config value");
                Self::plant(
                    &dir.join("bin").join(configuration).join("libmsquic.a"),
                    b"static lib",
                );
            }
            _ => {}
        }
        Ok(())
    }

    fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
        self.calls.borrow_mut().push(spec.clone());
        Ok(String::new())
    }
}

/// Serves toolchain archives and counts requests.
#[derive(Default)]
struct FakeReleases {
    urls: RefCell<Vec<String>>,
}

impl Downloader for FakeReleases {
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError> {
        self.urls.borrow_mut().push(url.to_owned());
        if url.ends_with(".zip") {
            write_zip(
                dest,
                &[
                    TestEntry::Dir("android-ndk-r26b/"),
                    TestEntry::File("android-ndk-r26b/source.properties", b"Pkg.Revision = 26.1", 0o644),
                ],
            )
            .expect("write ndk archive");
        } else {
            write_tar_gz(
                dest,
                &[TestEntry::File(
                    "cmake-3.28.1-linux-x86_64/bin/cmake",
                    b"#!/bin/sh\n",
                    0o755,
                )],
            )
            .expect("write cmake archive");
        }
        Ok(())
    }
}

struct World {
    _temp: TempDir,
    base: Utf8PathBuf,
    tools: FakeTools,
    releases: FakeReleases,
}

impl World {
    fn request(&self, target: Target, package: bool) -> BuildRequest {
        BuildRequest {
            target,
            configuration: Configuration::Release,
            base_dir: self.base.clone(),
            config_path: None,
            package,
            force_toolchains: false,
            jobs: 2,
        }
    }

    fn services(&self) -> Services<'_> {
        Services {
            executor: &self.tools,
            downloader: &self.releases,
            base_env: BuildEnv::with_search_path(SearchPath::parse(OsStr::new("/usr/bin"))),
        }
    }
}

#[fixture]
fn world() -> World {
    let temp = tempfile::tempdir().expect("temp dir");
    let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
    fs::write(base.join("VERSION"), VERSIONS).expect("write VERSION");
    World {
        _temp: temp,
        base,
        tools: FakeTools::default(),
        releases: FakeReleases::default(),
    }
}

#[rstest]
fn linux_build_installs_cmake_builds_and_packages(world: World) {
    let report = run(&world.request(Target::Ubuntu2004X86_64, true), world.services())
        .expect("pipeline run");

    let install = world.base.join("_install/ubuntu-20.04_x86_64/release");
    assert_eq!(report.library, install.join("msquic/lib/libmsquic.a"));
    assert!(install.join("cmake/bin/cmake").is_file());
    assert_eq!(
        fs::read_to_string(install.join("cmake.version")).expect("cmake marker"),
        "3.28.1"
    );
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].commit, "v2.2.4");
    assert_eq!(
        report.sources[0].url,
        "https://github.com/microsoft/msquic.git"
    );

    let package = report.package.expect("package requested");
    assert_eq!(package.format, ArchiveFormat::TarGz);
    assert_eq!(
        package.archive,
        world
            .base
            .join("_package/ubuntu-20.04_x86_64/release/msquic-v2.2.4_ubuntu-20.04_x86_64.tar.gz")
    );
    assert!(
        fs::read_to_string(&package.env_file)
            .expect("env file")
            .contains("PACKAGE_NAME=msquic-v2.2.4_ubuntu-20.04_x86_64.tar.gz")
    );

    let cmake_bin = std::path::PathBuf::from(install.join("cmake/bin").as_str());
    let cmake_calls: Vec<_> = world
        .tools
        .calls()
        .into_iter()
        .filter(|spec| spec.program() == "cmake")
        .collect();
    assert_eq!(cmake_calls.len(), 3);
    for spec in cmake_calls {
        let path = spec.env_value(PATH_VAR).expect("PATH override");
        assert_eq!(std::env::split_paths(path).next(), Some(cmake_bin.clone()));
    }
}

#[rstest]
fn rerun_reuses_the_installed_toolchain(world: World) {
    run(&world.request(Target::Ubuntu2004X86_64, false), world.services()).expect("first run");
    run(&world.request(Target::Ubuntu2004X86_64, false), world.services()).expect("second run");

    assert_eq!(world.releases.urls.borrow().len(), 1);
    assert_eq!(world.tools.calls_to("cmake"), 6);
    assert_eq!(world.tools.calls_to("git"), 10);
}

#[rstest]
fn android_build_installs_the_ndk_and_exports_its_root(world: World) {
    let report = run(&world.request(Target::Android, false), world.services()).expect("pipeline run");

    let install = world.base.join("_install/android/release");
    assert!(report.package.is_none());
    assert!(install.join("android-ndk/source.properties").is_file());
    let urls = world.releases.urls.borrow();
    assert_eq!(urls.len(), 2);
    assert!(urls[1].ends_with("android-ndk-r26b-linux.zip"));

    let configure = world
        .tools
        .calls()
        .into_iter()
        .find(|spec| spec.program() == "cmake")
        .expect("cmake configure");
    let ndk_home = install.join("android-ndk");
    assert_eq!(
        configure.env_value(ANDROID_NDK_HOME),
        Some(OsStr::new(ndk_home.as_str()))
    );
    assert!(
        configure
            .arguments()
            .contains(&"-DANDROID_ABI=arm64-v8a".to_owned())
    );
}

#[rstest]
fn missing_version_key_stops_before_any_work(world: World) {
    fs::write(world.base.join("VERSION"), "CMAKE_VERSION=3.28.1\n").expect("rewrite VERSION");

    let err = run(&world.request(Target::Ubuntu2004X86_64, false), world.services())
        .expect_err("MSQUIC_VERSION missing");

    assert!(err.is_configuration());
    assert!(matches!(err, InstallerError::Versions(_)));
    assert!(world.tools.calls().is_empty());
    assert!(world.releases.urls.borrow().is_empty());
    assert!(!world.base.join("_install").exists());
}

#[rstest]
fn mirror_configuration_redirects_downloads(world: World) {
    fs::write(
        world.base.join("pinbuild.toml"),
        "cmake_download_base = \"https://mirror.example.com/cmake\"\n",
    )
    .expect("write config");

    run(&world.request(Target::Ubuntu2004X86_64, false), world.services()).expect("pipeline run");

    let urls = world.releases.urls.borrow();
    assert!(urls[0].starts_with("https://mirror.example.com/cmake/"));
}
