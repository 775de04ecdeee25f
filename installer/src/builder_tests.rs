//! Unit tests for the msquic CMake build.

use super::*;
use pinbuild::test_utils::{ExpectedCall, StubExecutor};
use pinbuild_common::{PATH_VAR, SearchPath};
use rstest::{fixture, rstest};
use std::ffi::OsStr;
use tempfile::TempDir;

struct Work {
    _temp: TempDir,
    base: Utf8PathBuf,
}

impl Work {
    fn layout(&self, target: Target, configuration: Configuration) -> Layout {
        let layout = Layout::new(&self.base, target, configuration);
        layout.create().expect("create layout");
        layout
    }
}

#[fixture]
fn work() -> Work {
    let temp = tempfile::tempdir().expect("temp dir");
    let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
    Work { _temp: temp, base }
}

fn env() -> BuildEnv {
    let mut env = BuildEnv::with_search_path(SearchPath::parse(OsStr::new("/usr/bin")));
    env.prepend_path(Utf8Path::new("/toolchain/cmake/bin"));
    env
}

fn settings(target: Target, configuration: Configuration, layout: &Layout) -> BuildSettings<'_> {
    BuildSettings {
        target,
        configuration,
        layout,
        jobs: 4,
    }
}

fn plant(path: &Utf8Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    std::fs::write(path, content).expect("write file");
}

fn configure_call(dir: &Utf8Path, source: &Utf8Path, args: &[String]) -> ExpectedCall {
    ExpectedCall::new(
        "cmake",
        std::iter::once(source.to_string()).chain(args.iter().cloned()),
    )
    .in_dir(dir)
}

fn build_call(dir: &Utf8Path, configuration: &str) -> ExpectedCall {
    ExpectedCall::new(
        "cmake",
        ["--build", ".", "--target", "msquic_lib", "-j4", "--config", configuration],
    )
    .in_dir(dir)
}

#[rstest]
fn linux_build_configures_builds_installs_and_copies(work: Work) {
    let layout = work.layout(Target::Ubuntu2004X86_64, Configuration::Release);
    let env = env();
    let build_dir = layout.msquic_build();
    let args = MsquicBuilder::new(&StubExecutor::default(), &env, settings(Target::Ubuntu2004X86_64, Configuration::Release, &layout))
        .configure_args()
        .expect("configure args");
    let executor = StubExecutor::new(vec![
        configure_call(&build_dir, &layout.msquic_source(), &args),
        build_call(&build_dir, "Release"),
        ExpectedCall::new("cmake", ["--install", ".", "--config", "Release"]).in_dir(&build_dir),
    ]);
    let builder = MsquicBuilder::new(
        &executor,
        &env,
        settings(Target::Ubuntu2004X86_64, Configuration::Release, &layout),
    );
    builder.reset_build_dir().expect("reset build dir");
    plant(&build_dir.join("bin/Release/libmsquic.a"), b"static lib");

    let installed = builder.build().expect("build");

    executor.assert_finished();
    assert_eq!(installed, layout.msquic_install().join("lib/libmsquic.a"));
    assert_eq!(std::fs::read(&installed).expect("read lib"), b"static lib");
    let calls = executor.calls();
    let path = calls
        .first()
        .and_then(|spec| spec.env_value(PATH_VAR))
        .expect("PATH override");
    assert_eq!(
        std::env::split_paths(path).next(),
        Some(std::path::PathBuf::from("/toolchain/cmake/bin"))
    );
}

#[rstest]
fn configure_args_carry_type_prefix_and_static_switch(work: Work) {
    let layout = work.layout(Target::WindowsX86_64, Configuration::Debug);
    let env = env();

    let args = MsquicBuilder::new(
        &StubExecutor::default(),
        &env,
        settings(Target::WindowsX86_64, Configuration::Debug, &layout),
    )
    .configure_args()
    .expect("configure args");

    assert_eq!(
        args,
        vec![
            "-DCMAKE_BUILD_TYPE=Debug".to_owned(),
            format!("-DCMAKE_INSTALL_PREFIX={}", cmake_path(layout.msquic_install().as_str())),
            "-DQUIC_BUILD_SHARED=OFF".to_owned(),
        ]
    );
}

#[rstest]
fn macos_queries_the_sdk_for_the_sysroot(work: Work) {
    let layout = work.layout(Target::MacosArm64, Configuration::Release);
    let env = env();
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("xcrun", ["--sdk", "macosx", "--show-sdk-path"])
            .returning("/Applications/Xcode.app/SDKs/MacOSX.sdk"),
    ]);

    let args = MsquicBuilder::new(
        &executor,
        &env,
        settings(Target::MacosArm64, Configuration::Release, &layout),
    )
    .configure_args()
    .expect("configure args");

    executor.assert_finished();
    assert!(args.contains(&"-DCMAKE_OSX_ARCHITECTURES=arm64".to_owned()));
    assert!(args.contains(&"-DCMAKE_C_COMPILER_TARGET=aarch64-apple-darwin".to_owned()));
    assert!(args.contains(&"-DCMAKE_SYSROOT=/Applications/Xcode.app/SDKs/MacOSX.sdk".to_owned()));
}

#[rstest]
fn android_points_cmake_at_the_ndk_toolchain(work: Work) {
    let layout = work.layout(Target::Android, Configuration::Release);
    let env = env();

    let args = MsquicBuilder::new(
        &StubExecutor::default(),
        &env,
        settings(Target::Android, Configuration::Release, &layout),
    )
    .configure_args()
    .expect("configure args");

    let ndk = cmake_path(layout.android_ndk_root().as_str());
    assert!(args.contains(&"-DANDROID_ABI=arm64-v8a".to_owned()));
    assert!(args.contains(&"-DANDROID_PLATFORM=android-29".to_owned()));
    assert!(args.contains(&format!("-DANDROID_NDK={ndk}")));
    assert!(args.contains(&format!(
        "-DCMAKE_TOOLCHAIN_FILE={ndk}/build/cmake/android.toolchain.cmake"
    )));
}

#[rstest]
fn ios_builds_two_slices_and_merges_them(work: Work) {
    let layout = work.layout(Target::Ios, Configuration::Release);
    let env = env();
    let build_dir = layout.msquic_build();
    let source = layout.msquic_source();
    let base_args = MsquicBuilder::new(&StubExecutor::default(), &env, settings(Target::Ios, Configuration::Release, &layout))
        .configure_args()
        .expect("configure args");
    let with_platform = |platform: &str| {
        let mut args = base_args.clone();
        args.push(format!("-DPLATFORM={platform}"));
        args
    };
    let simulator = build_dir.join("x86_64");
    let device = build_dir.join("arm64");
    let merged = build_dir.join("libmsquic.a");
    let executor = StubExecutor::new(vec![
        configure_call(&simulator, &source, &with_platform("SIMULATOR64")),
        build_call(&simulator, "Release"),
        configure_call(&device, &source, &with_platform("OS64")),
        build_call(&device, "Release"),
        ExpectedCall::new("cmake", ["--install", "."]).in_dir(&device),
        ExpectedCall::new(
            "lipo",
            [
                "-create".to_owned(),
                "-output".to_owned(),
                merged.to_string(),
                simulator.join("bin/Release/libmsquic.a").to_string(),
                device.join("bin/Release/libmsquic.a").to_string(),
            ],
        )
        .in_dir(&build_dir),
    ]);
    let builder = MsquicBuilder::new(&executor, &env, settings(Target::Ios, Configuration::Release, &layout));
    builder.reset_build_dir().expect("reset build dir");
    plant(&merged, b"fat lib");

    let installed = builder.build().expect("build");

    executor.assert_finished();
    assert_eq!(std::fs::read(installed).expect("read lib"), b"fat lib");
    assert!(base_args.iter().any(|arg| arg.ends_with("cmake/toolchains/ios.cmake")));
}

#[rstest]
fn missing_library_is_a_copy_error(work: Work) {
    let layout = work.layout(Target::Ubuntu2004X86_64, Configuration::Debug);
    let env = env();
    let build_dir = layout.msquic_build();
    let args = MsquicBuilder::new(&StubExecutor::default(), &env, settings(Target::Ubuntu2004X86_64, Configuration::Debug, &layout))
        .configure_args()
        .expect("configure args");
    let executor = StubExecutor::new(vec![
        configure_call(&build_dir, &layout.msquic_source(), &args),
        build_call(&build_dir, "Debug"),
        ExpectedCall::new("cmake", ["--install", ".", "--config", "Debug"]).in_dir(&build_dir),
    ]);
    let builder = MsquicBuilder::new(
        &executor,
        &env,
        settings(Target::Ubuntu2004X86_64, Configuration::Debug, &layout),
    );
    builder.reset_build_dir().expect("reset build dir");

    let err = builder.build().expect_err("no library");

    assert!(matches!(err, InstallerError::Copy { .. }));
}

#[rstest]
fn failing_configure_stops_the_build(work: Work) {
    let layout = work.layout(Target::Ubuntu2004X86_64, Configuration::Release);
    let env = env();
    let build_dir = layout.msquic_build();
    let args = MsquicBuilder::new(&StubExecutor::default(), &env, settings(Target::Ubuntu2004X86_64, Configuration::Release, &layout))
        .configure_args()
        .expect("configure args");
    let executor = StubExecutor::new(vec![
        configure_call(&build_dir, &layout.msquic_source(), &args).failing("CMake Error"),
    ]);

    let err = MsquicBuilder::new(
        &executor,
        &env,
        settings(Target::Ubuntu2004X86_64, Configuration::Release, &layout),
    )
    .build()
    .expect_err("configure fails");

    executor.assert_finished();
    assert!(matches!(
        err,
        InstallerError::Tool {
            step: "cmake configure",
            ..
        }
    ));
}

#[rstest]
fn reset_build_dir_discards_previous_tree(work: Work) {
    let layout = work.layout(Target::Android, Configuration::Release);
    let env = env();
    let stale = layout.msquic_build().join("CMakeCache.txt");
    plant(&stale, b"cache");

    let dir = MsquicBuilder::new(
        &StubExecutor::default(),
        &env,
        settings(Target::Android, Configuration::Release, &layout),
    )
    .reset_build_dir()
    .expect("reset");

    assert!(dir.is_dir());
    assert!(!stale.exists());
}
