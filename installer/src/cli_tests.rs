//! Tests for CLI parsing and the derived build request.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["pinbuild", "ubuntu-20.04_x86_64"]);
    assert_eq!(cli.target, Target::Ubuntu2004X86_64);
    assert!(!cli.debug);
    assert!(!cli.relwithdebinfo);
    assert!(!cli.package);
    assert!(!cli.force_toolchains);
    assert_eq!(cli.base_dir, Utf8PathBuf::from("."));
    assert!(cli.config.is_none());
    assert!(cli.jobs.is_none());
    assert_eq!(cli.verbosity, 0);
}

#[test]
fn cli_requires_a_target() {
    assert!(Cli::try_parse_from(["pinbuild"]).is_err());
}

#[test]
fn cli_rejects_unknown_targets() {
    assert!(Cli::try_parse_from(["pinbuild", "freebsd"]).is_err());
}

#[rstest]
#[case(&[], Configuration::Release)]
#[case(&["--debug"], Configuration::Debug)]
#[case(&["--relwithdebinfo"], Configuration::RelWithDebInfo)]
#[case(&["--debug", "--relwithdebinfo"], Configuration::RelWithDebInfo)]
fn configuration_follows_flags(#[case] flags: &[&str], #[case] expected: Configuration) {
    let cli = Cli::parse_from(["pinbuild", "android"].iter().chain(flags));
    assert_eq!(cli.build_request().configuration, expected);
}

#[test]
fn build_request_carries_paths_and_switches() {
    let cli = Cli::parse_from([
        "pinbuild",
        "windows_x86_64",
        "--package",
        "--force-toolchains",
        "--base-dir",
        "/work",
        "--config",
        "/etc/pinbuild.toml",
        "--jobs",
        "8",
    ]);

    let request = cli.build_request();

    assert_eq!(
        request,
        BuildRequest {
            target: Target::WindowsX86_64,
            configuration: Configuration::Release,
            base_dir: Utf8PathBuf::from("/work"),
            config_path: Some(Utf8PathBuf::from("/etc/pinbuild.toml")),
            package: true,
            force_toolchains: true,
            jobs: 8,
        }
    );
}

#[rstest]
#[case(None)]
#[case(Some("0"))]
fn jobs_default_to_the_cpu_count(#[case] jobs: Option<&str>) {
    let mut args = vec!["pinbuild", "macos_arm64"];
    if let Some(jobs) = jobs {
        args.extend(["-j", jobs]);
    }
    let cli = Cli::parse_from(args);
    assert_eq!(cli.build_request().jobs, num_cpus::get());
}

#[rstest]
#[case(&[], "info")]
#[case(&["-v"], "debug")]
#[case(&["-vv"], "trace")]
#[case(&["-v", "-v", "-v"], "trace")]
fn verbosity_selects_the_log_filter(#[case] flags: &[&str], #[case] expected: &str) {
    let cli = Cli::parse_from(["pinbuild", "ios"].iter().chain(flags));
    assert_eq!(cli.log_filter(), expected);
}
