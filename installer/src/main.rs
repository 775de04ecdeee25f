//! msquic builder CLI entrypoint.
//!
//! Parses the command line, installs the log subscriber, and runs the build
//! pipeline against the real process runner and HTTP client.

use clap::Parser;
use pinbuild::SystemCommandExecutor;
use pinbuild_installer::cli::Cli;
use pinbuild_installer::download::HttpDownloader;
use pinbuild_installer::error::{InstallerError, Result};
use pinbuild_installer::pipeline::{self, BuildReport, Services};
use pinbuild_installer::toolchain::BuildEnv;
use std::error::Error as _;
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_filter());

    let mut stderr = std::io::stderr();
    let exit_code = exit_code_for_run_result(run(&cli), &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Logs to stderr; `RUST_LOG` overrides the verbosity flags.
fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<BuildReport> {
    let request = cli.build_request();
    let executor = SystemCommandExecutor;
    let report = pipeline::run(
        &request,
        Services {
            executor: &executor,
            downloader: &HttpDownloader,
            base_env: BuildEnv::from_process(),
        },
    )?;
    if let Some(package) = &report.package {
        log::info!("Package written to {}", package.archive);
    }
    Ok(report)
}

/// Prints the error chain and picks the exit code.
///
/// Configuration mistakes exit with 2, everything else with 1.
fn exit_code_for_run_result<T>(result: Result<T>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            write_error_chain(stderr, &err);
            if err.is_configuration() { 2 } else { 1 }
        }
    }
}

fn write_error_chain(stderr: &mut dyn Write, err: &InstallerError) {
    let mut message = format!("error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; nothing left to tell.
    }
}
