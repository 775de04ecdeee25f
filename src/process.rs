//! Subprocess execution seam.
//!
//! Every external tool (git, cmake, xcrun, lipo) is launched through
//! [`CommandExecutor`] with an explicit working directory and environment
//! overrides carried by [`CommandSpec`]. Nothing here changes the working
//! directory or environment of the current process.

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use pinbuild_common::PATH_VAR;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// A fully described subprocess invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
    envs: Vec<(String, OsString)>,
}

impl CommandSpec {
    /// Starts a spec for `program` with no arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinbuild::CommandSpec;
    ///
    /// let spec = CommandSpec::new("git")
    ///     .args(["fetch", "--depth=1", "origin"])
    ///     .current_dir("checkout");
    /// assert_eq!(spec.to_string(), "git fetch --depth=1 origin");
    /// assert_eq!(spec.working_dir().map(|d| d.as_str()), Some("checkout"));
    /// ```
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Runs the command inside `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Sets an environment variable for the child only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// The program name as given.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The working directory, when one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.current_dir.as_deref()
    }

    /// The environment overrides in insertion order.
    #[must_use]
    pub fn env_overrides(&self) -> &[(String, OsString)] {
        &self.envs
    }

    /// The last override for `key`, if any.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_os_str())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Errors raised while launching or waiting for a subprocess.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be found on the search path.
    #[error("`{program}` was not found on PATH")]
    NotFound {
        /// Program that was looked up.
        program: String,
        /// Lookup failure.
        #[source]
        source: which::Error,
    },

    /// The process could not be spawned or waited on.
    #[error("failed to run `{command}`")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The process ran but exited unsuccessfully.
    #[error("`{command}` failed with {status}: {stderr}")]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error, or a pointer to the streamed output.
        stderr: String,
    },

    /// Captured standard output was not valid UTF-8.
    #[error("`{command}` produced non-UTF-8 output")]
    NonUtf8Output {
        /// Rendered command line.
        command: String,
    },
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs the command with inherited standard streams and fails on a
    /// non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the program is missing, cannot be
    /// spawned, or exits unsuccessfully.
    fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError>;

    /// Runs the command capturing its output and returns trimmed stdout.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when the program is missing, cannot be
    /// spawned, exits unsuccessfully, or prints non-UTF-8 output.
    fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
        debug!("+{spec} (cwd: {})", describe_dir(spec));
        let status = build_command(spec)?
            .status()
            .map_err(|source| ProcessError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(ProcessError::Failed {
                command: spec.to_string(),
                status,
                stderr: "see output above".to_owned(),
            });
        }
        Ok(())
    }

    fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
        debug!("+{spec} (cwd: {}, captured)", describe_dir(spec));
        let output = build_command(spec)?
            .output()
            .map_err(|source| ProcessError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessError::Failed {
                command: spec.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| ProcessError::NonUtf8Output {
            command: spec.to_string(),
        })?;
        Ok(stdout.trim().to_owned())
    }
}

fn describe_dir(spec: &CommandSpec) -> &str {
    spec.working_dir().map_or(".", Utf8Path::as_str)
}

/// Resolves the program against the child's search path and applies the
/// working directory and environment overrides.
fn build_command(spec: &CommandSpec) -> Result<Command, ProcessError> {
    let program = resolve_program(spec)?;
    let mut cmd = Command::new(program);
    cmd.args(spec.arguments());
    if let Some(dir) = spec.working_dir() {
        cmd.current_dir(dir.as_std_path());
    }
    for (key, value) in spec.env_overrides() {
        cmd.env(key, value);
    }
    Ok(cmd)
}

fn resolve_program(spec: &CommandSpec) -> Result<PathBuf, ProcessError> {
    let search_path = spec
        .env_value(PATH_VAR)
        .map(OsStr::to_os_string)
        .or_else(|| env::var_os(PATH_VAR));
    let cwd = match spec.working_dir() {
        Some(dir) => dir.as_std_path().to_path_buf(),
        None => env::current_dir().map_err(|source| ProcessError::Spawn {
            command: spec.to_string(),
            source,
        })?,
    };

    which::which_in(spec.program(), search_path, cwd).map_err(|source| ProcessError::NotFound {
        program: spec.program().to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn display_joins_program_and_arguments() {
        let spec = CommandSpec::new("cmake").args(["--build", "."]).arg("-j4");

        assert_eq!(spec.to_string(), "cmake --build . -j4");
    }

    #[rstest]
    fn env_value_returns_the_last_override() {
        let spec = CommandSpec::new("cmake")
            .env("PATH", "/first")
            .env("PATH", "/second");

        assert_eq!(spec.env_value("PATH"), Some(OsStr::new("/second")));
        assert_eq!(spec.env_value("HOME"), None);
    }

    #[rstest]
    fn missing_program_is_reported_as_not_found() {
        let spec = CommandSpec::new("pinbuild-definitely-missing-tool").env("PATH", "");

        let result = SystemCommandExecutor.run(&spec);

        assert!(matches!(result, Err(ProcessError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[rstest]
    fn capture_trims_stdout_and_honours_working_dir() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
        std::fs::write(dir.join("marker.txt"), b"x").expect("write marker");

        let listing = SystemCommandExecutor
            .capture(&CommandSpec::new("ls").current_dir(dir.clone()))
            .expect("ls succeeds");

        assert_eq!(listing, "marker.txt");
    }

    #[cfg(unix)]
    #[rstest]
    fn non_zero_exit_is_a_failure() {
        let result = SystemCommandExecutor.capture(&CommandSpec::new("false"));

        assert!(matches!(result, Err(ProcessError::Failed { .. })));
    }
}
