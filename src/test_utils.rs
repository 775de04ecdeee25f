//! Shared test utilities: a scripted command executor and archive builders.

use crate::process::{CommandExecutor, CommandSpec, ProcessError};
use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::process::ExitStatus;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Builds the error a failing command reports.
#[must_use]
pub fn failure(command: &str, code: i32, stderr: &str) -> ProcessError {
    ProcessError::Failed {
        command: command.to_owned(),
        status: exit_status(code),
        stderr: stderr.to_owned(),
    }
}

/// An expected command invocation and its scripted result.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program (e.g. `git`).
    pub program: String,
    /// The arguments in order.
    pub args: Vec<String>,
    /// The working directory the call must use, when checked.
    pub dir: Option<Utf8PathBuf>,
    /// Captured stdout on success, or the failure to report.
    pub result: Result<String, ProcessError>,
}

impl ExpectedCall {
    /// Expects `program args...` and succeeds with empty output.
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            result: Ok(String::new()),
        }
    }

    /// Also requires the call to run inside `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Succeeds with `stdout` as the captured output.
    #[must_use]
    pub fn returning(mut self, stdout: &str) -> Self {
        self.result = Ok(stdout.to_owned());
        self
    }

    /// Fails with exit code 1.
    #[must_use]
    pub fn failing(mut self, stderr: &str) -> Self {
        let command = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.result = Err(failure(&command, 1, stderr));
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Matches invocations against a queue of expected calls and returns their
/// scripted results. Every spec it receives is recorded for later
/// inspection of environment overrides.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    seen: RefCell<Vec<CommandSpec>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            seen: RefCell::default(),
        }
    }

    /// The specs received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.seen.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} left: {:?}",
            remaining.len(),
            remaining.front().map(|call| &call.args)
        );
    }

    fn next(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
        self.seen.borrow_mut().push(spec.clone());
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command invocation: {spec}"));

        assert_eq!(call.program, spec.program(), "program of `{spec}`");
        assert_eq!(call.args.as_slice(), spec.arguments(), "arguments of `{spec}`");
        if let Some(dir) = &call.dir {
            assert_eq!(Some(dir.as_path()), spec.working_dir(), "working dir of `{spec}`");
        }
        call.result
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, spec: &CommandSpec) -> Result<(), ProcessError> {
        self.next(spec).map(drop)
    }

    fn capture(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
        self.next(spec)
    }
}

/// An entry to place in a test archive.
#[derive(Clone, Debug)]
pub enum TestEntry {
    /// A directory.
    Dir(&'static str),
    /// A regular file with content and permission bits.
    File(&'static str, &'static [u8], u32),
    /// A symbolic link and its target.
    Symlink(&'static str, &'static str),
}

/// Writes a gzip-compressed tarball containing `entries` in order.
///
/// # Errors
///
/// Returns any I/O error from writing the archive.
pub fn write_tar_gz(path: &Utf8Path, entries: &[TestEntry]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match *entry {
            TestEntry::Dir(name) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder.append_data(&mut header, name, io::empty())?;
            }
            TestEntry::File(name, content, mode) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(mode);
                header.set_size(content.len() as u64);
                builder.append_data(&mut header, name, content)?;
            }
            TestEntry::Symlink(name, target) => {
                header.set_entry_type(tar::EntryType::Symlink);
                header.set_mode(0o777);
                header.set_size(0);
                builder.append_link(&mut header, name, target)?;
            }
        }
    }

    builder.into_inner()?.finish()?.flush()
}

/// Writes a zip file containing `entries` in order, recording Unix modes.
///
/// # Errors
///
/// Returns any I/O or encoder error from writing the archive.
pub fn write_zip(path: &Utf8Path, entries: &[TestEntry]) -> zip::result::ZipResult<()> {
    let file = File::create(path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for entry in entries {
        match *entry {
            TestEntry::Dir(name) => writer.add_directory(name, options)?,
            TestEntry::File(name, content, mode) => {
                writer.start_file(name, options.unix_permissions(mode))?;
                writer.write_all(content)?;
            }
            TestEntry::Symlink(name, target) => writer.add_symlink(name, target, options)?,
        }
    }

    writer.finish().map(drop)
}
