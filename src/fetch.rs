//! Shallow single-commit git checkouts.
//!
//! A pinned source is materialized without history: the target directory is
//! recreated, one commit is fetched at depth one and checked out, and then
//! each direct submodule is fetched the same way at the commit the parent
//! records for it. Nested submodules are not followed.

use crate::process::{CommandExecutor, CommandSpec, ProcessError};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use pinbuild_common::{FsError, make_dir_all, remove_all};
use std::collections::BTreeMap;
use thiserror::Error;

/// A repository pinned to one commit and the directory it lands in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinnedRevision {
    /// Remote URL.
    pub url: String,
    /// Commit SHA (or any ref the remote allows fetching directly).
    pub commit: String,
    /// Checkout directory.
    pub dir: Utf8PathBuf,
}

/// One line of `git submodule status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmoduleEntry {
    /// Commit recorded by the parent repository.
    pub commit: String,
    /// Path relative to the parent checkout.
    pub path: String,
}

/// Errors raised while materializing a checkout.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The checkout directory could not be recreated.
    #[error(transparent)]
    Fs(#[from] FsError),

    /// A git command failed.
    #[error("git {operation} failed in {dir}")]
    Git {
        /// The git subcommand.
        operation: &'static str,
        /// Working directory of the failed command.
        dir: Utf8PathBuf,
        /// Underlying process failure.
        #[source]
        source: ProcessError,
    },

    /// `git submodule status` printed a line that could not be parsed.
    #[error("unexpected `git submodule status` line: {line:?}")]
    MalformedSubmoduleStatus {
        /// The offending line.
        line: String,
    },

    /// `.gitmodules` has no URL for a submodule.
    #[error("no URL configured for submodule {path}")]
    MissingSubmoduleUrl {
        /// Submodule path.
        path: String,
    },
}

/// Materializes pinned git sources through a [`CommandExecutor`].
#[derive(Clone, Copy)]
pub struct ShallowFetcher<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> ShallowFetcher<'a> {
    /// Creates a fetcher that runs git through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    /// Replaces `dir` with a history-less checkout of `commit` from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Fs`] when `dir` cannot be recreated and
    /// [`FetchError::Git`] when any git step fails. A failure leaves `dir`
    /// partially populated.
    pub fn shallow_clone(&self, url: &str, commit: &str, dir: &Utf8Path) -> Result<(), FetchError> {
        info!("Fetching {url} at {commit} into {dir}");
        remove_all(dir)?;
        make_dir_all(dir)?;

        self.git(dir, "init", &["init"])?;
        self.git(dir, "remote add", &["remote", "add", "origin", url])?;
        self.git(dir, "fetch", &["fetch", "--depth=1", "origin", commit])?;
        self.git(dir, "reset", &["reset", "--hard", "FETCH_HEAD"])?;
        Ok(())
    }

    /// Shallow-clones `url` at `commit` and then each direct submodule at the
    /// commit the parent pins.
    ///
    /// Returns every revision materialized, parent first.
    ///
    /// # Errors
    ///
    /// Returns the first failure; remaining submodules are not attempted.
    pub fn materialize_with_submodules(
        &self,
        url: &str,
        commit: &str,
        dir: &Utf8Path,
    ) -> Result<Vec<PinnedRevision>, FetchError> {
        self.shallow_clone(url, commit, dir)?;
        let mut fetched = vec![PinnedRevision {
            url: url.to_owned(),
            commit: commit.to_owned(),
            dir: dir.to_owned(),
        }];

        let status = self.capture(dir, "submodule status", &["submodule", "status"])?;
        let submodules = parse_submodule_status(&status)?;
        if submodules.is_empty() {
            return Ok(fetched);
        }

        let names = self.submodule_names(dir)?;
        for submodule in submodules {
            let name = names
                .get(&submodule.path)
                .map_or(submodule.path.as_str(), String::as_str);
            let sub_url = self.submodule_url(dir, name, &submodule.path)?;

            let sub_dir = dir.join(&submodule.path);
            self.shallow_clone(&sub_url, &submodule.commit, &sub_dir)?;
            fetched.push(PinnedRevision {
                url: sub_url,
                commit: submodule.commit,
                dir: sub_dir,
            });
        }

        Ok(fetched)
    }

    /// Maps submodule paths to their `.gitmodules` names.
    fn submodule_names(&self, dir: &Utf8Path) -> Result<BTreeMap<String, String>, FetchError> {
        let listing = self.capture(
            dir,
            "config",
            &["config", "-f", ".gitmodules", "--get-regexp", r"^submodule\..*\.path$"],
        )?;
        Ok(parse_submodule_paths(&listing))
    }

    /// Reads `submodule.<name>.url` from `.gitmodules`.
    ///
    /// `git config --get` exits 1 when the key is absent.
    fn submodule_url(&self, dir: &Utf8Path, name: &str, path: &str) -> Result<String, FetchError> {
        let key = format!("submodule.{name}.url");
        let missing = || FetchError::MissingSubmoduleUrl {
            path: path.to_owned(),
        };
        match self
            .executor
            .capture(&git_command(dir, &["config", "-f", ".gitmodules", "--get", &key]))
        {
            Ok(url) if url.is_empty() => Err(missing()),
            Ok(url) => Ok(url),
            Err(ProcessError::Failed { status, .. }) if status.code() == Some(1) => Err(missing()),
            Err(source) => Err(FetchError::Git {
                operation: "config",
                dir: dir.to_owned(),
                source,
            }),
        }
    }

    fn git(&self, dir: &Utf8Path, operation: &'static str, args: &[&str]) -> Result<(), FetchError> {
        self.executor
            .run(&git_command(dir, args))
            .map_err(|source| FetchError::Git {
                operation,
                dir: dir.to_owned(),
                source,
            })
    }

    fn capture(&self, dir: &Utf8Path, operation: &'static str, args: &[&str]) -> Result<String, FetchError> {
        self.executor
            .capture(&git_command(dir, args))
            .map_err(|source| FetchError::Git {
                operation,
                dir: dir.to_owned(),
                source,
            })
    }
}

fn git_command(dir: &Utf8Path, args: &[&str]) -> CommandSpec {
    CommandSpec::new("git").args(args.iter().copied()).current_dir(dir)
}

/// Parses `git submodule status` output.
///
/// Each line is a state flag (` `, `-`, `+` or `U`), the recorded commit,
/// the path, and an optional parenthesised description.
///
/// # Errors
///
/// Returns [`FetchError::MalformedSubmoduleStatus`] for lines without a
/// commit and a path.
///
/// # Examples
///
/// ```
/// use pinbuild::fetch::parse_submodule_status;
///
/// let entries = parse_submodule_status(
///     "-0a1b2c3d submodules/openssl\n+4e5f6a7b submodules/clog (v1.0)",
/// )?;
/// assert_eq!(entries[0].path, "submodules/openssl");
/// assert_eq!(entries[1].commit, "4e5f6a7b");
/// # Ok::<(), pinbuild::FetchError>(())
/// ```
pub fn parse_submodule_status(output: &str) -> Result<Vec<SubmoduleEntry>, FetchError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let body = line.trim_start_matches([' ', '-', '+', 'U']);
            let mut fields = body.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(commit), Some(path)) => Ok(SubmoduleEntry {
                    commit: commit.to_owned(),
                    path: path.to_owned(),
                }),
                _ => Err(FetchError::MalformedSubmoduleStatus {
                    line: line.to_owned(),
                }),
            }
        })
        .collect()
}

/// Parses `submodule.<name>.path <path>` lines into a path-to-name map.
fn parse_submodule_paths(listing: &str) -> BTreeMap<String, String> {
    listing
        .lines()
        .filter_map(|line| {
            let (key, path) = line.split_once(' ')?;
            let name = key.strip_prefix("submodule.")?.strip_suffix(".path")?;
            Some((path.trim().to_owned(), name.to_owned()))
        })
        .collect()
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
