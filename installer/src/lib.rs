//! msquic build orchestrator.
//!
//! This crate drives a reproducible build of the msquic static library for
//! one target: it installs the pinned CMake (and Android NDK), fetches msquic
//! with its submodules at the pinned commit, runs the CMake build, and
//! optionally packages the result. It is used by the `pinbuild` binary and
//! can be driven programmatically with substitute executors and downloaders.
//!
//! # Modules
//!
//! - [`builder`] - CMake configure, build and install of msquic
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Optional `pinbuild.toml` with repository and mirror URLs
//! - [`download`] - HTTP downloads of toolchain archives
//! - [`error`] - Aggregated error type for the whole run
//! - [`layout`] - Work directory layout per target and configuration
//! - [`packaging`] - Distributable archives and their metadata file
//! - [`pipeline`] - End-to-end orchestration of one build
//! - [`target`] - Supported targets and build configurations
//! - [`toolchain`] - Version-gated toolchain installs and the child environment

pub mod builder;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod layout;
pub mod packaging;
pub mod pipeline;
pub mod target;
pub mod toolchain;
