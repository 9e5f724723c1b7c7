//! # gobuild - Build orchestration for Go source trees
//!
//! gobuild drives the external `go` tool to build, build tests, or run tests
//! for a project, then turns the tool's textual output into diagnostics
//! anchored to source locations.
//!
//! ## Flow
//!
//! 1. Pick a [`build::BuildType`] for a [`build::BuildTarget`]
//! 2. [`build::PackageSpecResolver`] works out the package spec and source root
//! 3. [`build::CommandLineBuilder`] assembles the invocation
//! 4. [`build::BuildExecutor`] runs it, interruptible via a cancellation token
//! 5. [`diagnostics::parse_output`] extracts diagnostics
//! 6. A [`diagnostics::markers::MarkerSink`] receives them
//!
//! ## Module Organization
//!
//! - [`build`] - Build types, spec resolution, command lines, process execution
//! - [`diagnostics`] - Output parsing and marker publishing
//! - [`toolchain`] - GOROOT / GOPATH / GOBIN environment
//! - [`config`] - Configuration parsing (`gob.toml`)

/// Build types, spec resolution and target execution.
pub mod build;

/// Configuration file parsing (`gob.toml`).
pub mod config;

/// Diagnostics extracted from tool output.
pub mod diagnostics;

/// Error taxonomy.
pub mod error;

/// Side-channel notifications.
pub mod notify;

/// Go toolchain environment.
pub mod toolchain;

/// Terminal UI utilities (tables).
pub mod ui;

pub use error::{BuildError, Result};
