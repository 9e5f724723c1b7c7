//! Error types for build orchestration.
//!
//! Configuration errors are raised before any process is spawned; launch
//! errors mean the tool could not be started at all. Neither is ever folded
//! into a "successful run with zero diagnostics".

use std::path::PathBuf;
use thiserror::Error;

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while resolving, launching or capturing a build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The go tool path preference is empty.
    #[error("Go tool path not configured. Set [tool].path in gob.toml, pass --tool, or export GOB_TOOL")]
    ToolPathNotConfigured,

    /// A package name or package spec failed validation.
    #[error("Invalid package spec '{spec}': {reason}")]
    InvalidPackageSpec { spec: String, reason: String },

    /// The options string could not be split into arguments.
    #[error("Invalid build options (unbalanced quotes?): {0}")]
    InvalidBuildOptions(String),

    /// No build type is registered under this name.
    #[error("Unknown build type: {0}")]
    UnknownBuildType(String),

    /// The target name is neither configured nor parseable as `<type>[:<spec>]`.
    #[error("Unknown build target: {0}")]
    UnknownTarget(String),

    /// Stray Go files in the source root, escalated by `strict_layout`.
    #[error("Source root {0} contains Go files outside of any package")]
    LayoutViolation(PathBuf),

    /// The toolchain environment could not be resolved for the project.
    #[error("Toolchain environment error: {0}")]
    Environment(String),

    /// The tool binary could not be spawned.
    #[error("Failed to launch '{program}': {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Capturing output or waiting on the child failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    pub(crate) fn invalid_spec(spec: &str, reason: impl Into<String>) -> Self {
        BuildError::InvalidPackageSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    /// Fatal, non-retryable until the caller fixes its configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BuildError::ToolPathNotConfigured
                | BuildError::InvalidPackageSpec { .. }
                | BuildError::InvalidBuildOptions(_)
                | BuildError::UnknownBuildType(_)
                | BuildError::UnknownTarget(_)
                | BuildError::LayoutViolation(_)
                | BuildError::Environment(_)
        )
    }

    /// The tool could not be run at all.
    pub fn is_launch(&self) -> bool {
        matches!(self, BuildError::LaunchFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(BuildError::ToolPathNotConfigured.is_configuration());
        assert!(BuildError::invalid_spec("a b", "contains whitespace").is_configuration());
        assert!(!BuildError::ToolPathNotConfigured.is_launch());

        let launch = BuildError::LaunchFailed {
            program: "go".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(launch.is_launch());
        assert!(!launch.is_configuration());
    }

    #[test]
    fn test_messages() {
        let err = BuildError::invalid_spec("", "package spec is empty");
        assert_eq!(err.to_string(), "Invalid package spec '': package spec is empty");
    }
}
