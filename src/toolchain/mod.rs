//! Go toolchain environment
//!
//! Answers the questions the build core asks about the toolchain: where the
//! canonical source hierarchy (GOPATH) is, which package owns a directory,
//! where installed binaries land, and which variables the tool process needs.
//! PATH discovery of the `go` binary itself is not done here.

pub mod types;

pub use types::GoEnvironment;

use crate::build::spec::PackageName;
use crate::build::types::Project;
use crate::config::ToolConfig;
use crate::error::{BuildError, Result};
use std::path::{Path, PathBuf};

/// Toolchain queries needed by spec resolution and process launch.
pub trait ToolchainEnvironment {
    /// Whether `location` lies inside the canonical source hierarchy.
    fn is_inside_source_hierarchy(&self, location: &Path) -> bool;

    /// The package that owns `location`, if any.
    fn find_package_for_location(&self, location: &Path) -> Option<PackageName>;

    /// Folder that `go install` writes binaries into for this project.
    fn bin_folder(&self, project: &Project) -> PathBuf;

    /// Variables to set on the tool process.
    fn process_env(&self, project: &Project) -> Result<Vec<(String, String)>>;
}

impl ToolchainEnvironment for GoEnvironment {
    fn is_inside_source_hierarchy(&self, location: &Path) -> bool {
        self.gopath_entry_for(location).is_some()
    }

    fn find_package_for_location(&self, location: &Path) -> Option<PackageName> {
        self.package_at(location)
    }

    fn bin_folder(&self, project: &Project) -> PathBuf {
        if let Some(gobin) = &self.gobin {
            return gobin.clone();
        }
        match self.gopath_entry_for(&project.location) {
            Some(entry) => entry.join("bin"),
            None => project.location.join("bin"),
        }
    }

    fn process_env(&self, project: &Project) -> Result<Vec<(String, String)>> {
        let mut vars = Vec::new();

        if let Some(goroot) = &self.goroot {
            vars.push(("GOROOT".to_string(), goroot.to_string_lossy().to_string()));
        }

        let gopath = std::env::join_paths(self.effective_gopath(project))
            .map_err(|e| BuildError::Environment(format!("invalid GOPATH entry: {}", e)))?;
        vars.push(("GOPATH".to_string(), gopath.to_string_lossy().to_string()));

        if let Some(gobin) = &self.gobin {
            vars.push(("GOBIN".to_string(), gobin.to_string_lossy().to_string()));
        }

        Ok(vars)
    }
}

/// Build the environment from config overrides, then process env, then defaults.
pub fn detect_environment(tool: &ToolConfig) -> GoEnvironment {
    let goroot = tool
        .goroot
        .clone()
        .or_else(|| std::env::var_os("GOROOT").map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty());

    let gopath = if !tool.gopath.is_empty() {
        tool.gopath.clone()
    } else {
        match std::env::var_os("GOPATH") {
            Some(value) if !value.is_empty() => std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
            // Go's own default when GOPATH is unset
            _ => dirs::home_dir()
                .map(|home| vec![home.join("go")])
                .unwrap_or_default(),
        }
    };

    let gobin = tool
        .gobin
        .clone()
        .or_else(|| std::env::var_os("GOBIN").map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty());

    tracing::debug!(?goroot, ?gopath, ?gobin, "resolved go environment");
    GoEnvironment::new(goroot, gopath, gobin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> GoEnvironment {
        GoEnvironment::new(
            Some(PathBuf::from("/usr/local/go")),
            vec![PathBuf::from("/home/dev/go")],
            None,
        )
    }

    #[test]
    fn test_bin_folder_inside_gopath() {
        let project = Project::new("app", "/home/dev/go/src/example.com/app");
        assert_eq!(env().bin_folder(&project), PathBuf::from("/home/dev/go/bin"));
    }

    #[test]
    fn test_bin_folder_outside_gopath() {
        let project = Project::new("app", "/work/app");
        assert_eq!(env().bin_folder(&project), PathBuf::from("/work/app/bin"));
    }

    #[test]
    fn test_bin_folder_prefers_gobin() {
        let mut env = env();
        env.gobin = Some(PathBuf::from("/custom/bin"));
        let project = Project::new("app", "/work/app");
        assert_eq!(env.bin_folder(&project), PathBuf::from("/custom/bin"));
    }

    #[test]
    fn test_process_env_contains_effective_gopath() {
        let project = Project::new("app", "/work/app");
        let vars = env().process_env(&project).unwrap();

        let goroot = vars.iter().find(|(k, _)| k == "GOROOT").unwrap();
        assert_eq!(goroot.1, "/usr/local/go");

        let gopath = vars.iter().find(|(k, _)| k == "GOPATH").unwrap();
        assert!(gopath.1.contains("/home/dev/go"));
        assert!(gopath.1.contains("/work/app"));
    }

    #[test]
    fn test_detect_prefers_config() {
        let tool = ToolConfig {
            goroot: Some(PathBuf::from("/cfg/go")),
            gopath: vec![PathBuf::from("/cfg/gopath")],
            gobin: Some(PathBuf::from("/cfg/bin")),
            ..Default::default()
        };
        let env = detect_environment(&tool);
        assert_eq!(env.goroot, Some(PathBuf::from("/cfg/go")));
        assert_eq!(env.gopath, vec![PathBuf::from("/cfg/gopath")]);
        assert_eq!(env.gobin, Some(PathBuf::from("/cfg/bin")));
    }
}
