use crate::build::spec::PackageName;
use crate::build::types::Project;
use std::path::{Path, PathBuf};

/// Snapshot of the Go toolchain environment used for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoEnvironment {
    /// Go installation root (`GOROOT`), if known
    pub goroot: Option<PathBuf>,

    /// Workspace roots (`GOPATH` entries), in priority order
    pub gopath: Vec<PathBuf>,

    /// Explicit install folder for binaries (`GOBIN`)
    pub gobin: Option<PathBuf>,
}

impl GoEnvironment {
    pub fn new(goroot: Option<PathBuf>, gopath: Vec<PathBuf>, gobin: Option<PathBuf>) -> Self {
        Self {
            goroot,
            gopath,
            gobin,
        }
    }

    /// The GOPATH entry whose `src` folder contains `location`.
    pub fn gopath_entry_for(&self, location: &Path) -> Option<&Path> {
        self.gopath
            .iter()
            .find(|entry| location.starts_with(entry.join("src")))
            .map(PathBuf::as_path)
    }

    /// GOPATH as seen by the tool: the project itself is appended when it
    /// lives outside every entry, so `<project>/src` acts as a source root.
    pub fn effective_gopath(&self, project: &Project) -> Vec<PathBuf> {
        let mut entries = self.gopath.clone();
        if self.gopath_entry_for(&project.location).is_none()
            && !entries.iter().any(|e| e == &project.location)
        {
            entries.push(project.location.clone());
        }
        entries
    }

    pub(crate) fn package_at(&self, location: &Path) -> Option<PackageName> {
        let entry = self.gopath_entry_for(location)?;
        let relative = location.strip_prefix(entry.join("src")).ok()?;

        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if segments.is_empty() {
            return None;
        }
        PackageName::new(&segments.join("/")).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> GoEnvironment {
        GoEnvironment::new(
            Some(PathBuf::from("/usr/local/go")),
            vec![PathBuf::from("/home/dev/go"), PathBuf::from("/opt/gopath")],
            None,
        )
    }

    #[test]
    fn test_gopath_entry_for() {
        let env = env();
        assert_eq!(
            env.gopath_entry_for(Path::new("/opt/gopath/src/example.com/app")),
            Some(Path::new("/opt/gopath"))
        );
        assert_eq!(env.gopath_entry_for(Path::new("/opt/gopath/pkg/x")), None);
        assert_eq!(env.gopath_entry_for(Path::new("/work/app")), None);
    }

    #[test]
    fn test_package_at() {
        let env = env();
        let pkg = env
            .package_at(Path::new("/home/dev/go/src/example.com/app/cmd"))
            .unwrap();
        assert_eq!(pkg.as_str(), "example.com/app/cmd");

        // The src folder itself is not a package
        assert!(env.package_at(Path::new("/home/dev/go/src")).is_none());
    }

    #[test]
    fn test_effective_gopath_appends_outside_project() {
        let env = env();
        let outside = Project::new("app", "/work/app");
        let gopath = env.effective_gopath(&outside);
        assert_eq!(gopath.last().unwrap(), Path::new("/work/app"));
        assert_eq!(gopath.len(), 3);

        let inside = Project::new("app", "/home/dev/go/src/example.com/app");
        assert_eq!(env.effective_gopath(&inside).len(), 2);
    }
}
