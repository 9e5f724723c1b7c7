//! Package names, package specs, and where a build runs from.

use super::types::Project;
use crate::error::{BuildError, Result};
use crate::notify::{Notifier, StatusLevel};
use crate::toolchain::ToolchainEnvironment;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix that makes a spec cover every package below it.
pub const RECURSIVE_SUFFIX: &str = "/...";

fn check_common(spec: &str) -> Result<()> {
    if spec.is_empty() {
        return Err(BuildError::invalid_spec(spec, "package spec is empty"));
    }
    if let Some(c) = spec
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '`' | '\\'))
    {
        return Err(BuildError::invalid_spec(
            spec,
            format!("contains invalid character {:?}", c),
        ));
    }
    if spec.len() > 1 && spec.ends_with('/') {
        return Err(BuildError::invalid_spec(spec, "ends with '/'"));
    }
    if spec.contains("//") {
        return Err(BuildError::invalid_spec(spec, "contains an empty path segment"));
    }
    Ok(())
}

/// A concrete Go import path, e.g. `example.com/app/cmd/server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: &str) -> Result<Self> {
        check_common(name)?;
        if name.starts_with('/') {
            return Err(BuildError::invalid_spec(name, "import path must be relative"));
        }
        for segment in name.split('/') {
            match segment {
                "." | ".." => {
                    return Err(BuildError::invalid_spec(
                        name,
                        format!("'{}' is not allowed in an import path", segment),
                    ));
                }
                s if s.contains("...") => {
                    return Err(BuildError::invalid_spec(
                        name,
                        "wildcards name several packages, not one",
                    ));
                }
                s if !s
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '+')) =>
                {
                    return Err(BuildError::invalid_spec(
                        name,
                        format!("invalid path segment '{}'", s),
                    ));
                }
                _ => {}
            }
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the tool is asked to build: an import path, a relative directory,
/// or a pattern ending in `...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec(String);

impl PackageSpec {
    pub fn new(spec: &str) -> Result<Self> {
        check_common(spec)?;
        Ok(Self(spec.to_string()))
    }

    /// `<package>/...`, covering the package and everything nested in it.
    pub fn recursive(base: &str) -> Result<Self> {
        Self::new(&format!("{}{}", base, RECURSIVE_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_recursive(&self) -> bool {
        self.0.ends_with("...")
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<PackageName> for PackageSpec {
    fn from(name: PackageName) -> Self {
        PackageSpec(name.0)
    }
}

/// The effective spec plus the directory the tool runs from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub spec: PackageSpec,
    pub source_root: PathBuf,
}

/// Works out what to build and where to run the tool from.
pub struct PackageSpecResolver<'a> {
    env: &'a dyn ToolchainEnvironment,
    notifier: &'a dyn Notifier,
    strict_layout: bool,
}

impl<'a> PackageSpecResolver<'a> {
    pub fn new(env: &'a dyn ToolchainEnvironment, notifier: &'a dyn Notifier) -> Self {
        Self {
            env,
            notifier,
            strict_layout: false,
        }
    }

    /// Fail instead of warning when the source root has stray Go files.
    pub fn strict_layout(mut self, strict: bool) -> Self {
        self.strict_layout = strict;
        self
    }

    pub fn resolve(&self, project: &Project, explicit_spec: &str) -> Result<ResolvedSpec> {
        let spec = self.effective_spec(project, explicit_spec)?;
        let source_root = self.source_root(project)?;
        tracing::debug!(%spec, source_root = %source_root.display(), "resolved package spec");
        Ok(ResolvedSpec { spec, source_root })
    }

    /// An explicit spec is used verbatim; otherwise the package owning the
    /// project (or `.`) with the recursive suffix.
    pub fn effective_spec(&self, project: &Project, explicit_spec: &str) -> Result<PackageSpec> {
        if !explicit_spec.is_empty() {
            return PackageSpec::new(explicit_spec);
        }

        match self.env.find_package_for_location(&project.location) {
            Some(package) => PackageSpec::recursive(package.as_str()),
            None => PackageSpec::recursive("."),
        }
    }

    pub fn source_root(&self, project: &Project) -> Result<PathBuf> {
        if self.env.is_inside_source_hierarchy(&project.location) {
            return Ok(project.location.clone());
        }

        let source_root = project.location.join("src");
        let stray = stray_source_files(&source_root)?;
        if !stray.is_empty() {
            if self.strict_layout {
                return Err(BuildError::LayoutViolation(source_root));
            }
            self.notifier.notify(
                StatusLevel::Warning,
                "Go build: Warning!",
                &format!(
                    "The source folder {} contains Go files outside of any package ({}). \
                     These files will not be built; move them into a package folder.",
                    source_root.display(),
                    stray.len()
                ),
            );
        }
        Ok(source_root)
    }
}

/// Go files sitting directly in `dir` rather than inside a package folder.
pub fn stray_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut stray = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| BuildError::Io(e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "go") {
            stray.push(path.to_path_buf());
        }
    }
    stray.sort();
    Ok(stray)
}
