use super::spec::{PackageName, PackageSpec};
use crate::error::{BuildError, Result};
use crate::toolchain::ToolchainEnvironment;
use std::fmt;
use std::path::PathBuf;

/// Compiler flags baked into every default command: no optimization, no
/// inlining, so the produced binaries are debuggable.
pub const DEBUG_GCFLAGS: &str = "-gcflags \"-N -l\"";

/// A project as seen by the build core: a name and an absolute location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub location: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

/// One buildable configuration of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildTarget {
    pub name: String,
    /// Name of the registered [`BuildType`]
    pub build_type: String,
    /// Package spec to build; empty means "whatever the project holds"
    pub build_configuration: String,
    /// Replaces the default options entirely when non-empty
    pub options: String,
    /// Appended after the options
    pub extra_args: Vec<String>,
}

impl BuildTarget {
    pub fn new(name: &str, build_type: BuildType, build_configuration: &str) -> Self {
        Self {
            name: name.to_string(),
            build_type: build_type.name().to_string(),
            build_configuration: build_configuration.to_string(),
            ..Default::default()
        }
    }

    /// The override when present, otherwise the build type's defaults for `spec`.
    pub fn effective_options(&self, build_type: BuildType, spec: &PackageSpec) -> String {
        if self.options.trim().is_empty() {
            build_type.default_options(spec)
        } else {
            self.options.clone()
        }
    }
}

/// Where a successful build leaves its executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPath {
    Path(PathBuf),
    /// The build type runs something but leaves no executable behind.
    NoArtifact,
}

impl ArtifactPath {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ArtifactPath::Path(p) => Some(p),
            ArtifactPath::NoArtifact => None,
        }
    }
}

/// The kinds of build the go tool is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildType {
    /// `go install`: builds and installs binaries into the bin folder
    Build,
    /// `go test -c`: compiles a test binary without running it
    BuildTests,
    /// `go test`: builds and runs tests
    RunTests,
}

impl BuildType {
    pub fn name(&self) -> &'static str {
        match self {
            BuildType::Build => "build",
            BuildType::BuildTests => "build-tests",
            BuildType::RunTests => "run-tests",
        }
    }

    /// The go subcommand (possibly with flags) for this build type.
    pub fn verb(&self) -> &'static str {
        match self {
            BuildType::Build => "install",
            BuildType::BuildTests => "test -c",
            BuildType::RunTests => "test",
        }
    }

    pub fn default_options(&self, spec: &PackageSpec) -> String {
        format!("{} -v {} {}", self.verb(), DEBUG_GCFLAGS, spec)
    }

    /// Binary file name (without platform suffix), or `None` when nothing is produced.
    pub fn bin_file_path(&self, package: &PackageName) -> Option<String> {
        match self {
            BuildType::Build => Some(package.last_segment().to_string()),
            BuildType::BuildTests => Some(format!("{}.test", package.last_segment())),
            BuildType::RunTests => None,
        }
    }

    pub fn artifact_path(
        &self,
        target: &BuildTarget,
        project: &Project,
        env: &dyn ToolchainEnvironment,
    ) -> Result<ArtifactPath> {
        if *self == BuildType::RunTests {
            return Ok(ArtifactPath::NoArtifact);
        }

        let package = PackageName::new(&target.build_configuration)?;
        let Some(bin_file) = self.bin_file_path(&package) else {
            return Ok(ArtifactPath::NoArtifact);
        };

        let file_name = format!("{}{}", bin_file, std::env::consts::EXE_SUFFIX);
        Ok(ArtifactPath::Path(env.bin_folder(project).join(file_name)))
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, immutable table of the build types an orchestrator offers.
#[derive(Debug, Clone)]
pub struct BuildTypeRegistry {
    types: Vec<BuildType>,
}

impl Default for BuildTypeRegistry {
    fn default() -> Self {
        Self {
            types: vec![BuildType::Build, BuildType::BuildTests, BuildType::RunTests],
        }
    }
}

impl BuildTypeRegistry {
    pub fn types(&self) -> &[BuildType] {
        &self.types
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.types.iter().map(BuildType::name).collect()
    }

    pub fn get(&self, name: &str) -> Result<BuildType> {
        self.types
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| BuildError::UnknownBuildType(name.to_string()))
    }

    /// Resolve a target name that has no stored configuration:
    /// `<build-type>` or `<build-type>:<package-spec>`.
    pub fn adhoc_target(&self, name: &str) -> Result<BuildTarget> {
        let (type_name, spec) = name.split_once(':').unwrap_or((name, ""));
        let build_type = self
            .get(type_name)
            .map_err(|_| BuildError::UnknownTarget(name.to_string()))?;
        Ok(BuildTarget::new(name, build_type, spec))
    }
}
