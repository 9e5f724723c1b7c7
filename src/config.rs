use crate::build::{BuildTarget, BuildTypeRegistry};
use crate::error::BuildError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "gob.toml";

#[derive(Deserialize, Debug, Default)]
pub struct GobConfig {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ToolConfig {
    /// Path to the `go` binary
    #[serde(default)]
    pub path: String,
    pub goroot: Option<PathBuf>,
    #[serde(default)]
    pub gopath: Vec<PathBuf>,
    pub gobin: Option<PathBuf>,
    #[serde(default)]
    pub strict_layout: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TargetConfig {
    pub name: String,
    #[serde(rename = "type", default = "default_build_type")]
    pub build_type: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub options: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_build_type() -> String {
    "build".to_string()
}

impl From<&TargetConfig> for BuildTarget {
    fn from(cfg: &TargetConfig) -> Self {
        BuildTarget {
            name: cfg.name.clone(),
            build_type: cfg.build_type.clone(),
            build_configuration: cfg.package.clone(),
            options: cfg.options.clone(),
            extra_args: cfg.args.clone(),
        }
    }
}

impl GobConfig {
    /// Tool path by precedence: explicit override, `[tool].path`, `GOB_TOOL`.
    pub fn tool_path(&self, cli_override: Option<&str>) -> String {
        if let Some(path) = cli_override.filter(|p| !p.trim().is_empty()) {
            return path.to_string();
        }
        if !self.tool.path.trim().is_empty() {
            return self.tool.path.clone();
        }
        std::env::var("GOB_TOOL").unwrap_or_default()
    }

    /// A configured target by name, or an ad-hoc `<type>[:<spec>]` target.
    pub fn find_target(
        &self,
        registry: &BuildTypeRegistry,
        name: &str,
    ) -> std::result::Result<BuildTarget, BuildError> {
        if let Some(cfg) = self.targets.iter().find(|t| t.name == name) {
            registry.get(&cfg.build_type)?;
            return Ok(cfg.into());
        }
        registry.adhoc_target(name)
    }

    pub fn all_targets(&self) -> Vec<BuildTarget> {
        self.targets.iter().map(BuildTarget::from).collect()
    }
}

/// Load `gob.toml` from the project directory. A missing file is an empty config.
pub fn load_config(project_dir: &Path) -> Result<GobConfig> {
    let path = project_dir.join(CONFIG_FILE);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(GobConfig::default());
    }

    let config_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;
    let config: GobConfig = toml::from_str(&config_str).with_context(|| {
        format!(
            "Failed to parse {} - check for syntax errors (missing quotes, brackets)",
            path.display()
        )
    })?;

    let mut seen = std::collections::HashSet::new();
    for target in &config.targets {
        if !seen.insert(target.name.as_str()) {
            anyhow::bail!("Duplicate target '{}' in {}", target.name, path.display());
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[tool]
path = "/usr/local/go/bin/go"
gopath = ["/home/dev/go"]
strict_layout = true

[[target]]
name = "server"
package = "example.com/app/cmd/server"

[[target]]
name = "unit"
type = "run-tests"
options = "test -race ./..."
args = ["-count=1"]
"#;

    #[test]
    fn test_parse_config() {
        let config: GobConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.tool.path, "/usr/local/go/bin/go");
        assert!(config.tool.strict_layout);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].build_type, "build");
        assert_eq!(config.targets[1].args, vec!["-count=1"]);
    }

    #[test]
    fn test_find_target() {
        let config: GobConfig = toml::from_str(SAMPLE).unwrap();
        let registry = BuildTypeRegistry::default();

        let unit = config.find_target(&registry, "unit").unwrap();
        assert_eq!(unit.build_type, "run-tests");
        assert_eq!(unit.options, "test -race ./...");

        let adhoc = config.find_target(&registry, "build-tests:example.com/x").unwrap();
        assert_eq!(adhoc.build_configuration, "example.com/x");

        assert!(config.find_target(&registry, "nope").is_err());
    }

    #[test]
    fn test_unknown_type_in_config() {
        let config: GobConfig =
            toml::from_str("[[target]]\nname = \"x\"\ntype = \"deploy\"\n").unwrap();
        let err = config
            .find_target(&BuildTypeRegistry::default(), "x")
            .unwrap_err();
        assert!(matches!(err, BuildError::UnknownBuildType(_)));
    }

    #[test]
    fn test_tool_path_override() {
        let config: GobConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.tool_path(Some("/opt/go/bin/go")), "/opt/go/bin/go");
        assert_eq!(config.tool_path(None), "/usr/local/go/bin/go");
    }

    #[test]
    fn test_load_missing_and_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert!(config.targets.is_empty());

        fs::write(
            dir.path().join(CONFIG_FILE),
            "[[target]]\nname = \"a\"\n[[target]]\nname = \"a\"\n",
        )
        .unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate target"));
    }
}
