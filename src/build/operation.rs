//! Executing one build target end to end.
//!
//! resolve → assemble command line → launch → wait → parse → publish, all
//! sequential inside the calling thread. Cancellation discards everything the
//! run printed; completion always parses and publishes, even on exit code 0.

use super::command::{CommandLine, CommandLineBuilder};
use super::executor::{CancellationToken, ProcessLauncher, ProcessResult};
use super::spec::PackageSpecResolver;
use super::types::{ArtifactPath, BuildTarget, BuildTypeRegistry, Project};
use crate::diagnostics::markers::MarkerSink;
use crate::diagnostics::{self, DiagnosticRecord, ParseAnomaly, Severity};
use crate::error::Result;
use crate::notify::Notifier;
use crate::toolchain::ToolchainEnvironment;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    Resolving,
    LaunchedProcess,
    Completed { success: bool },
    Cancelled,
    Failed,
}

impl BuildState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildState::Completed { .. } | BuildState::Cancelled | BuildState::Failed
        )
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub target: String,
    pub command: CommandLine,
    pub source_root: PathBuf,
    pub result: ProcessResult,
    pub diagnostics: Vec<DiagnosticRecord>,
    pub anomalies: Vec<ParseAnomaly>,
}

impl BuildReport {
    /// Tool exited 0 and reported no errors.
    pub fn success(&self) -> bool {
        self.result.success() && self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }
}

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Completed(BuildReport),
    Cancelled { target: String },
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        matches!(self, BuildOutcome::Completed(report) if report.success())
    }
}

/// Read-only collaborators shared by every invocation.
pub struct BuildContext<'a> {
    pub registry: &'a BuildTypeRegistry,
    pub tool_path: &'a str,
    pub env: &'a dyn ToolchainEnvironment,
    pub launcher: &'a dyn ProcessLauncher,
    pub notifier: &'a dyn Notifier,
    pub strict_layout: bool,
}

impl BuildContext<'_> {
    /// The executable the target leaves behind, if its build type makes one.
    pub fn artifact_path(&self, project: &Project, target: &BuildTarget) -> Result<ArtifactPath> {
        let build_type = self.registry.get(&target.build_type)?;
        build_type.artifact_path(target, project, self.env)
    }
}

/// A single run of one build target.
pub struct BuildTargetOperation<'a> {
    ctx: &'a BuildContext<'a>,
    project: &'a Project,
    target: &'a BuildTarget,
    state: BuildState,
}

impl<'a> BuildTargetOperation<'a> {
    pub fn new(ctx: &'a BuildContext<'a>, project: &'a Project, target: &'a BuildTarget) -> Self {
        Self {
            ctx,
            project,
            target,
            state: BuildState::NotStarted,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    fn transition(&mut self, next: BuildState) {
        tracing::debug!(target_name = %self.target.name, from = ?self.state, to = ?next, "build state");
        self.state = next;
    }

    pub fn execute(
        &mut self,
        markers: &mut dyn MarkerSink,
        cancel: &CancellationToken,
    ) -> Result<BuildOutcome> {
        self.transition(BuildState::Resolving);
        let (command, source_root, env_vars) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(e) => {
                self.transition(BuildState::Failed);
                return Err(e);
            }
        };

        self.transition(BuildState::LaunchedProcess);
        let result = match self
            .ctx
            .launcher
            .launch(&command, &source_root, &env_vars, cancel)
        {
            Ok(result) => result,
            Err(e) => {
                self.transition(BuildState::Failed);
                return Err(e);
            }
        };

        if result.cancelled {
            self.transition(BuildState::Cancelled);
            return Ok(BuildOutcome::Cancelled {
                target: self.target.name.clone(),
            });
        }

        let parsed = diagnostics::parse_output(&result);
        for anomaly in &parsed.anomalies {
            tracing::warn!(target_name = %self.target.name, "{}", anomaly);
        }
        markers.publish(&source_root, &parsed.diagnostics);

        let report = BuildReport {
            target: self.target.name.clone(),
            command,
            source_root,
            result,
            diagnostics: parsed.diagnostics,
            anomalies: parsed.anomalies,
        };
        self.transition(BuildState::Completed {
            success: report.success(),
        });
        Ok(BuildOutcome::Completed(report))
    }

    fn prepare(&self) -> Result<(CommandLine, PathBuf, Vec<(String, String)>)> {
        let builder = CommandLineBuilder::new(self.ctx.tool_path)?;
        let build_type = self.ctx.registry.get(&self.target.build_type)?;

        let resolved = PackageSpecResolver::new(self.ctx.env, self.ctx.notifier)
            .strict_layout(self.ctx.strict_layout)
            .resolve(self.project, &self.target.build_configuration)?;

        let options = self.target.effective_options(build_type, &resolved.spec);
        let command = builder.build(&options, &self.target.extra_args)?;
        let env_vars = self.ctx.env.process_env(self.project)?;

        Ok((command, resolved.source_root, env_vars))
    }
}

/// Run one target with a fresh operation; convenience for callers that do
/// not need to observe intermediate state.
pub fn run_build_target(
    ctx: &BuildContext<'_>,
    project: &Project,
    target: &BuildTarget,
    markers: &mut dyn MarkerSink,
    cancel: &CancellationToken,
) -> Result<BuildOutcome> {
    BuildTargetOperation::new(ctx, project, target).execute(markers, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::types::BuildType;
    use crate::diagnostics::markers::MarkerStore;
    use crate::error::BuildError;
    use crate::notify::MemoryNotifier;
    use crate::toolchain::GoEnvironment;
    use std::path::Path;
    use std::sync::Mutex;

    /// Replays a canned result and remembers what it was asked to run.
    struct FakeLauncher {
        result: ProcessResult,
        calls: Mutex<Vec<(CommandLine, PathBuf)>>,
    }

    impl FakeLauncher {
        fn new(result: ProcessResult) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProcessLauncher for FakeLauncher {
        fn launch(
            &self,
            command: &CommandLine,
            working_dir: &Path,
            _env: &[(String, String)],
            cancel: &CancellationToken,
        ) -> Result<ProcessResult> {
            self.calls
                .lock()
                .unwrap()
                .push((command.clone(), working_dir.to_path_buf()));
            let mut result = self.result.clone();
            if cancel.is_cancelled() {
                result.cancelled = true;
                result.exit_code = None;
            }
            Ok(result)
        }
    }

    struct Fixture {
        registry: BuildTypeRegistry,
        env: GoEnvironment,
        notifier: MemoryNotifier,
        project: Project,
    }

    fn fixture() -> Fixture {
        Fixture {
            registry: BuildTypeRegistry::default(),
            env: GoEnvironment::new(None, vec![PathBuf::from("/home/dev/go")], None),
            notifier: MemoryNotifier::default(),
            project: Project::new("app", "/home/dev/go/src/example.com/app"),
        }
    }

    fn ctx<'a>(f: &'a Fixture, tool: &'a str, launcher: &'a FakeLauncher) -> BuildContext<'a> {
        BuildContext {
            registry: &f.registry,
            tool_path: tool,
            env: &f.env,
            launcher,
            notifier: &f.notifier,
            strict_layout: false,
        }
    }

    #[test]
    fn test_completed_with_diagnostics() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult {
            exit_code: Some(2),
            stderr: "# example.com/app\n./main.go:12:5: undefined: foo\n".into(),
            ..Default::default()
        });
        let ctx = ctx(&f, "go", &launcher);
        let target = BuildTarget::new("build", BuildType::Build, "");
        let mut markers = MarkerStore::default();

        let mut op = BuildTargetOperation::new(&ctx, &f.project, &target);
        let outcome = op.execute(&mut markers, &CancellationToken::new()).unwrap();

        assert_eq!(op.state(), BuildState::Completed { success: false });
        let BuildOutcome::Completed(report) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.source_root, f.project.location);
        assert_eq!(
            report.command.tokens(),
            vec!["go", "install", "-v", "-gcflags", "-N -l", "example.com/app/..."]
        );

        let published: Vec<_> = markers.markers().collect();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].path, f.project.location.join("main.go"));
    }

    #[test]
    fn test_success_still_publishes_warnings() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult {
            exit_code: Some(0),
            stdout: "main.go:1:1: warning: something odd\n".into(),
            ..Default::default()
        });
        let ctx = ctx(&f, "go", &launcher);
        let target = BuildTarget::new("build", BuildType::Build, "example.com/app");
        let mut markers = MarkerStore::default();

        let outcome =
            run_build_target(&ctx, &f.project, &target, &mut markers, &CancellationToken::new())
                .unwrap();
        assert!(outcome.success());
        assert_eq!(markers.markers().count(), 1);
    }

    #[test]
    fn test_cancelled_publishes_nothing() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult {
            exit_code: Some(2),
            stderr: "main.go:1:1: broken\n".into(),
            ..Default::default()
        });
        let ctx = ctx(&f, "go", &launcher);
        let target = BuildTarget::new("build", BuildType::Build, "");
        let mut markers = MarkerStore::default();
        let token = CancellationToken::new();
        token.cancel();

        let mut op = BuildTargetOperation::new(&ctx, &f.project, &target);
        let outcome = op.execute(&mut markers, &token).unwrap();

        assert!(matches!(outcome, BuildOutcome::Cancelled { .. }));
        assert_eq!(op.state(), BuildState::Cancelled);
        assert_eq!(markers.markers().count(), 0);
    }

    #[test]
    fn test_empty_tool_path_fails_before_launch() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult::default());
        let ctx = ctx(&f, "", &launcher);
        let target = BuildTarget::new("build", BuildType::Build, "");
        let mut markers = MarkerStore::default();

        let mut op = BuildTargetOperation::new(&ctx, &f.project, &target);
        let err = op
            .execute(&mut markers, &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, BuildError::ToolPathNotConfigured));
        assert_eq!(op.state(), BuildState::Failed);
        assert!(op.state().is_terminal());
        assert!(launcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_spec_fails_before_launch() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult::default());
        let ctx = ctx(&f, "go", &launcher);
        let target = BuildTarget::new("build", BuildType::Build, "not valid");
        let mut markers = MarkerStore::default();

        let err = run_build_target(&ctx, &f.project, &target, &mut markers, &CancellationToken::new())
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(launcher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_nonzero_exit_without_diagnostics_is_failure() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult {
            exit_code: Some(1),
            stderr: "go: something went wrong\n".into(),
            ..Default::default()
        });
        let ctx = ctx(&f, "go", &launcher);
        let target = BuildTarget::new("tests", BuildType::RunTests, "");
        let mut markers = MarkerStore::default();

        let outcome =
            run_build_target(&ctx, &f.project, &target, &mut markers, &CancellationToken::new())
                .unwrap();
        let BuildOutcome::Completed(report) = outcome else {
            panic!("expected completion");
        };
        assert!(!report.success());
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.result.stderr_excerpt(5), "go: something went wrong");
    }

    #[test]
    fn test_context_artifact_path() {
        let f = fixture();
        let launcher = FakeLauncher::new(ProcessResult::default());
        let ctx = ctx(&f, "go", &launcher);

        let run = BuildTarget::new("t", BuildType::RunTests, "example.com/app");
        assert_eq!(
            ctx.artifact_path(&f.project, &run).unwrap(),
            ArtifactPath::NoArtifact
        );

        let build = BuildTarget::new("b", BuildType::Build, "example.com/app");
        let path = ctx.artifact_path(&f.project, &build).unwrap();
        assert!(path.path().unwrap().starts_with("/home/dev/go/bin"));
    }
}
