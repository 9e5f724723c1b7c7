pub mod command;
pub mod executor;
pub mod feedback;
pub mod operation;
pub mod spec;
pub mod types;

pub use command::{CommandLine, CommandLineBuilder, tokenize};
pub use executor::{BuildExecutor, CancellationToken, ProcessLauncher, ProcessResult};
pub use feedback::FeedbackAnalyzer;
pub use operation::{
    BuildContext, BuildOutcome, BuildReport, BuildState, BuildTargetOperation, run_build_target,
};
pub use spec::{PackageName, PackageSpec, PackageSpecResolver, ResolvedSpec};
pub use types::{ArtifactPath, BuildTarget, BuildType, BuildTypeRegistry, Project};
