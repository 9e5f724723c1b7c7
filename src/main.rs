//! # gob CLI Entry Point
//!
//! Parses arguments with clap and routes to the build, artifact and listing
//! commands. Exit codes: 0 when the tool succeeded with no errors, 1 when the
//! build failed, 2 when it could not be configured or launched, 130 when
//! interrupted.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use gobuild::build::{
    ArtifactPath, BuildContext, BuildExecutor, BuildOutcome, BuildReport, BuildTarget,
    BuildTypeRegistry, CancellationToken, FeedbackAnalyzer, PackageName, PackageSpec, Project,
    run_build_target,
};
use gobuild::config::{self, GobConfig};
use gobuild::diagnostics::markers::{MarkerStore, print_marker};
use gobuild::error::BuildError;
use gobuild::notify::ConsoleNotifier;
use gobuild::toolchain::{self, GoEnvironment};
use gobuild::ui;

#[derive(Parser)]
#[command(name = "gob")]
#[command(about = "Drive the go tool and report its diagnostics", version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a target
    Build {
        /// Target name from gob.toml, or `<type>[:<package-spec>]`
        #[arg(long)]
        target: Option<String>,
        /// Build type (build, build-tests, run-tests)
        #[arg(long = "type", conflicts_with = "all")]
        build_type: Option<String>,
        /// Package spec to build instead of the target's own
        #[arg(long, conflicts_with = "all")]
        package_spec: Option<String>,
        /// Project directory [default: current directory]
        #[arg(long)]
        project: Option<PathBuf>,
        /// Path to the go tool
        #[arg(long)]
        tool: Option<String>,
        /// Build every configured target concurrently
        #[arg(long, conflicts_with = "target")]
        all: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the executable a target produces
    Artifact {
        /// Target name from gob.toml, or `<type>:<package>`
        #[arg(long)]
        target: String,
        /// Project directory [default: current directory]
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// List the available build types
    Types,
    /// Generate shell completion scripts
    Completion { shell: Shell },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

struct Workspace {
    project: Project,
    config: GobConfig,
    env: GoEnvironment,
    registry: BuildTypeRegistry,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "gobuild=warn",
        1 => "gobuild=debug",
        _ => "gobuild=trace",
    };
    let filter = EnvFilter::try_from_env("GOB_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn open_workspace(project_dir: Option<&Path>) -> Result<Workspace> {
    let dir = match project_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let location = dir
        .canonicalize()
        .with_context(|| format!("Project directory {} not found", dir.display()))?;
    let name = location
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());

    let config = config::load_config(&location)?;
    let env = toolchain::detect_environment(&config.tool);

    Ok(Workspace {
        project: Project::new(name, location),
        config,
        env,
        registry: BuildTypeRegistry::default(),
    })
}

fn select_target(
    ws: &Workspace,
    target: Option<&str>,
    build_type: Option<&str>,
    package_spec: Option<&str>,
) -> Result<BuildTarget, BuildError> {
    let mut selected = match target {
        Some(name) => ws.config.find_target(&ws.registry, name)?,
        None => ws.registry.adhoc_target(build_type.unwrap_or("build"))?,
    };
    if let Some(build_type) = build_type {
        selected.build_type = ws.registry.get(build_type)?.name().to_string();
    }
    if let Some(spec) = package_spec {
        selected.build_configuration = PackageSpec::new(spec)?.to_string();
    }
    Ok(selected)
}

fn install_interrupt_handler(cancel: &CancellationToken) {
    let token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        tracing::warn!("could not install Ctrl-C handler: {}", e);
    }
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<BuildError>() {
        Some(e) if e.is_configuration() || e.is_launch() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn report_json(report: &BuildReport) -> serde_json::Value {
    json!({
        "target": report.target,
        "command": report.command.to_string(),
        "source_root": report.source_root,
        "exit_code": report.result.exit_code,
        "success": report.success(),
        "diagnostics": report.diagnostics,
        "anomalies": report.anomalies,
    })
}

fn print_report(report: &BuildReport, markers: &MarkerStore, elapsed: Duration) {
    for marker in markers.markers_for(&report.source_root) {
        print_marker(marker);
    }

    if report.success() {
        println!(
            "{} {} finished in {:.2?} ({} warning(s))",
            "✓".green(),
            report.target.bold(),
            elapsed,
            report.warning_count()
        );
        return;
    }

    let exit = report
        .result
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    println!(
        "{} {} failed (exit code {}, {} error(s), {} warning(s))",
        "x".red(),
        report.target.bold(),
        exit,
        report.error_count(),
        report.warning_count()
    );

    if report.diagnostics.is_empty() {
        let excerpt = report.result.stderr_excerpt(10);
        if !excerpt.is_empty() {
            println!("{}", excerpt.dimmed());
        }
    }
    let combined = format!("{}\n{}", report.result.stderr, report.result.stdout);
    if let Some(hint) = FeedbackAnalyzer::analyze(&combined) {
        println!("\n{} {}", "💡".yellow(), hint);
    }
}

fn cmd_build(
    ws: &Workspace,
    targets: Vec<BuildTarget>,
    tool_path: &str,
    format: OutputFormat,
) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel);

    let launcher = BuildExecutor::default();
    let notifier = ConsoleNotifier;

    let run_one = |target: &BuildTarget| {
        let ctx = BuildContext {
            registry: &ws.registry,
            tool_path,
            env: &ws.env,
            launcher: &launcher,
            notifier: &notifier,
            strict_layout: ws.config.tool.strict_layout,
        };
        let mut markers = MarkerStore::default();
        let started = Instant::now();
        let outcome = run_build_target(&ctx, &ws.project, target, &mut markers, &cancel);
        (outcome, markers, started.elapsed())
    };

    let results = if targets.len() == 1 {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Building {}...", targets[0].name));
        if format == OutputFormat::Text {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        let result = run_one(&targets[0]);
        pb.finish_and_clear();
        vec![result]
    } else {
        targets.par_iter().map(run_one).collect()
    };

    let mut code = ExitCode::SUCCESS;
    let mut cancelled = false;
    let mut json_reports = Vec::new();
    let mut summary = ui::Table::new(&["Target", "Type", "Result", "Errors", "Warnings"]);

    for (target, (outcome, markers, elapsed)) in targets.iter().zip(results) {
        match outcome {
            Ok(BuildOutcome::Completed(report)) => {
                if !report.success() {
                    code = ExitCode::FAILURE;
                }
                summary.add_row(vec![
                    target.name.clone(),
                    target.build_type.clone(),
                    (if report.success() { "ok".green() } else { "failed".red() }).to_string(),
                    report.error_count().to_string(),
                    report.warning_count().to_string(),
                ]);
                match format {
                    OutputFormat::Json => json_reports.push(report_json(&report)),
                    OutputFormat::Text => print_report(&report, &markers, elapsed),
                }
            }
            Ok(BuildOutcome::Cancelled { target: name }) => {
                cancelled = true;
                if format == OutputFormat::Text {
                    println!("{} {} cancelled", "!".yellow(), name.bold());
                }
                summary.add_row(vec![
                    target.name.clone(),
                    target.build_type.clone(),
                    "cancelled".yellow().to_string(),
                    "-".into(),
                    "-".into(),
                ]);
            }
            Err(e) => {
                eprintln!("{} {}: {}", "x".red(), target.name.bold(), e);
                if e.is_configuration() || e.is_launch() {
                    code = ExitCode::from(2);
                } else {
                    code = ExitCode::FAILURE;
                }
                summary.add_row(vec![
                    target.name.clone(),
                    target.build_type.clone(),
                    "error".red().to_string(),
                    "-".into(),
                    "-".into(),
                ]);
            }
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json_reports)?),
        OutputFormat::Text if targets.len() > 1 => summary.print(),
        OutputFormat::Text => {}
    }
    if cancelled {
        return Ok(ExitCode::from(130));
    }
    Ok(code)
}

fn cmd_artifact(ws: &Workspace, target_name: &str) -> Result<()> {
    let target = ws.config.find_target(&ws.registry, target_name)?;
    let build_type = ws.registry.get(&target.build_type)?;

    match build_type.artifact_path(&target, &ws.project, &ws.env)? {
        ArtifactPath::Path(path) => println!("{}", path.display()),
        ArtifactPath::NoArtifact => println!(
            "{} '{}' does not produce executable artifacts",
            "ℹ".blue(),
            target.name
        ),
    }
    Ok(())
}

fn cmd_types() {
    let registry = BuildTypeRegistry::default();
    let mut table = ui::Table::new(&["Name", "Default command", "Artifact"]);
    let (Ok(spec), Ok(package)) = (PackageSpec::new("<spec>"), PackageName::new("pkg")) else {
        return;
    };

    for build_type in registry.types() {
        let artifact = match build_type.bin_file_path(&package) {
            Some(bin) => format!("<bin>/{}", bin),
            None => "none".to_string(),
        };
        table.add_row(vec![
            build_type.name().green().to_string(),
            format!("go {}", build_type.default_options(&spec)),
            artifact,
        ]);
    }
    table.print();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Build {
            target,
            build_type,
            package_spec,
            project,
            tool,
            all,
            format,
        } => {
            let ws = open_workspace(project.as_deref())?;
            let tool_path = ws.config.tool_path(tool.as_deref());

            let targets = if all {
                if ws.config.targets.is_empty() {
                    anyhow::bail!("No [[target]] entries in {}", config::CONFIG_FILE);
                }
                ws.config.all_targets()
            } else {
                vec![select_target(
                    &ws,
                    target.as_deref(),
                    build_type.as_deref(),
                    package_spec.as_deref(),
                )?]
            };

            cmd_build(&ws, targets, &tool_path, format)
        }

        Commands::Artifact { target, project } => {
            let ws = open_workspace(project.as_deref())?;
            cmd_artifact(&ws, &target)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Types => {
            cmd_types();
            Ok(ExitCode::SUCCESS)
        }

        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "gob", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "x".red(), e);
            exit_code_for(&e)
        }
    }
}
