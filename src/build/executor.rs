//! Running the tool as a subprocess.
//!
//! The only blocking point of a build is waiting for the child. That wait
//! polls a [`CancellationToken`] so a caller can abort at any time; the child
//! is killed and the result reports cancellation rather than an exit code.

use super::command::CommandLine;
use crate::error::{BuildError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, mpsc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Shared flag a caller trips to abort a running build.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot of one finished (or aborted) tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the process was killed by a signal or cancelled
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub cancelled: bool,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        !self.cancelled && self.exit_code == Some(0)
    }

    /// The last `max_lines` lines of stderr, for failure summaries.
    pub fn stderr_excerpt(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Runs a command line in a directory and hands back what it printed.
pub trait ProcessLauncher: Send + Sync {
    fn launch(
        &self,
        command: &CommandLine,
        working_dir: &Path,
        env: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<ProcessResult>;
}

/// [`ProcessLauncher`] backed by `std::process`.
pub struct BuildExecutor {
    poll_interval: Duration,
}

impl Default for BuildExecutor {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl BuildExecutor {
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

/// How long a cancelled run waits for its output pipes to close.
const CANCEL_DRAIN: Duration = Duration::from_millis(500);

fn capture<R: Read + Send + 'static>(stream: Option<R>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            // A broken pipe just truncates what we keep
            let _ = stream.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

fn collect(rx: &mpsc::Receiver<Vec<u8>>, limit: Option<Duration>) -> String {
    let bytes = match limit {
        Some(limit) => rx.recv_timeout(limit).unwrap_or_default(),
        None => rx.recv().unwrap_or_default(),
    };
    String::from_utf8_lossy(&bytes).to_string()
}

/// Put the tool in its own process group so cancelling reaches the
/// compilers and test binaries it starts.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    // The group id equals the leader's pid
    unsafe {
        libc::kill(-(child.id() as i32), libc::SIGKILL);
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

impl ProcessLauncher for BuildExecutor {
    fn launch(
        &self,
        command: &CommandLine,
        working_dir: &Path,
        env: &[(String, String)],
        cancel: &CancellationToken,
    ) -> Result<ProcessResult> {
        if cancel.is_cancelled() {
            return Ok(ProcessResult {
                cancelled: true,
                ..Default::default()
            });
        }

        tracing::debug!(command = %command, dir = %working_dir.display(), "spawning build tool");

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .current_dir(working_dir)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut process);

        let mut child = process.spawn().map_err(|source| BuildError::LaunchFailed {
            program: command.program.clone(),
            source,
        })?;

        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(pid = child.id(), "cancelling build tool");
                terminate(&mut child);
                child.wait()?;
                // A straggler that escaped the group may still hold the pipes
                return Ok(ProcessResult {
                    exit_code: None,
                    stdout: collect(&stdout, Some(CANCEL_DRAIN)),
                    stderr: collect(&stderr, Some(CANCEL_DRAIN)),
                    cancelled: true,
                });
            }

            if let Some(status) = child.try_wait()? {
                tracing::debug!(?status, "build tool exited");
                return Ok(ProcessResult {
                    exit_code: status.code(),
                    stdout: collect(&stdout, None),
                    stderr: collect(&stderr, None),
                    cancelled: false,
                });
            }

            thread::sleep(self.poll_interval);
        }
    }
}
