//! Turning go tool output into structured diagnostics.
//!
//! Output is scanned line by line. A line shaped like `path:line[:col]: message`
//! becomes a [`DiagnosticRecord`]; indented lines right after a record continue
//! its message. Package headers (`# pkg`) and test-runner chatter are skipped.
//! Anything else is a [`ParseAnomaly`]: reported, never fatal.
//!
//! Parsing is a pure function of the captured text.

pub mod markers;

use crate::build::ProcessResult;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>(?:[A-Za-z]:)?[^:]+):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?P<msg>.+)$")
        .expect("diagnostic pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One error or warning reported by the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    /// As printed: relative to the source root, or absolute
    pub file: PathBuf,
    /// 1-based
    pub line: u32,
    /// 1-based, 0 when the tool did not report one
    pub column: u32,
    pub message: String,
    /// Package named by the preceding `# pkg` header, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl DiagnosticRecord {
    /// The file location with relative paths anchored at `root`.
    pub fn resolved_path(&self, root: &Path) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            root.join(&self.file)
        }
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)?;
        if self.column > 0 {
            write!(f, ":{}", self.column)?;
        }
        write!(f, ": {}: {}", self.severity, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

/// An output line that matched no known shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseAnomaly {
    pub stream: Stream,
    /// 1-based line number within its stream
    pub line_number: usize,
    pub line: String,
}

impl fmt::Display for ParseAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized {:?} line {}: {}",
            self.stream, self.line_number, self.line
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub diagnostics: Vec<DiagnosticRecord>,
    pub anomalies: Vec<ParseAnomaly>,
}

impl ParsedOutput {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Parse both captured streams; stderr first, where the compiler writes.
pub fn parse_output(result: &ProcessResult) -> ParsedOutput {
    let mut parsed = parse_stream(&result.stderr, Stream::Stderr);
    let stdout = parse_stream(&result.stdout, Stream::Stdout);
    parsed.diagnostics.extend(stdout.diagnostics);
    parsed.anomalies.extend(stdout.anomalies);
    parsed
}

/// Parse a single block of output text.
pub fn parse_text(text: &str) -> ParsedOutput {
    parse_stream(text, Stream::Stdout)
}

fn parse_stream(text: &str, stream: Stream) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let mut package: Option<String> = None;
    // Whether the previous line produced (or continued) a record
    let mut continuing = false;
    // Inside the log output of a passed or skipped test
    let mut in_passed_test = false;
    // Inside the log output of a failed test, where each location line is its own record
    let mut in_failed_test = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continuing = false;
            continue;
        }

        if let Some(header) = line.strip_prefix("# ") {
            package = Some(header.trim().to_string());
            continuing = false;
            continue;
        }

        let indented = line.starts_with('\t') || line.starts_with(' ');
        if trimmed.starts_with("--- ") {
            in_passed_test = trimmed.starts_with("--- PASS") || trimmed.starts_with("--- SKIP");
            in_failed_test = trimmed.starts_with("--- FAIL");
            continuing = false;
            continue;
        }
        if in_passed_test && indented {
            continue;
        }
        if !indented {
            in_passed_test = false;
            in_failed_test = false;
        }

        // Related locations (`\t./a.go:3:6: other declaration of x`) belong
        // to the record above them
        if indented && continuing && !in_failed_test {
            if let Some(last) = parsed.diagnostics.last_mut() {
                last.message.push('\n');
                last.message.push_str(trimmed);
            }
            continue;
        }

        if let Some(record) = parse_diagnostic_line(trimmed, package.as_deref()) {
            parsed.diagnostics.push(record);
            continuing = true;
            continue;
        }

        if indented && continuing {
            if let Some(last) = parsed.diagnostics.last_mut() {
                last.message.push('\n');
                last.message.push_str(trimmed);
            }
            continue;
        }

        continuing = false;
        if is_tool_chatter(trimmed, stream) {
            continue;
        }

        parsed.anomalies.push(ParseAnomaly {
            stream,
            line_number: idx + 1,
            line: line.to_string(),
        });
    }

    parsed
}

fn parse_diagnostic_line(line: &str, package: Option<&str>) -> Option<DiagnosticRecord> {
    let caps = DIAGNOSTIC_LINE.captures(line)?;

    let line_no: u32 = caps["line"].parse().ok().filter(|n| *n > 0)?;
    let column: u32 = match caps.name("col") {
        Some(col) => col.as_str().parse().ok()?,
        None => 0,
    };

    let file = normalize_path(caps["file"].trim());
    if file.as_os_str().is_empty() {
        return None;
    }

    let message = caps["msg"].trim().to_string();
    let severity = if message.to_ascii_lowercase().starts_with("warning") {
        Severity::Warning
    } else {
        Severity::Error
    };

    Some(DiagnosticRecord {
        severity,
        file,
        line: line_no,
        column,
        message,
        package: package.map(str::to_string),
    })
}

fn normalize_path(raw: &str) -> PathBuf {
    let stripped = raw
        .strip_prefix("./")
        .or_else(|| raw.strip_prefix(".\\"))
        .unwrap_or(raw);
    PathBuf::from(stripped)
}

/// Lines the go tool prints that carry no diagnostic.
fn is_tool_chatter(line: &str, stream: Stream) -> bool {
    const PREFIXES: &[&str] = &[
        "=== RUN",
        "=== PAUSE",
        "=== CONT",
        "ok  ",
        "ok\t",
        "?   ",
        "?\t",
        "FAIL\t",
        "exit status ",
        "go: downloading ",
        "go: finding ",
        "go: extracting ",
    ];
    if matches!(line, "PASS" | "FAIL" | "command-line-arguments") {
        return true;
    }
    if PREFIXES.iter().any(|p| line.starts_with(p)) {
        return true;
    }
    stream == Stream::Stderr && is_verbose_package_line(line)
}

/// `go build -v` writes each import path to stderr as it compiles it.
fn is_verbose_package_line(line: &str) -> bool {
    !line.contains(':') && crate::build::spec::PackageName::new(line).is_ok()
}
