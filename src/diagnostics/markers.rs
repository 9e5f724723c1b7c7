//! Handing diagnostics to whatever displays them.

use super::{DiagnosticRecord, Severity};
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Consumer of one invocation's diagnostics, anchored at its source root.
pub trait MarkerSink {
    fn publish(&mut self, anchor: &Path, records: &[DiagnosticRecord]);
}

/// A diagnostic pinned to an absolute file location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl Marker {
    pub fn from_record(anchor: &Path, record: &DiagnosticRecord) -> Self {
        Self {
            path: record.resolved_path(anchor),
            line: record.line,
            column: record.column,
            severity: record.severity,
            message: record.message.clone(),
        }
    }
}

/// In-memory markers keyed by anchor. Publishing again for the same anchor
/// replaces what was there.
#[derive(Debug, Default)]
pub struct MarkerStore {
    by_anchor: BTreeMap<PathBuf, Vec<Marker>>,
}

impl MarkerStore {
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.by_anchor.values().flatten()
    }

    pub fn markers_for(&self, anchor: &Path) -> &[Marker] {
        self.by_anchor.get(anchor).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl MarkerSink for MarkerStore {
    fn publish(&mut self, anchor: &Path, records: &[DiagnosticRecord]) {
        let markers = records
            .iter()
            .map(|r| Marker::from_record(anchor, r))
            .collect();
        self.by_anchor.insert(anchor.to_path_buf(), markers);
    }
}

/// Print one marker as `path:line:col: severity: message`, continuation
/// lines indented below it.
pub fn print_marker(marker: &Marker) {
    let location = if marker.column > 0 {
        format!("{}:{}:{}", marker.path.display(), marker.line, marker.column)
    } else {
        format!("{}:{}", marker.path.display(), marker.line)
    };
    let severity = match marker.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };

    let mut lines = marker.message.lines();
    println!(
        "   {}: {}: {}",
        location.bold(),
        severity,
        lines.next().unwrap_or_default()
    );
    for rest in lines {
        println!("      {}", rest.dimmed());
    }
}
