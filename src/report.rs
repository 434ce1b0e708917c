//! Build report types.
//!
//! Per-module failures are collected rather than aborting the batch, so a
//! single run surfaces as many diagnostics as possible. The report is what
//! the CLI and watch mode print at the end of a cycle.

use std::path::PathBuf;
use std::time::Duration;

/// What stage a per-module failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// An import specifier could not be resolved
    Resolve,
    /// A transform rejected the module
    Transform,
    /// The module file could not be read
    Io,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Resolve => write!(f, "resolve"),
            FailureKind::Transform => write!(f, "transform"),
            FailureKind::Io => write!(f, "io"),
        }
    }
}

/// A failure scoped to one module; the rest of the build continues.
#[derive(Debug, Clone)]
pub struct BuildFailure {
    /// Module the failure belongs to
    pub path: PathBuf,
    /// Stage that produced it
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
}

impl BuildFailure {
    /// Create a failure record.
    pub fn new(path: impl Into<PathBuf>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self { path: path.into(), kind, message: message.into() }
    }
}

impl std::fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.path.display(), self.kind, self.message)
    }
}

/// Outcome of one build cycle.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Number of modules in the graph
    pub modules: usize,
    /// Number of chunks planned
    pub chunks: usize,
    /// Output files written this cycle
    pub emitted: Vec<PathBuf>,
    /// Chunks reused unchanged from the previous cycle
    pub reused: usize,
    /// Per-module failures collected across all stages
    pub failures: Vec<BuildFailure>,
    /// Non-fatal warnings (e.g. cycles deferred through lazy imports)
    pub warnings: Vec<String>,
    /// Wall-clock duration of the cycle
    pub duration: Duration,
}

impl BuildReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cycle completed without per-module failures.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line summary for console output.
    pub fn summary(&self) -> String {
        let status = if self.is_success() { "Build complete" } else { "Build failed" };
        let mut line = format!(
            "{}: {} modules, {} chunks, {} files written ({:.0?})",
            status,
            self.modules,
            self.chunks,
            self.emitted.len(),
            self.duration
        );
        if self.reused > 0 {
            line.push_str(&format!(", {} chunks reused", self.reused));
        }
        if !self.failures.is_empty() {
            line.push_str(&format!(", {} errors", self.failures.len()));
        }
        line
    }
}
