//! Transform pipeline.
//!
//! Transforms are registered as an explicit ordered rule list; each rule
//! pairs a path pattern with a boxed [`Transform`]. For a module, every
//! matching transform runs in sequence, threading output bytes and source
//! map forward. A failing transform is fatal for that module only; the
//! batch continues and failures are aggregated by the pipeline.
//!
//! Transforms of independent modules have no data dependency on each other
//! and run on the rayon worker pool: each worker gets a read-only snapshot
//! of its module and writes into a write-once output slot.

pub mod builtin;

use crate::config::Mode;
use crate::graph::{ModuleGraph, ModuleKind, TransformedOutput};
use crate::sourcemap::SourceMap;
use glob::Pattern;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use builtin::{Identity, MinifyMarkup, MinifyWhitespace, StripComments};

/// A transform rejected its input; fatal for the affected module only.
#[derive(Debug, Clone, Error)]
#[error("{transform} failed for {}: {message}", path.display())]
pub struct TransformError {
    /// The module being transformed
    pub path: PathBuf,
    /// Name of the transform that failed
    pub transform: String,
    /// What went wrong
    pub message: String,
}

impl TransformError {
    /// Create a transform error.
    pub fn new(
        path: impl Into<PathBuf>,
        transform: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { path: path.into(), transform: transform.into(), message: message.into() }
    }
}

/// Capability for a single per-file transform stage.
pub trait Transform: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Apply the transform, threading bytes and source map forward.
    fn apply(
        &self,
        input: &[u8],
        map: &SourceMap,
        path: &Path,
    ) -> Result<(Vec<u8>, SourceMap), TransformError>;
}

/// A path pattern paired with the transform to run on matching modules.
pub struct TransformRule {
    pattern: Pattern,
    transform: Box<dyn Transform>,
}

/// The ordered transform registry for a build.
#[derive(Default)]
pub struct TransformSet {
    rules: Vec<TransformRule>,
}

impl TransformSet {
    /// Create an empty set; modules pass through untouched.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform for paths matching a glob pattern.
    ///
    /// Patterns match against the full module path, so extension rules
    /// should be written as `**/*.js`.
    pub fn add(
        mut self,
        pattern: &str,
        transform: Box<dyn Transform>,
    ) -> Result<Self, glob::PatternError> {
        self.rules.push(TransformRule { pattern: Pattern::new(pattern)?, transform });
        Ok(self)
    }

    /// The default rule list for a build mode.
    ///
    /// Development keeps sources readable; production strips comments and
    /// collapses whitespace for scripts and styles and minifies markup.
    pub fn for_mode(mode: Mode) -> Self {
        if mode != Mode::Production {
            return Self::new();
        }
        let mut set = Self::new();
        for ext in ["js", "mjs", "cjs", "css", "scss", "sass"] {
            let pattern = format!("**/*.{ext}");
            set = set
                .add(&pattern, Box::new(StripComments))
                .and_then(|s| s.add(&pattern, Box::new(MinifyWhitespace)))
                .expect("built-in patterns are valid");
        }
        for ext in ["html", "htm"] {
            set = set
                .add(&format!("**/*.{ext}"), Box::new(MinifyMarkup))
                .expect("built-in patterns are valid");
        }
        set
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run all matching transforms over one module snapshot.
    pub fn run(
        &self,
        path: &Path,
        kind: ModuleKind,
        source: &[u8],
    ) -> Result<TransformedOutput, TransformError> {
        let file = path.display().to_string();
        // Binary assets carry an empty map and skip text transforms.
        if kind == ModuleKind::Asset {
            return Ok(TransformedOutput {
                bytes: source.to_vec(),
                map: SourceMap { file, lines: vec![] },
            });
        }

        let line_count = source.iter().filter(|&&b| b == b'\n').count() + 1;
        let mut bytes = source.to_vec();
        let mut map = SourceMap::identity(file, line_count);

        for rule in self.rules.iter().filter(|r| r.pattern.matches_path(path)) {
            let (next_bytes, next_map) = rule.transform.apply(&bytes, &map, path)?;
            bytes = next_bytes;
            map = next_map;
        }

        Ok(TransformedOutput { bytes, map })
    }

    /// Transform every module that has no output yet, in parallel.
    ///
    /// Returns the per-module failures; failed modules are left without
    /// output and excluded from emission.
    pub fn run_pending(&self, graph: &mut ModuleGraph) -> Vec<TransformError> {
        let targets: Vec<(PathBuf, ModuleKind, Vec<u8>)> = graph
            .iter()
            .filter(|m| m.output.is_none())
            .map(|m| (m.path.clone(), m.kind, m.source.clone()))
            .collect();

        let results: Vec<(PathBuf, Result<TransformedOutput, TransformError>)> = targets
            .par_iter()
            .map(|(path, kind, source)| (path.clone(), self.run(path, *kind, source)))
            .collect();

        let mut errors = Vec::new();
        for (path, result) in results {
            match result {
                Ok(output) => {
                    if let Some(module) = graph.get_mut(&path) {
                        module.output = Some(output);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        errors
    }
}
