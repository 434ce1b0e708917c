//! Build pipeline orchestration.
//!
//! # Overview
//!
//! Runs the stages of a build in order: graph construction, parallel
//! transforms, chunk planning, emission, static copies, and the HTML
//! template. Per-module problems (unresolved imports, failed transforms)
//! are collected into the [`BuildReport`]; only structural problems such
//! as an eager cycle or an unwritable output directory abort the cycle.
//!
//! The pipeline keeps the previous graph and the content hashes of the
//! last emit, so an incremental [`rebuild`](BuildPipeline::rebuild) only
//! re-reads and re-transforms the changed modules and their dependents
//! and only rewrites chunks whose bytes actually changed.

use crate::assets::{copy_assets, CopyError};
use crate::chunk::plan_chunks;
use crate::config::{resolve_path, BindleConfig};
use crate::emit::{EmitError, Emitter};
use crate::graph::{CycleError, GraphBuilder, ModuleGraph};
use crate::html::{emit_index, TemplateError};
use crate::manifest::{ManifestError, MANIFEST_FILENAME};
use crate::report::{BuildFailure, BuildReport, FailureKind};
use crate::resolve::{normalize, FsResolver, Resolver};
use crate::transform::TransformSet;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// A problem that aborts the whole build cycle.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Modules require each other at evaluation time
    #[error(transparent)]
    Cycle(#[from] CycleError),
    /// Output could not be written
    #[error(transparent)]
    Emit(#[from] EmitError),
    /// The asset manifest could not be written
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The HTML template could not be rendered
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// A required copy pattern failed
    #[error(transparent)]
    Copy(#[from] CopyError),
    /// The output directory could not be cleaned
    #[error("cannot clean output directory {}: {source}", path.display())]
    Clean {
        /// Directory being removed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Resolved paths and settings shared across build cycles.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    pub config: BindleConfig,
    /// Directory the configuration is rooted at
    pub project_root: PathBuf,
    /// Print per-stage detail
    pub verbose: bool,
}

impl BuildContext {
    /// Create a context for a config rooted at `project_root`.
    pub fn new(config: BindleConfig, project_root: impl Into<PathBuf>) -> Self {
        Self { config, project_root: project_root.into(), verbose: false }
    }

    /// Enable verbose console output.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Absolute source directory.
    pub fn src_dir(&self) -> PathBuf {
        resolve_path(&self.project_root, &self.config.project.src)
    }

    /// Absolute output directory.
    pub fn out_dir(&self) -> PathBuf {
        resolve_path(&self.project_root, &self.config.project.out)
    }

    /// Absolute entry paths, in configuration order.
    pub fn entries(&self) -> Vec<PathBuf> {
        let src = self.src_dir();
        self.config.build.entry.iter().map(|e| normalize(&src.join(e))).collect()
    }

    /// Absolute HTML template path, if configured.
    pub fn template_path(&self) -> Option<PathBuf> {
        self.config.build.template.as_ref().map(|t| resolve_path(&self.project_root, t))
    }
}

/// Orchestrates build cycles and carries incremental state between them.
pub struct BuildPipeline {
    context: BuildContext,
    resolver: Box<dyn Resolver>,
    transforms: TransformSet,
    graph: Option<ModuleGraph>,
    hashes: HashMap<String, String>,
    failing: HashSet<PathBuf>,
}

impl BuildPipeline {
    /// Create a pipeline with the default resolver and the transform
    /// rules for the configured mode.
    pub fn new(context: BuildContext) -> Self {
        let transforms = TransformSet::for_mode(context.config.build.mode);
        Self {
            context,
            resolver: Box::new(FsResolver::new()),
            transforms,
            graph: None,
            hashes: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    /// Replace the resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the transform rules.
    pub fn with_transforms(mut self, transforms: TransformSet) -> Self {
        self.transforms = transforms;
        self
    }

    /// The build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Paths the watcher should consider part of the build.
    ///
    /// All graph modules plus the template and copy sources; a change
    /// anywhere else is ignored.
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .graph
            .as_ref()
            .map(|g| g.paths().to_vec())
            .unwrap_or_default();
        if let Some(template) = self.context.template_path() {
            paths.push(normalize(&template));
        }
        for pattern in &self.context.config.copy {
            paths.push(normalize(&self.context.project_root.join(&pattern.from)));
        }
        paths
    }

    /// Run a full build cycle.
    ///
    /// Cleans the output directory first when configured, which also
    /// resets the reuse cache.
    pub fn build(&mut self) -> Result<BuildReport, BuildError> {
        let out_dir = self.context.out_dir();
        if self.context.config.build.clean && out_dir.exists() {
            fs::remove_dir_all(&out_dir)
                .map_err(|e| BuildError::Clean { path: out_dir.clone(), source: e })?;
            self.hashes.clear();
        }
        self.run_cycle(None, &HashSet::new())
    }

    /// Run an incremental cycle for a set of changed paths.
    ///
    /// Only the changed modules and their transitive dependents are
    /// re-read and re-transformed; everything else is carried over from
    /// the previous graph. Falls back to a full cycle when no previous
    /// graph exists.
    pub fn rebuild(&mut self, changed: &[PathBuf]) -> Result<BuildReport, BuildError> {
        let Some(prev) = self.graph.take() else {
            return self.build();
        };

        let mut seeds: Vec<PathBuf> = changed.iter().map(|p| normalize(p)).collect();
        // Modules that failed last cycle re-run regardless of the change
        // set. A fix can be a brand-new file with no dependents in the
        // graph yet; only re-scanning the failed importer picks it up.
        seeds.extend(self.failing.iter().cloned());
        let dirty = prev.dependents_closure(&seeds);
        let report = self.run_cycle(Some(&prev), &dirty);
        if report.is_err() {
            // Keep the old graph so the next attempt can still be
            // incremental.
            self.graph.get_or_insert(prev);
        }
        report
    }

    fn run_cycle(
        &mut self,
        prev: Option<&ModuleGraph>,
        dirty: &HashSet<PathBuf>,
    ) -> Result<BuildReport, BuildError> {
        let start = Instant::now();
        let mut report = BuildReport::new();
        let entries = self.context.entries();
        let out_dir = self.context.out_dir();

        let builder = GraphBuilder::new(self.resolver.as_ref());
        let built = builder.build_with_reuse(&entries, prev, dirty)?;
        let mut graph = built.graph;
        report.failures.extend(built.failures);
        report.warnings.extend(built.deferred_cycles);

        for error in self.transforms.run_pending(&mut graph) {
            report
                .failures
                .push(BuildFailure::new(&error.path, FailureKind::Transform, error.to_string()));
        }

        let plan = plan_chunks(&graph, self.context.config.split.policy);
        let emitter =
            Emitter::new(&out_dir, self.context.config.build.mode, self.context.config.build.hash_length);
        let outcome = emitter.emit(&graph, &plan, &self.hashes)?;

        let mut manifest = outcome.manifest;
        report.emitted.extend(outcome.written);
        report.reused = outcome.reused;

        let copied = copy_assets(&self.context.config.copy, &self.context.project_root, &out_dir)?;
        report.emitted.extend(copied);

        if let Some(template) = self.context.template_path() {
            let page =
                emit_index(&template, &out_dir, &manifest, self.context.config.build.mode)?;
            manifest.insert("index.html", "index.html");
            report.emitted.push(page);
        }

        manifest.save(&out_dir.join(MANIFEST_FILENAME))?;

        report.modules = graph.len();
        report.chunks = plan.len();
        report.duration = start.elapsed();

        self.graph = Some(graph);
        self.hashes = outcome.hashes;
        self.failing = report.failures.iter().map(|f| f.path.clone()).collect();
        Ok(report)
    }
}

/// Whether a changed path belongs to the build.
///
/// A path is relevant when it is a tracked module, the template, a copy
/// source (or inside a copied directory), or any path under the source
/// directory, since a new file there may satisfy a previously missing
/// import.
pub fn is_relevant_change(path: &Path, src_dir: &Path, tracked: &[PathBuf]) -> bool {
    let path = normalize(path);
    if path.starts_with(src_dir) {
        return true;
    }
    tracked.iter().any(|t| path == *t || path.starts_with(t))
}
