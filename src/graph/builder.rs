//! Asset graph construction.
//!
//! Walks out from the entry points, reading each file, scanning it for
//! dependency references, and resolving them through the configured
//! [`Resolver`]. Per-module resolution and IO failures are collected so a
//! single pass reports as much as possible; an eager dependency cycle is
//! the only fatal outcome.

use crate::graph::module::{DepKind, DependencyRef, Module};
use crate::graph::scan::scan_refs;
use crate::report::{BuildFailure, FailureKind};
use crate::resolve::{normalize, Resolver};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A dependency cycle with no lazy edge to defer through.
#[derive(Debug, Clone, Error)]
#[error("eager dependency cycle: {}", cycle.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
pub struct CycleError {
    /// The modules forming the cycle, in edge order
    pub cycle: Vec<PathBuf>,
}

/// The dependency graph for one build, keyed by resolved absolute path.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: HashMap<PathBuf, Module>,
    /// First-encounter order of the traversal; chunk ordering derives from it
    order: Vec<PathBuf>,
    entries: Vec<PathBuf>,
}

impl ModuleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry module paths, in configuration order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Look up a module by path.
    pub fn get(&self, path: &Path) -> Option<&Module> {
        self.modules.get(path)
    }

    /// Look up a module mutably.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Module> {
        self.modules.get_mut(path)
    }

    /// Whether the graph contains a module for `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    /// Iterate modules in first-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|p| self.modules.get(p))
    }

    /// All module paths in first-encounter order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    /// Position of a module in the traversal order.
    pub fn order_index(&self, path: &Path) -> Option<usize> {
        self.order.iter().position(|p| p == path)
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the graph has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn insert(&mut self, module: Module) {
        if !self.modules.contains_key(&module.path) {
            self.order.push(module.path.clone());
        }
        self.modules.insert(module.path.clone(), module);
    }

    /// The changed modules plus everything transitively depending on them.
    ///
    /// This is the minimal subgraph an incremental rebuild must re-run.
    pub fn dependents_closure(&self, changed: &[PathBuf]) -> HashSet<PathBuf> {
        let mut reverse: HashMap<&Path, Vec<&Path>> = HashMap::new();
        for module in self.modules.values() {
            for dep in &module.deps {
                reverse.entry(dep.resolved.as_path()).or_default().push(module.path.as_path());
            }
        }

        let mut closure: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<PathBuf> = changed.iter().cloned().collect();
        while let Some(path) = queue.pop_front() {
            if !closure.insert(path.clone()) {
                continue;
            }
            if let Some(parents) = reverse.get(path.as_path()) {
                for parent in parents {
                    queue.push_back(parent.to_path_buf());
                }
            }
        }
        closure
    }
}

/// Result of a graph build: the graph plus collected non-fatal issues.
#[derive(Debug)]
pub struct GraphBuild {
    /// The constructed graph
    pub graph: ModuleGraph,
    /// Per-module resolution and IO failures
    pub failures: Vec<BuildFailure>,
    /// Cycles that were deferred through a lazy edge, as warnings
    pub deferred_cycles: Vec<String>,
}

/// Builds a [`ModuleGraph`] from entry points via a pluggable resolver.
pub struct GraphBuilder<'a> {
    resolver: &'a dyn Resolver,
}

impl<'a> GraphBuilder<'a> {
    /// Create a builder over the given resolver.
    pub fn new(resolver: &'a dyn Resolver) -> Self {
        Self { resolver }
    }

    /// Build a fresh graph from the entry files.
    pub fn build(&self, entries: &[PathBuf]) -> Result<GraphBuild, CycleError> {
        self.build_with_reuse(entries, None, &HashSet::new())
    }

    /// Build a graph, reusing modules from a previous build.
    ///
    /// Modules present in `prev` and not in `dirty` are carried over with
    /// their transformed output intact; dirty modules are re-read and
    /// re-scanned. Used by the incremental rebuild path.
    pub fn build_with_reuse(
        &self,
        entries: &[PathBuf],
        prev: Option<&ModuleGraph>,
        dirty: &HashSet<PathBuf>,
    ) -> Result<GraphBuild, CycleError> {
        let mut graph = ModuleGraph::new();
        let mut failures = Vec::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();

        for entry in entries {
            let entry = normalize(entry);
            if !graph.entries.contains(&entry) {
                graph.entries.push(entry.clone());
            }
            queue.push_back(entry);
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        while let Some(path) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }

            let module = if let Some(reusable) =
                prev.filter(|_| !dirty.contains(&path)).and_then(|g| g.get(&path))
            {
                reusable.clone()
            } else {
                match self.load_module(&path, &mut failures) {
                    Some(module) => module,
                    None => continue,
                }
            };

            for dep in &module.deps {
                if !visited.contains(&dep.resolved) {
                    queue.push_back(dep.resolved.clone());
                }
            }
            graph.insert(module);
        }

        if let Some(cycle) = find_eager_cycle(&graph) {
            return Err(CycleError { cycle });
        }
        let deferred_cycles = find_deferred_cycles(&graph);

        Ok(GraphBuild { graph, failures, deferred_cycles })
    }

    fn load_module(&self, path: &Path, failures: &mut Vec<BuildFailure>) -> Option<Module> {
        let source = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                failures.push(BuildFailure::new(path, FailureKind::Io, e.to_string()));
                return None;
            }
        };

        let mut module = Module::new(path.to_path_buf(), source);
        for scanned in scan_refs(module.kind, &module.source) {
            match self.resolver.resolve(&scanned.specifier, path) {
                Ok(resolved) => module.deps.push(DependencyRef {
                    specifier: scanned.specifier,
                    resolved,
                    kind: scanned.kind,
                }),
                Err(e) => {
                    failures.push(BuildFailure::new(path, FailureKind::Resolve, e.to_string()));
                }
            }
        }
        Some(module)
    }
}

/// Find a cycle consisting only of eager edges, if any.
fn find_eager_cycle(graph: &ModuleGraph) -> Option<Vec<PathBuf>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Grey,
        Black,
    }

    let mut colors: HashMap<&Path, Color> =
        graph.paths().iter().map(|p| (p.as_path(), Color::White)).collect();

    fn visit<'g>(
        graph: &'g ModuleGraph,
        path: &'g Path,
        colors: &mut HashMap<&'g Path, Color>,
        stack: &mut Vec<PathBuf>,
    ) -> Option<Vec<PathBuf>> {
        colors.insert(path, Color::Grey);
        stack.push(path.to_path_buf());

        if let Some(module) = graph.get(path) {
            for dep in module.deps.iter().filter(|d| d.kind == DepKind::Eager) {
                match colors.get(dep.resolved.as_path()) {
                    Some(Color::Grey) => {
                        let start =
                            stack.iter().position(|p| p == &dep.resolved).unwrap_or_default();
                        let mut cycle: Vec<PathBuf> = stack[start..].to_vec();
                        cycle.push(dep.resolved.clone());
                        return Some(cycle);
                    }
                    Some(Color::White) => {
                        let dep_path = graph.get(&dep.resolved).map(|m| m.path.as_path());
                        if let Some(dep_path) = dep_path {
                            if let Some(cycle) = visit(graph, dep_path, colors, stack) {
                                return Some(cycle);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        colors.insert(path, Color::Black);
        stack.pop();
        None
    }

    let paths: Vec<&Path> = graph.paths().iter().map(|p| p.as_path()).collect();
    for path in paths {
        if colors.get(path) == Some(&Color::White) {
            let mut stack = Vec::new();
            if let Some(cycle) = visit(graph, path, &mut colors, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Find cycles that are closed only through a lazy edge.
///
/// These are permitted; the bundle binds them on demand. Each is reported
/// once as a warning string.
fn find_deferred_cycles(graph: &ModuleGraph) -> Vec<String> {
    let mut warnings = Vec::new();
    for module in graph.iter() {
        for dep in module.deps.iter().filter(|d| d.kind == DepKind::Lazy) {
            if reaches(graph, &dep.resolved, &module.path) {
                warnings.push(format!(
                    "cycle deferred through lazy import: {} -> {}",
                    module.path.display(),
                    dep.resolved.display()
                ));
            }
        }
    }
    warnings
}

/// Whether `from` can reach `target` through any edges.
fn reaches(graph: &ModuleGraph, from: &Path, target: &Path) -> bool {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([from.to_path_buf()]);
    while let Some(path) = queue.pop_front() {
        if path == target {
            return true;
        }
        if !seen.insert(path.clone()) {
            continue;
        }
        if let Some(module) = graph.get(&path) {
            for dep in &module.deps {
                queue.push_back(dep.resolved.clone());
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::FsResolver;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        normalize(&path)
    }

    #[test]
    fn test_build_simple_graph() {
        let temp = TempDir::new().unwrap();
        let entry = write_file(temp.path(), "main.js", "import './a.js';\nimport './b.js';");
        let a = write_file(temp.path(), "a.js", "export const a = 1;");
        let b = write_file(temp.path(), "b.js", "export const b = 2;");

        let resolver = FsResolver::new();
        let built = GraphBuilder::new(&resolver).build(&[entry.clone()]).unwrap();

        assert!(built.failures.is_empty());
        assert_eq!(built.graph.len(), 3);
        assert_eq!(built.graph.entries(), &[entry.clone()]);
        // First-encounter order: entry, then deps as listed.
        assert_eq!(built.graph.paths(), &[entry, a, b]);
    }

    #[test]
    fn test_build_collects_resolution_failures() {
        let temp = TempDir::new().unwrap();
        let entry =
            write_file(temp.path(), "main.js", "import './gone.js';\nimport './real.js';");
        write_file(temp.path(), "real.js", "export const x = 1;");

        let resolver = FsResolver::new();
        let built = GraphBuilder::new(&resolver).build(&[entry]).unwrap();

        // The failure is recorded, the resolvable dep still lands.
        assert_eq!(built.failures.len(), 1);
        assert_eq!(built.failures[0].kind, FailureKind::Resolve);
        assert!(built.failures[0].message.contains("gone.js"));
        assert_eq!(built.graph.len(), 2);
    }

    #[test]
    fn test_eager_cycle_is_fatal() {
        let temp = TempDir::new().unwrap();
        let entry = write_file(temp.path(), "a.js", "import './b.js';");
        write_file(temp.path(), "b.js", "import './a.js';");

        let resolver = FsResolver::new();
        let err = GraphBuilder::new(&resolver).build(&[entry]).unwrap_err();
        assert!(err.cycle.len() >= 2);
        assert!(err.to_string().contains("eager dependency cycle"));
    }

    #[test]
    fn test_lazy_cycle_is_deferred() {
        let temp = TempDir::new().unwrap();
        let entry = write_file(temp.path(), "a.js", "const b = () => import('./b.js');");
        write_file(temp.path(), "b.js", "import './a.js';");

        let resolver = FsResolver::new();
        let built = GraphBuilder::new(&resolver).build(&[entry]).unwrap();
        assert_eq!(built.deferred_cycles.len(), 1);
        assert!(built.deferred_cycles[0].contains("lazy import"));
    }

    #[test]
    fn test_dependents_closure() {
        let temp = TempDir::new().unwrap();
        let entry = write_file(temp.path(), "main.js", "import './mid.js';");
        let mid = write_file(temp.path(), "mid.js", "import './leaf.js';");
        let leaf = write_file(temp.path(), "leaf.js", "export const x = 1;");
        let _other = write_file(temp.path(), "other.js", "export const y = 2;");

        let resolver = FsResolver::new();
        let built = GraphBuilder::new(&resolver).build(&[entry.clone()]).unwrap();

        let closure = built.graph.dependents_closure(std::slice::from_ref(&leaf));
        assert!(closure.contains(&leaf));
        assert!(closure.contains(&mid));
        assert!(closure.contains(&entry));
        assert_eq!(closure.len(), 3);
    }

    #[test]
    fn test_build_with_reuse_keeps_clean_modules() {
        let temp = TempDir::new().unwrap();
        let entry = write_file(temp.path(), "main.js", "import './a.js';");
        let a = write_file(temp.path(), "a.js", "export const a = 1;");

        let resolver = FsResolver::new();
        let builder = GraphBuilder::new(&resolver);
        let mut first = builder.build(&[entry.clone()]).unwrap();

        // Simulate a transformed output on the clean module.
        first.graph.get_mut(&a).unwrap().output = Some(crate::graph::module::TransformedOutput {
            bytes: b"transformed".to_vec(),
            map: crate::sourcemap::SourceMap::identity("a.js", 1),
        });

        let dirty: HashSet<PathBuf> = [entry.clone()].into_iter().collect();
        let second =
            builder.build_with_reuse(&[entry.clone()], Some(&first.graph), &dirty).unwrap();

        assert!(second.graph.get(&a).unwrap().output.is_some());
        assert!(second.graph.get(&entry).unwrap().output.is_none());
    }

    #[test]
    fn test_missing_entry_is_collected_not_fatal() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.js");

        let resolver = FsResolver::new();
        let built = GraphBuilder::new(&resolver).build(&[missing]).unwrap();
        assert_eq!(built.failures.len(), 1);
        assert_eq!(built.failures[0].kind, FailureKind::Io);
        assert!(built.graph.is_empty());
    }
}
