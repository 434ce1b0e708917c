//! Chunk planning.
//!
//! # Overview
//!
//! The planner partitions the module graph into chunks: one chunk per
//! entry, plus shared chunks for modules reachable from more than one
//! entry when the split policy allows hoisting. Planning is pure and
//! deterministic: the same graph and policy always produce the same
//! chunks in the same order, with the same member ordering.
//!
//! Every module lands in exactly one chunk. Within a chunk, modules keep
//! the graph's first-encounter order so concatenated output is stable.

use crate::graph::ModuleGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// How modules shared between entries are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Hoist modules reachable from two or more entries into shared chunks
    #[default]
    All,
    /// No hoisting; shared modules stay with the first entry that reaches them
    None,
}

/// A planned output chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk name; drives output filenames
    pub name: String,
    /// Whether this chunk corresponds to a configured entry
    pub entry: bool,
    /// Member modules in graph first-encounter order
    pub modules: Vec<PathBuf>,
}

impl Chunk {
    /// Whether the chunk has no members.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// The full chunk layout for one build.
#[derive(Debug, Clone, Default)]
pub struct ChunkPlan {
    /// Entry chunks in entry order, then shared chunks in name-stable order
    pub chunks: Vec<Chunk>,
}

impl ChunkPlan {
    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Find the chunk containing a module.
    pub fn chunk_of(&self, path: &Path) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.modules.iter().any(|m| m == path))
    }
}

/// Partition the graph into chunks under the given policy.
pub fn plan_chunks(graph: &ModuleGraph, policy: SplitPolicy) -> ChunkPlan {
    let entries = graph.entries();
    if entries.is_empty() {
        return ChunkPlan::default();
    }

    let entry_names = entry_chunk_names(entries);

    // Signature of a module: the sorted set of entry indices reaching it.
    let mut signatures: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        for path in reachable(graph, entry) {
            signatures.entry(path).or_default().push(idx);
        }
    }

    let mut entry_members: Vec<Vec<PathBuf>> = vec![Vec::new(); entries.len()];
    let mut shared_members: BTreeMap<Vec<usize>, Vec<PathBuf>> = BTreeMap::new();

    // Walk in graph order so member lists come out ordered.
    for path in graph.paths() {
        let Some(signature) = signatures.get(path) else {
            continue;
        };
        match (signature.len(), policy) {
            (1, _) | (_, SplitPolicy::None) => {
                entry_members[signature[0]].push(path.clone());
            }
            (_, SplitPolicy::All) => {
                shared_members.entry(signature.clone()).or_default().push(path.clone());
            }
        }
    }

    let mut chunks: Vec<Chunk> = entries
        .iter()
        .enumerate()
        .map(|(idx, _)| Chunk {
            name: entry_names[idx].clone(),
            entry: true,
            modules: std::mem::take(&mut entry_members[idx]),
        })
        .collect();

    // Shared chunks ordered by the concatenation of their member paths, so
    // the layout does not depend on hash iteration order.
    let mut shared: Vec<Chunk> = shared_members
        .into_iter()
        .map(|(signature, modules)| {
            let name = std::iter::once("shared".to_string())
                .chain(signature.iter().map(|&i| entry_names[i].clone()))
                .collect::<Vec<_>>()
                .join("~");
            Chunk { name, entry: false, modules }
        })
        .collect();
    shared.sort_by_key(|c| {
        c.modules.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().concat()
    });
    chunks.extend(shared);

    ChunkPlan { chunks }
}

/// All modules reachable from `start`, including itself.
fn reachable(graph: &ModuleGraph, start: &Path) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();
    let mut queue = VecDeque::from([start.to_path_buf()]);
    while let Some(path) = queue.pop_front() {
        if !seen.insert(path.clone()) {
            continue;
        }
        let Some(module) = graph.get(&path) else {
            continue;
        };
        out.push(path);
        for dep in &module.deps {
            queue.push_back(dep.resolved.clone());
        }
    }
    out
}

/// Derive chunk names from entry file stems, deduplicating clashes.
fn entry_chunk_names(entries: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    entries
        .iter()
        .map(|entry| {
            let stem = entry
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "entry".to_string());
            let mut name = stem.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                name = format!("{stem}~{n}");
                n += 1;
            }
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::resolve::{normalize, FsResolver};
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

    fn build(entries: &[PathBuf]) -> ModuleGraph {
        let resolver = FsResolver::new();
        GraphBuilder::new(&resolver).build(entries).unwrap().graph
    }

    #[test]
    fn test_single_entry_single_chunk() {
        let temp = TempDir::new().unwrap();
        let entry = write_file(temp.path(), "main.js", "import './a.js';");
        write_file(temp.path(), "a.js", "export const a = 1;");

        let plan = plan_chunks(&build(&[entry]), SplitPolicy::All);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks[0].name, "main");
        assert!(plan.chunks[0].entry);
        assert_eq!(plan.chunks[0].modules.len(), 2);
    }

    #[test]
    fn test_two_entries_shared_module_hoisted() {
        let temp = TempDir::new().unwrap();
        let one = write_file(temp.path(), "one.js", "import './shared.js';");
        let two = write_file(temp.path(), "two.js", "import './shared.js';");
        let shared = write_file(temp.path(), "shared.js", "export const s = 1;");

        let plan = plan_chunks(&build(&[one.clone(), two.clone()]), SplitPolicy::All);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.chunks[0].modules, vec![one]);
        assert_eq!(plan.chunks[1].modules, vec![two]);
        assert_eq!(plan.chunks[2].name, "shared~one~two");
        assert!(!plan.chunks[2].entry);
        assert_eq!(plan.chunks[2].modules, vec![shared]);
    }

    #[test]
    fn test_policy_none_keeps_shared_with_first_entry() {
        let temp = TempDir::new().unwrap();
        let one = write_file(temp.path(), "one.js", "import './shared.js';");
        let two = write_file(temp.path(), "two.js", "import './shared.js';");
        let shared = write_file(temp.path(), "shared.js", "export const s = 1;");

        let plan = plan_chunks(&build(&[one.clone(), two.clone()]), SplitPolicy::None);
        assert_eq!(plan.len(), 2);
        assert!(plan.chunks[0].modules.contains(&shared));
        assert!(!plan.chunks[1].modules.contains(&shared));
        // Still exactly one chunk per module.
        assert_eq!(plan.chunk_of(&shared).unwrap().name, "one");
    }

    #[test]
    fn test_plan_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let one = write_file(temp.path(), "one.js", "import './a.js';\nimport './s.js';");
        let two = write_file(temp.path(), "two.js", "import './b.js';\nimport './s.js';");
        write_file(temp.path(), "a.js", "export const a = 1;");
        write_file(temp.path(), "b.js", "export const b = 2;");
        write_file(temp.path(), "s.js", "export const s = 3;");

        let entries = [one, two];
        let first = plan_chunks(&build(&entries), SplitPolicy::All);
        let second = plan_chunks(&build(&entries), SplitPolicy::All);
        assert_eq!(first.chunks, second.chunks);
    }

    #[test]
    fn test_member_order_follows_graph_order() {
        let temp = TempDir::new().unwrap();
        let entry =
            write_file(temp.path(), "main.js", "import './z.js';\nimport './a.js';");
        let z = write_file(temp.path(), "z.js", "export const z = 1;");
        let a = write_file(temp.path(), "a.js", "export const a = 2;");

        let plan = plan_chunks(&build(&[entry.clone()]), SplitPolicy::All);
        // Import order, not alphabetical order.
        assert_eq!(plan.chunks[0].modules, vec![entry, z, a]);
    }

    #[test]
    fn test_duplicate_entry_stems_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        let one = write_file(temp.path(), "app/main.js", "export const a = 1;");
        let two = write_file(temp.path(), "admin/main.js", "export const b = 2;");

        let plan = plan_chunks(&build(&[one, two]), SplitPolicy::All);
        assert_eq!(plan.chunks[0].name, "main");
        assert_eq!(plan.chunks[1].name, "main~1");
    }

    #[test]
    fn test_every_module_in_exactly_one_chunk() {
        let temp = TempDir::new().unwrap();
        let one = write_file(temp.path(), "one.js", "import './s.js';\nimport './a.js';");
        let two = write_file(temp.path(), "two.js", "import './s.js';");
        write_file(temp.path(), "a.js", "export const a = 1;");
        write_file(temp.path(), "s.js", "export const s = 2;");

        let graph = build(&[one, two]);
        for policy in [SplitPolicy::All, SplitPolicy::None] {
            let plan = plan_chunks(&graph, policy);
            let mut counts: HashMap<&PathBuf, usize> = HashMap::new();
            for chunk in &plan.chunks {
                for path in &chunk.modules {
                    *counts.entry(path).or_default() += 1;
                }
            }
            assert_eq!(counts.len(), graph.len());
            assert!(counts.values().all(|&c| c == 1));
        }
    }
}
