//! Module definitions for the asset graph.
//!
//! A module is a single source file after dependency resolution: its raw
//! content, its detected kind, the ordered list of resolved dependency
//! references, and (once the transform pipeline has run) its output.

use crate::sourcemap::SourceMap;
use std::path::{Path, PathBuf};

/// Kind of a source module, detected from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// JavaScript-family source
    Script,
    /// Stylesheet source
    Style,
    /// Markup source
    Markup,
    /// Anything else, emitted verbatim
    Asset,
}

impl ModuleKind {
    /// Detect the kind of a module from its path.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("js") | Some("mjs") | Some("cjs") => ModuleKind::Script,
            Some("css") | Some("scss") | Some("sass") => ModuleKind::Style,
            Some("html") | Some("htm") => ModuleKind::Markup,
            _ => ModuleKind::Asset,
        }
    }

    /// Output subdirectory for files of this kind.
    pub fn output_subdir(&self) -> &'static str {
        match self {
            ModuleKind::Script => "js",
            ModuleKind::Style => "css",
            ModuleKind::Markup => "",
            ModuleKind::Asset => "assets",
        }
    }

    /// Extension used for emitted files of this kind.
    pub fn output_ext(&self) -> &'static str {
        match self {
            ModuleKind::Script => "js",
            ModuleKind::Style => "css",
            ModuleKind::Markup => "html",
            ModuleKind::Asset => "",
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKind::Script => write!(f, "script"),
            ModuleKind::Style => write!(f, "style"),
            ModuleKind::Markup => write!(f, "markup"),
            ModuleKind::Asset => write!(f, "asset"),
        }
    }
}

/// Eagerness of a dependency edge.
///
/// Static `import`/`require`/`@import` references are eager: both sides are
/// needed at evaluation time, so a cycle closed purely by eager edges is
/// fatal. Dynamic `import(...)` and `url(...)` references are lazy and may
/// close a cycle without breaking the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepKind {
    /// Required at module evaluation time
    Eager,
    /// Bound on demand
    Lazy,
}

/// A resolved dependency reference, in the order it was encountered.
#[derive(Debug, Clone)]
pub struct DependencyRef {
    /// The specifier as written in the source
    pub specifier: String,
    /// Absolute path the specifier resolved to
    pub resolved: PathBuf,
    /// Whether the edge is eager or lazy
    pub kind: DepKind,
}

/// Output of the transform pipeline for one module.
#[derive(Debug, Clone)]
pub struct TransformedOutput {
    /// Final bytes after all matching transforms
    pub bytes: Vec<u8>,
    /// Map from output lines back to the original source
    pub map: SourceMap,
}

/// A single source file in the asset graph.
#[derive(Debug, Clone)]
pub struct Module {
    /// Resolved absolute path, the module's identity
    pub path: PathBuf,
    /// Detected kind
    pub kind: ModuleKind,
    /// Raw file content
    pub source: Vec<u8>,
    /// Resolved dependencies, ordered as encountered in the source
    pub deps: Vec<DependencyRef>,
    /// Transformed output, populated by the transform stage
    pub output: Option<TransformedOutput>,
}

impl Module {
    /// Create a module from raw content, with no dependencies resolved yet.
    pub fn new(path: PathBuf, source: Vec<u8>) -> Self {
        let kind = ModuleKind::from_path(&path);
        Self { path, kind, source, deps: vec![], output: None }
    }

    /// The module's file stem, used for chunk and output naming.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string())
    }

    /// Drop the transformed output, forcing a re-transform next cycle.
    pub fn invalidate(&mut self) {
        self.output = None;
    }
}
