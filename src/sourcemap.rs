//! Line-oriented source maps threaded through the transform pipeline.
//!
//! Bindle's built-in transforms only reorder and drop whole lines, so a
//! mapping from output line to original source line is enough. Transforms
//! produce a fresh map for their own output and compose it with the map
//! they received, so the final map always points back at the original file.

use serde::{Deserialize, Serialize};

/// Maps each output line back to a line in the original source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    /// Original source file this map points into
    pub file: String,
    /// `lines[i]` is the 0-based source line for output line `i`
    pub lines: Vec<u32>,
}

impl SourceMap {
    /// Create an identity map for a source with `line_count` lines.
    pub fn identity(file: impl Into<String>, line_count: usize) -> Self {
        Self { file: file.into(), lines: (0..line_count as u32).collect() }
    }

    /// Number of output lines covered by this map.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the map covers no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Compose with a map produced by a later transform stage.
    ///
    /// `self` maps intermediate lines to original lines; `later` maps final
    /// output lines to intermediate lines. The result maps final output
    /// lines to original lines. Lines `later` points at beyond `self` are
    /// passed through unchanged.
    pub fn compose(&self, later: &SourceMap) -> SourceMap {
        let lines = later
            .lines
            .iter()
            .map(|&mid| self.lines.get(mid as usize).copied().unwrap_or(mid))
            .collect();
        SourceMap { file: self.file.clone(), lines }
    }
}

/// A source map for an emitted chunk: one section per member module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMap {
    /// Per-module sections in emission order
    pub sections: Vec<SourceMap>,
}

impl ChunkMap {
    /// Create an empty chunk map.
    pub fn new() -> Self {
        Self { sections: vec![] }
    }

    /// Append a module's map as the next section.
    pub fn push(&mut self, map: SourceMap) {
        self.sections.push(map);
    }
}

impl Default for ChunkMap {
    fn default() -> Self {
        Self::new()
    }
}
