//! Content-hash emitter.
//!
//! # Overview
//!
//! Turns a chunk plan plus transformed module outputs into files on disk.
//! Emission is a pure function of content: identical transformed bytes
//! always produce identical filenames, so re-running a build with no
//! changes rewrites nothing new.
//!
//! Production filenames carry a truncated SHA-256 content hash
//! (`js/main.3fa9d2c1.js`); development filenames are stable
//! (`js/main.js`) and each text chunk gets a `.map` file beside it.
//!
//! Writes go through a temp file in the destination directory followed by
//! a rename, so readers never observe a half-written chunk. A failed
//! rename is retried once before the chunk is reported failed.

use crate::chunk::ChunkPlan;
use crate::config::Mode;
use crate::graph::{Module, ModuleGraph, ModuleKind};
use crate::manifest::BuildManifest;
use crate::sourcemap::ChunkMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Error writing emitted output.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Could not create the output directory tree
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        /// Directory being created
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Could not stage or fill the temp file
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// Final destination path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// Rename into place failed after a retry
    #[error("cannot move output into place at {}: {source}", path.display())]
    Persist {
        /// Final destination path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The source map for a chunk could not be encoded
    #[error("cannot encode source map {}: {source}", path.display())]
    Map {
        /// Map file destination path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// What one emit pass produced.
#[derive(Debug, Default)]
pub struct EmitOutcome {
    /// Logical to final asset names for everything emitted or reused
    pub manifest: BuildManifest,
    /// Files actually written this pass
    pub written: Vec<PathBuf>,
    /// Content hash per logical asset, for the next pass's reuse check
    pub hashes: HashMap<String, String>,
    /// Assets skipped because content and on-disk file were unchanged
    pub reused: usize,
}

/// Writes chunks and assets into the output directory.
pub struct Emitter {
    out_dir: PathBuf,
    mode: Mode,
    hash_length: usize,
}

impl Emitter {
    /// Create an emitter for the given output directory.
    pub fn new(out_dir: impl Into<PathBuf>, mode: Mode, hash_length: usize) -> Self {
        Self { out_dir: out_dir.into(), mode, hash_length }
    }

    /// Emit the plan, skipping assets whose content hash matches
    /// `prev_hashes` and whose file is already on disk.
    pub fn emit(
        &self,
        graph: &ModuleGraph,
        plan: &ChunkPlan,
        prev_hashes: &HashMap<String, String>,
    ) -> Result<EmitOutcome, EmitError> {
        let mut outcome = EmitOutcome::default();

        for chunk in &plan.chunks {
            let members: Vec<&Module> =
                chunk.modules.iter().filter_map(|p| graph.get(p)).collect();

            self.emit_text_chunk(&chunk.name, &members, ModuleKind::Script, prev_hashes, &mut outcome)?;
            self.emit_text_chunk(&chunk.name, &members, ModuleKind::Style, prev_hashes, &mut outcome)?;

            // Markup and binary assets are emitted per file, not concatenated.
            for module in members.iter().filter(|m| matches!(m.kind, ModuleKind::Asset | ModuleKind::Markup)) {
                self.emit_single(module, prev_hashes, &mut outcome)?;
            }
        }

        Ok(outcome)
    }

    /// Concatenate a chunk's members of one text kind into a single file.
    fn emit_text_chunk(
        &self,
        name: &str,
        members: &[&Module],
        kind: ModuleKind,
        prev_hashes: &HashMap<String, String>,
        outcome: &mut EmitOutcome,
    ) -> Result<(), EmitError> {
        let outputs: Vec<_> = members
            .iter()
            .filter(|m| m.kind == kind)
            .filter_map(|m| m.output.as_ref())
            .collect();
        if outputs.is_empty() {
            return Ok(());
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut map = ChunkMap::new();
        for output in &outputs {
            if !bytes.is_empty() {
                bytes.push(b'\n');
            }
            bytes.extend_from_slice(&output.bytes);
            map.push(output.map.clone());
        }

        let subdir = kind.output_subdir();
        let ext = kind.output_ext();
        let logical = format!("{subdir}/{name}.{ext}");
        let hash = content_hash(&bytes, self.hash_length);
        let final_name = match self.mode {
            Mode::Production => format!("{subdir}/{name}.{hash}.{ext}"),
            Mode::Development => logical.clone(),
        };

        let skipped = self.write_if_changed(&logical, &final_name, &hash, &bytes, prev_hashes, outcome)?;
        if !skipped && self.mode == Mode::Development {
            let map_path = self.out_dir.join(format!("{final_name}.map"));
            let json = serde_json::to_vec_pretty(&map)
                .map_err(|e| EmitError::Map { path: map_path.clone(), source: e })?;
            write_atomic(&map_path, &json)?;
            outcome.written.push(map_path);
        }
        Ok(())
    }

    /// Emit a markup or binary asset module on its own.
    fn emit_single(
        &self,
        module: &Module,
        prev_hashes: &HashMap<String, String>,
        outcome: &mut EmitOutcome,
    ) -> Result<(), EmitError> {
        let Some(output) = module.output.as_ref() else {
            return Ok(());
        };
        let stem = module.stem();
        let ext = module
            .path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string());
        let prefix = match module.kind.output_subdir() {
            "" => String::new(),
            subdir => format!("{subdir}/"),
        };

        let logical = format!("{prefix}{stem}.{ext}");
        let hash = content_hash(&output.bytes, self.hash_length);
        let final_name = match self.mode {
            Mode::Production => format!("{prefix}{stem}.{hash}.{ext}"),
            Mode::Development => logical.clone(),
        };

        self.write_if_changed(&logical, &final_name, &hash, &output.bytes, prev_hashes, outcome)?;
        Ok(())
    }

    /// Write an asset unless its hash matches the previous pass and the
    /// file already exists. Returns whether the write was skipped.
    fn write_if_changed(
        &self,
        logical: &str,
        final_name: &str,
        hash: &str,
        bytes: &[u8],
        prev_hashes: &HashMap<String, String>,
        outcome: &mut EmitOutcome,
    ) -> Result<bool, EmitError> {
        let dest = self.out_dir.join(final_name);
        outcome.manifest.insert(logical, final_name);
        outcome.hashes.insert(logical.to_string(), hash.to_string());

        if prev_hashes.get(logical).map(String::as_str) == Some(hash) && dest.is_file() {
            outcome.reused += 1;
            return Ok(true);
        }

        write_atomic(&dest, bytes)?;
        outcome.written.push(dest);
        Ok(false)
    }
}

/// Truncated hex SHA-256 of the content.
pub fn content_hash(bytes: &[u8], length: usize) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(length);
    for byte in digest.iter() {
        if hex.len() >= length {
            break;
        }
        hex.push_str(&format!("{byte:02x}"));
    }
    hex.truncate(length);
    hex
}

/// Write via temp file and rename, retrying the rename once.
pub(crate) fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), EmitError> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| EmitError::CreateDir { path: parent.to_path_buf(), source: e })?;

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| EmitError::Write { path: dest.to_path_buf(), source: e })?;
    temp.write_all(bytes)
        .map_err(|e| EmitError::Write { path: dest.to_path_buf(), source: e })?;

    match temp.persist(dest) {
        Ok(_) => Ok(()),
        Err(e) => {
            // One retry covers transient contention on the destination.
            let temp = e.file;
            temp.persist(dest)
                .map(|_| ())
                .map_err(|e| EmitError::Persist { path: dest.to_path_buf(), source: e.error })
        }
    }
}
