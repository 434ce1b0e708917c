//! The asset manifest written alongside emitted output.
//!
//! Maps logical asset names (`js/main.js`) to final on-disk names, which
//! carry a content hash in production builds. Consumers such as the HTML
//! template renderer use it to reference hashed filenames without knowing
//! the hash scheme.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

/// Filename of the manifest inside the output directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Error loading or saving a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Filesystem error
    #[error("manifest io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure
    #[error("manifest format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Logical-to-final asset name mapping for one build.
///
/// Keys use forward slashes regardless of platform so the manifest is
/// portable and diff-friendly; `BTreeMap` keeps it sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Format version for forward compatibility
    pub version: u32,
    /// Logical name to emitted filename, both relative to the output dir
    pub assets: BTreeMap<String, String>,
}

impl BuildManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self { version: MANIFEST_VERSION, assets: BTreeMap::new() }
    }

    /// Record an emitted asset.
    pub fn insert(&mut self, logical: impl Into<String>, emitted: impl Into<String>) {
        self.assets.insert(logical.into(), emitted.into());
    }

    /// Look up the emitted name for a logical asset.
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.assets.get(logical).map(String::as_str)
    }

    /// Number of recorded assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether no assets are recorded.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Load a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path)?;
        let manifest = serde_json::from_reader(BufReader::new(file))?;
        Ok(manifest)
    }

    /// Save the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        Ok(())
    }
}

impl Default for BuildManifest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_insert_and_get() {
        let mut manifest = BuildManifest::new();
        manifest.insert("js/main.js", "js/main.a1b2c3d4.js");
        assert_eq!(manifest.get("js/main.js"), Some("js/main.a1b2c3d4.js"));
        assert_eq!(manifest.get("js/other.js"), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILENAME);

        let mut manifest = BuildManifest::new();
        manifest.insert("js/main.js", "js/main.deadbeef.js");
        manifest.insert("css/main.css", "css/main.cafebabe.css");
        manifest.save(&path).unwrap();

        let loaded = BuildManifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.version, MANIFEST_VERSION);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = BuildManifest::load(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut manifest = BuildManifest::new();
        manifest.insert("js/z.js", "js/z.1.js");
        manifest.insert("js/a.js", "js/a.1.js");
        let keys: Vec<&String> = manifest.assets.keys().collect();
        assert_eq!(keys, vec!["js/a.js", "js/z.js"]);
    }
}
