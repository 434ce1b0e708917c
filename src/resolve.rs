//! Specifier resolution.
//!
//! The graph builder consults a [`Resolver`] to turn an import specifier
//! plus the importing file's path into an absolute path. The default
//! implementation resolves against the filesystem with extension probing;
//! alternative resolvers can be plugged in at pipeline construction.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Error resolving an import specifier.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// No file matched the specifier
    #[error("cannot resolve '{specifier}' imported from {}", from.display())]
    NotFound {
        /// The specifier as written in the source
        specifier: String,
        /// The module that requested it
        from: PathBuf,
    },
    /// Specifier form is not supported (e.g. bare package names)
    #[error("unsupported specifier '{specifier}' imported from {}", from.display())]
    Unsupported {
        /// The specifier as written in the source
        specifier: String,
        /// The module that requested it
        from: PathBuf,
    },
}

/// Capability for turning specifiers into absolute module paths.
pub trait Resolver: Send + Sync {
    /// Resolve `specifier` as imported from the file at `from`.
    fn resolve(&self, specifier: &str, from: &Path) -> Result<PathBuf, ResolveError>;
}

/// Filesystem resolver with extension probing and directory index files.
///
/// Handles relative (`./x`, `../x`) and absolute specifiers. Bare
/// specifiers (package names) are rejected; node_modules-style resolution
/// is an external concern.
#[derive(Debug, Clone)]
pub struct FsResolver {
    extensions: Vec<String>,
}

impl FsResolver {
    /// Create a resolver with the default probe extensions.
    pub fn new() -> Self {
        Self {
            extensions: ["js", "mjs", "css", "scss", "html"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    /// Replace the probe extension list.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn probe(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_file() {
            return Some(candidate.to_path_buf());
        }
        for ext in &self.extensions {
            // Append rather than `with_extension`, which would replace a
            // dotted suffix like `.min` in the specifier.
            let mut name = candidate.as_os_str().to_os_string();
            name.push(".");
            name.push(ext);
            let with_ext = PathBuf::from(name);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        if candidate.is_dir() {
            let index = candidate.join("index.js");
            if index.is_file() {
                return Some(index);
            }
        }
        None
    }
}

impl Default for FsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for FsResolver {
    fn resolve(&self, specifier: &str, from: &Path) -> Result<PathBuf, ResolveError> {
        let candidate = if Path::new(specifier).is_absolute() {
            PathBuf::from(specifier)
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            let base = from.parent().unwrap_or_else(|| Path::new("."));
            base.join(specifier)
        } else {
            return Err(ResolveError::Unsupported {
                specifier: specifier.to_string(),
                from: from.to_path_buf(),
            });
        };

        match self.probe(&candidate) {
            Some(path) => Ok(normalize(&path)),
            None => Err(ResolveError::NotFound {
                specifier: specifier.to_string(),
                from: from.to_path_buf(),
            }),
        }
    }
}

/// Lexically normalize a path, collapsing `.` and `..` components.
///
/// Used instead of `fs::canonicalize` so module identities stay stable and
/// readable (no symlink expansion) while `a/./b` and `a/c/../b` still key
/// to the same module.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
