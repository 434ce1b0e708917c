//! Static asset copying.
//!
//! Copy patterns move files that are not part of the module graph
//! (favicons, robots.txt, font directories) into the output tree
//! verbatim. A pattern may be marked optional, in which case a missing
//! source is skipped instead of failing the build.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error applying a copy pattern.
#[derive(Debug, Error)]
pub enum CopyError {
    /// A required source path does not exist
    #[error("copy source not found: {}", path.display())]
    SourceMissing {
        /// The missing path
        path: PathBuf,
    },
    /// Filesystem error during the copy
    #[error("cannot copy {} to {}: {source}", from.display(), to.display())]
    Io {
        /// Source path
        from: PathBuf,
        /// Destination path
        to: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// One configured copy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPattern {
    /// Source file or directory, relative to the project root
    pub from: PathBuf,
    /// Destination relative to the output directory; defaults to `from`'s
    /// file name at the output root
    #[serde(default)]
    pub to: Option<PathBuf>,
    /// Whether a missing source fails the build
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Apply the copy patterns, returning the files written.
pub fn copy_assets(
    patterns: &[CopyPattern],
    project_root: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, CopyError> {
    let mut written = Vec::new();
    for pattern in patterns {
        let from = project_root.join(&pattern.from);
        if !from.exists() {
            if pattern.required {
                return Err(CopyError::SourceMissing { path: from });
            }
            continue;
        }

        let to = match &pattern.to {
            Some(to) => out_dir.join(to),
            None => match from.file_name() {
                Some(name) => out_dir.join(name),
                None => out_dir.to_path_buf(),
            },
        };
        copy_recursive(&from, &to, &mut written)?;
    }
    Ok(written)
}

fn copy_recursive(from: &Path, to: &Path, written: &mut Vec<PathBuf>) -> Result<(), CopyError> {
    let io_err = |e: std::io::Error| CopyError::Io {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    if from.is_dir() {
        fs::create_dir_all(to).map_err(io_err)?;
        for entry in fs::read_dir(from).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()), written)?;
        }
        return Ok(());
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::copy(from, to).map_err(io_err)?;
    written.push(to.to_path_buf());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pattern(from: &str, to: Option<&str>, required: bool) -> CopyPattern {
        CopyPattern { from: PathBuf::from(from), to: to.map(PathBuf::from), required }
    }

    #[test]
    fn test_copy_single_file() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(root.path().join("favicon.ico"), b"icon").unwrap();

        let written =
            copy_assets(&[pattern("favicon.ico", None, true)], root.path(), out.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(fs::read(out.path().join("favicon.ico")).unwrap(), b"icon");
    }

    #[test]
    fn test_copy_directory_recursive() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("static/fonts")).unwrap();
        fs::write(root.path().join("static/robots.txt"), b"ok").unwrap();
        fs::write(root.path().join("static/fonts/a.woff2"), b"f").unwrap();

        let written =
            copy_assets(&[pattern("static", Some("."), true)], root.path(), out.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(out.path().join("robots.txt").is_file());
        assert!(out.path().join("fonts/a.woff2").is_file());
    }

    #[test]
    fn test_required_missing_fails() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let err =
            copy_assets(&[pattern("absent.txt", None, true)], root.path(), out.path()).unwrap_err();
        assert!(matches!(err, CopyError::SourceMissing { .. }));
        assert!(err.to_string().contains("absent.txt"));
    }

    #[test]
    fn test_optional_missing_is_skipped() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let written =
            copy_assets(&[pattern("absent.txt", None, false)], root.path(), out.path()).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_explicit_destination() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(root.path().join("notes.txt"), b"n").unwrap();

        copy_assets(&[pattern("notes.txt", Some("docs/notes.txt"), true)], root.path(), out.path())
            .unwrap();
        assert!(out.path().join("docs/notes.txt").is_file());
    }
}
