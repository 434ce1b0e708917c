//! Configuration schema types for `bindle.toml`
//!
//! Defines the structure and validation rules for bindle project
//! configuration. Everything is optional except the project name; defaults
//! produce a conventional `src/` to `dist/` layout with a single `main.js`
//! entry.

use crate::assets::CopyPattern;
use crate::chunk::SplitPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Build mode; selects transform rules and output naming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Readable output, stable filenames, source maps
    #[default]
    Development,
    /// Minified output with content-hashed filenames
    Production,
}

impl Mode {
    /// Whether this is a production build
    pub fn is_production(&self) -> bool {
        *self == Mode::Production
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => {
                Err(format!("unknown mode '{other}' (expected 'development' or 'production')"))
            }
        }
    }
}

/// Top-level configuration parsed from `bindle.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BindleConfig {
    /// Project identity and directory layout
    pub project: ProjectConfig,
    /// Build inputs and output naming
    #[serde(default)]
    pub build: BuildSection,
    /// Chunk splitting
    #[serde(default)]
    pub split: SplitSection,
    /// Watch mode tuning
    #[serde(default)]
    pub watch: WatchSection,
    /// Static copy patterns, applied after emission
    #[serde(default)]
    pub copy: Vec<CopyPattern>,
}

impl BindleConfig {
    /// Validate the configuration, returning all problems found
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.project.name.trim().is_empty() {
            problems.push("project.name must not be empty".to_string());
        }
        if self.build.entry.is_empty() {
            problems.push("build.entry must list at least one entry file".to_string());
        }
        if !(4..=32).contains(&self.build.hash_length) {
            problems.push(format!(
                "build.hash_length must be between 4 and 32, got {}",
                self.build.hash_length
            ));
        }
        if self.watch.debounce_ms == 0 {
            problems.push("watch.debounce_ms must be greater than zero".to_string());
        }

        problems
    }
}

/// The `[project]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name, used in console output
    pub name: String,
    /// Optional version string
    #[serde(default)]
    pub version: Option<String>,
    /// Source directory, relative to the project root
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Output directory, relative to the project root
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: String::new(), version: None, src: default_src(), out: default_out() }
    }
}

/// The `[build]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Entry files, relative to the source directory
    #[serde(default = "default_entry")]
    pub entry: Vec<PathBuf>,
    /// Build mode
    #[serde(default)]
    pub mode: Mode,
    /// Hex digits of content hash in production filenames
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,
    /// Remove the output directory before a full build
    #[serde(default = "default_clean")]
    pub clean: bool,
    /// Optional HTML template, relative to the project root
    #[serde(default)]
    pub template: Option<PathBuf>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            mode: Mode::default(),
            hash_length: default_hash_length(),
            clean: default_clean(),
            template: None,
        }
    }
}

/// The `[split]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SplitSection {
    /// Placement of modules shared between entries
    #[serde(default)]
    pub policy: SplitPolicy,
}

/// The `[watch]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Quiet window after a change before a rebuild starts, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Clear the terminal before each rebuild report
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: default_clear_screen() }
    }
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("dist")
}

fn default_entry() -> Vec<PathBuf> {
    vec![PathBuf::from("main.js")]
}

fn default_hash_length() -> usize {
    8
}

fn default_clean() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_clear_screen() -> bool {
    true
}
