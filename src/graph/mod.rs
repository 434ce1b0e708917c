//! Asset graph: module model, import scanning, and graph construction.
//!
//! # Overview
//!
//! The graph stage turns entry file paths into a directed dependency graph
//! of [`Module`]s:
//!
//! - **Scanning** finds import specifiers in a module's source
//! - **Resolution** maps specifiers to absolute paths via a [`crate::resolve::Resolver`]
//! - **Building** walks outward from the entries, collecting per-module
//!   failures and rejecting eager dependency cycles

pub mod builder;
pub mod module;
pub mod scan;

pub use builder::{CycleError, GraphBuild, GraphBuilder, ModuleGraph};
pub use module::{DepKind, DependencyRef, Module, ModuleKind, TransformedOutput};
pub use scan::{scan_refs, ScannedRef};
