//! Bindle - Library for bundling web assets
//!
//! This library provides functionality to:
//! - Build a dependency graph from entry scripts, styles, and markup
//! - Transform modules in parallel and plan them into output chunks
//! - Emit content-hashed files atomically with an asset manifest
//! - Watch a project and rebuild only what a change invalidates

pub mod assets;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod emit;
pub mod graph;
pub mod html;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod sourcemap;
pub mod transform;
pub mod watch;
