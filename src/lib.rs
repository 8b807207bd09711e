//! windscan - content scanning and on-demand utility CSS generation
//!
//! windscan provides:
//! - Glob-based content resolution with symlink-safe traversal
//! - Per-file-type text transforms and lossy candidate extraction
//! - A fingerprinted candidate cache for incremental rescans
//! - A catalog-driven rule compiler with deterministic output order
//! - An orchestrator that turns change notifications into rule diffs

pub mod cache;
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod core;
pub mod engine;
pub mod extract;
pub mod scanner;
pub mod transform;

pub use crate::config::Config;
pub use crate::engine::{CycleReport, Engine, Phase, ScanState, Trigger};
