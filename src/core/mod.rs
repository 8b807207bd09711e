//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Domain model (file records, rules, warnings, change events)
//! - Error taxonomy
//! - Rendering of rules as CSS and of data as jsonl/json/md
//! - Path normalization and hashing utilities
//! - Bounded file reading

pub mod error;
pub mod file_reader;
pub mod model;
pub mod paths;
pub mod render;
pub mod util;
