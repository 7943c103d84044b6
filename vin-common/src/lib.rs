//! # VIN Enrichment Common Library
//!
//! Shared code for the VIN enrichment tools including:
//! - Error type shared by every crate in the workspace
//! - TOML configuration loading and config file discovery
//! - Atomic file writes for stage artifacts
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod files;
pub mod time;

pub use error::{Error, Result};
