//! vin-enrich library interface
//!
//! Enriches a single VIN into a consolidated vehicle report using the NHTSA
//! vPIC registry. Exposes public APIs for the binary and integration tests.

pub mod config;
pub mod error;
pub mod extractors;
pub mod services;
pub mod types;
pub mod validators;
pub mod workflow;

pub use crate::error::{PipelineError, PipelineResult, ValidationError};
