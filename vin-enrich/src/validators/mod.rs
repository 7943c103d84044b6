//! Validation and scoring
//!
//! # Validators
//! 1. **vin_validator** - Structural VIN validation (runs before any I/O)
//! 2. **quality_scorer** - Completeness and enhancement success scoring

pub mod quality_scorer;
pub mod vin_validator;

pub use quality_scorer::{default_essential_fields, QualityScorer, DEFAULT_ESSENTIAL_FIELDS};
pub use vin_validator::{validate, VinCode, VinComponents, VIN_LENGTH};
