//! Error types for vin-enrich
//!
//! Only two conditions stop a pipeline run: a malformed VIN (before any I/O)
//! and a failed primary decode. Every per-endpoint failure is converted into
//! an `ApiCallResult` and never surfaces here.

use thiserror::Error;

/// Structural VIN validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// VIN is not exactly 17 characters
    #[error("VIN must be exactly 17 characters, got {length}")]
    InvalidLength { length: usize },

    /// VIN contains a character outside `[A-HJ-NPR-Z0-9]`
    #[error("VIN contains invalid character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// VIN rejected before the pipeline started
    #[error("Invalid VIN: {0}")]
    Validation(#[from] ValidationError),

    /// Primary decode failed; nothing downstream can run
    #[error("Primary decode failed for VIN {vin}: {reason}")]
    PrimaryDecode { vin: String, reason: String },

    /// Stage inputs do not belong together (e.g. artifacts for different VINs)
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// vin-common error (artifact I/O, configuration)
    #[error(transparent)]
    Common(#[from] vin_common::Error),
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;
