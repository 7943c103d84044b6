//! Enrichment workflow
//!
//! Three scheduler-visible stages over JSON artifacts:
//! 1. Decode (validate + primary decode)
//! 2. Enhance (five supplementary endpoints)
//! 3. Finalize (quality score + consolidated report)

pub mod artifacts;
pub mod pipeline;
pub mod report_consolidator;

// Re-exports for convenience
pub use artifacts::{BasicDecodeArtifact, EnhancedDataArtifact, BASIC_DATA_FILE, ENHANCED_DATA_FILE};
pub use pipeline::{cancel_after, Pipeline, PipelineConfig, PipelineOutcome};
pub use report_consolidator::{api_success_rate, ReportConsolidator, DEFAULT_VINTAGE_AGE_THRESHOLD};
