//! Pipeline Orchestrator
//!
//! Wires the validator, decoder, collector, scorer and consolidator into the
//! three scheduler-visible stages.
//!
//! # Stages
//! - **decode**: validate + primary decode → [`BasicDecodeArtifact`]
//! - **enhance**: five enhancement calls → [`EnhancedDataArtifact`]
//! - **finalize**: score + consolidate → [`VehicleReport`]
//!
//! [`Pipeline::run`] executes all three in one process. Each stage consumes
//! only the previous stage's artifact, so the stages can equally be run by
//! an external scheduler with files in between.
//!
//! # Error Handling
//! - Invalid VIN: rejected before any network call
//! - Primary decode failure: fatal
//! - Enhancement failures: recorded per endpoint, the report is still built
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(client, clock, PipelineConfig::default());
//! let outcome = pipeline.run("WP0AA29936S715303", &CancellationToken::new()).await?;
//! ```

use crate::error::{PipelineError, PipelineResult};
use crate::extractors::{EnhancementCollector, PrimaryDecoder};
use crate::services::{Clock, RegistryClient};
use crate::types::VehicleReport;
use crate::validators::{default_essential_fields, validate, QualityScorer};
use crate::workflow::artifacts::{BasicDecodeArtifact, EnhancedDataArtifact};
use crate::workflow::report_consolidator::{ReportConsolidator, DEFAULT_VINTAGE_AGE_THRESHOLD};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Registry field names counted for basic completeness
    pub essential_fields: Vec<String>,
    /// Vehicle age (years) for the parts-availability insight
    pub vintage_age_threshold: i32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            essential_fields: default_essential_fields(),
            vintage_age_threshold: DEFAULT_VINTAGE_AGE_THRESHOLD,
        }
    }
}

/// Output of a full in-process run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub basic: BasicDecodeArtifact,
    pub enhanced: EnhancedDataArtifact,
    pub report: VehicleReport,
}

/// Pipeline orchestrator
pub struct Pipeline {
    decoder: PrimaryDecoder,
    collector: EnhancementCollector,
    scorer: QualityScorer,
    consolidator: ReportConsolidator,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Create pipeline
    ///
    /// `clock` stamps the artifacts and the report; pass the same clock the
    /// client uses so tests see one consistent timeline.
    pub fn new(client: Arc<RegistryClient>, clock: Arc<dyn Clock>, config: PipelineConfig) -> Self {
        let scorer = QualityScorer::with_essential_fields(config.essential_fields);
        Self {
            decoder: PrimaryDecoder::new(client.clone()),
            collector: EnhancementCollector::new(client),
            consolidator: ReportConsolidator::new(scorer.clone(), config.vintage_age_threshold),
            scorer,
            clock,
        }
    }

    /// Stage 1: validate and decode
    ///
    /// # Errors
    /// - `Validation` before any network call
    /// - `PrimaryDecode` when the decode fails or the stage budget runs out
    pub async fn decode_stage(
        &self,
        raw_vin: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<BasicDecodeArtifact> {
        let vin = validate(raw_vin)?;

        let (record, summary) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PipelineError::PrimaryDecode {
                    vin: vin.to_string(),
                    reason: "Stage timeout reached before the decode completed".to_string(),
                });
            }
            decoded = self.decoder.decode_with_summary(&vin) => decoded?,
        };

        Ok(BasicDecodeArtifact::new(vin, self.clock.now(), record, summary))
    }

    /// Stage 2: collect enhancements
    ///
    /// Never fails; a cancelled stage returns whatever was gathered with the
    /// rest marked as timed out.
    pub async fn enhance_stage(
        &self,
        basic: &BasicDecodeArtifact,
        cancel: &CancellationToken,
    ) -> EnhancedDataArtifact {
        let bundle = self
            .collector
            .enhance_until(&basic.decoded_data, &basic.vin, cancel)
            .await;
        EnhancedDataArtifact::new(basic.vin.clone(), self.clock.now(), bundle)
    }

    /// Stage 3: score and consolidate
    ///
    /// # Errors
    /// `ArtifactMismatch` when the two artifacts describe different VINs
    pub fn finalize_stage(
        &self,
        basic: &BasicDecodeArtifact,
        enhanced: &EnhancedDataArtifact,
    ) -> PipelineResult<VehicleReport> {
        if basic.vin != enhanced.vin {
            return Err(PipelineError::ArtifactMismatch(format!(
                "basic data is for {} but enhanced data is for {}",
                basic.vin, enhanced.vin
            )));
        }

        if !enhanced.enhanced_data.is_complete() {
            warn!(
                vin = %basic.vin,
                entries = enhanced.enhanced_data.len(),
                "Enhanced data does not cover every endpoint"
            );
        }

        let score = self.scorer.score(&basic.decoded_data, &enhanced.enhanced_data);
        Ok(self.consolidator.consolidate(
            &basic.vin,
            &basic.decoded_data,
            &enhanced.enhanced_data,
            score,
            self.clock.now(),
        ))
    }

    /// All three stages in one process, sharing one cancellation budget
    pub async fn run(
        &self,
        raw_vin: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<PipelineOutcome> {
        info!(vin = raw_vin, "Starting VIN enrichment");

        let basic = self.decode_stage(raw_vin, cancel).await?;
        let enhanced = self.enhance_stage(&basic, cancel).await;
        let report = self.finalize_stage(&basic, &enhanced)?;

        info!(
            vin = %basic.vin,
            quality_score = report.processing_information.data_quality_score.overall,
            api_success_rate = %report.processing_information.api_success_rate,
            "VIN enrichment complete"
        );

        Ok(PipelineOutcome {
            basic,
            enhanced,
            report,
        })
    }
}

/// Token that cancels itself after `timeout` (never, when `None`)
///
/// Must be called inside a tokio runtime when a timeout is given.
pub fn cancel_after(timeout: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();

    if let Some(timeout) = timeout {
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    warn!(timeout_secs = timeout.as_secs(), "Stage timeout reached, cancelling");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
    }

    token
}
