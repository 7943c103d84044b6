//! Report Consolidator
//!
//! Merges the primary record, enhancement bundle and quality score into the
//! final [`VehicleReport`] and derives recommendations from them.
//!
//! # Recommendations
//! - **data_completeness**: one entry per null essential field
//! - **vehicle_insights**: parts-availability note once the vehicle reaches
//!   the vintage age threshold
//! - **potential_issues**: one entry per failed (not skipped) endpoint
//!
//! The primary decode counts toward `api_success_rate`; it always succeeded
//! by the time a report is built.

use crate::types::{
    fields, DetailedData, EnhancementBundle, PrimaryDecodeRecord, ProcessingInformation,
    QualityScore, Recommendations, ReportMetadata, VehicleReport, VehicleSummary,
};
use crate::validators::{QualityScorer, VinCode};
use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, info};

/// Default vehicle age (years) for the parts-availability insight
pub const DEFAULT_VINTAGE_AGE_THRESHOLD: i32 = 15;

/// Report type recorded in metadata
pub const REPORT_TYPE: &str = "Complete VIN Analysis";

/// Data sources recorded in metadata
pub const DATA_SOURCES: [&str; 2] = [
    "NHTSA vPIC DecodeVinValuesExtended",
    "NHTSA vPIC Enhancement APIs",
];

/// Report Consolidator
#[derive(Debug, Clone)]
pub struct ReportConsolidator {
    scorer: QualityScorer,
    vintage_age_threshold: i32,
    workflow_version: String,
}

impl Default for ReportConsolidator {
    fn default() -> Self {
        Self::new(QualityScorer::new(), DEFAULT_VINTAGE_AGE_THRESHOLD)
    }
}

impl ReportConsolidator {
    /// Create consolidator
    ///
    /// `scorer` supplies the essential field checklist used for the
    /// completeness recommendations.
    pub fn new(scorer: QualityScorer, vintage_age_threshold: i32) -> Self {
        Self {
            scorer,
            vintage_age_threshold,
            workflow_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn vintage_age_threshold(&self) -> i32 {
        self.vintage_age_threshold
    }

    /// Build the consolidated report
    pub fn consolidate(
        &self,
        vin: &VinCode,
        record: &PrimaryDecodeRecord,
        bundle: &EnhancementBundle,
        score: QualityScore,
        generated_at: DateTime<Utc>,
    ) -> VehicleReport {
        let recommendations = self.recommendations(record, bundle, generated_at);

        let processing_information = ProcessingInformation {
            api_endpoints_used: bundle.iter().map(|(e, _)| e.key().to_string()).collect(),
            successful_api_calls: 1 + bundle.success_count(),
            attempted_api_calls: 1 + bundle.attempted_count(),
            skipped_api_calls: bundle.skipped_count(),
            api_success_rate: api_success_rate(bundle),
            data_quality_score: score,
            vin_components: vin.components(),
        };

        info!(
            vin = %vin,
            quality_score = score.overall,
            api_success_rate = %processing_information.api_success_rate,
            issues = recommendations.potential_issues.len(),
            "Consolidated vehicle report"
        );

        VehicleReport {
            metadata: ReportMetadata {
                vin: vin.to_string(),
                generated_at,
                report_type: REPORT_TYPE.to_string(),
                data_sources: DATA_SOURCES.iter().map(|s| s.to_string()).collect(),
                workflow_version: self.workflow_version.clone(),
            },
            vehicle_summary: summarize(vin, record),
            processing_information,
            detailed_data: DetailedData {
                basic_decode: record.clone(),
                enhanced_decode: bundle.clone(),
            },
            recommendations,
        }
    }

    fn recommendations(
        &self,
        record: &PrimaryDecodeRecord,
        bundle: &EnhancementBundle,
        generated_at: DateTime<Utc>,
    ) -> Recommendations {
        let mut recommendations = Recommendations::default();

        for field in self.scorer.missing_essential_fields(record) {
            recommendations.data_completeness.push(format!(
                "{} not available from primary decode - manual verification recommended",
                field
            ));
        }

        if let Some(age) = vehicle_age(record, generated_at) {
            debug!(age, threshold = self.vintage_age_threshold, "Vehicle age computed");
            if age >= self.vintage_age_threshold {
                recommendations.vehicle_insights.push(format!(
                    "Vehicle is {} years old - may have limited parts availability",
                    age
                ));
            }
        }

        for (endpoint, result) in bundle.failures() {
            recommendations.potential_issues.push(format!(
                "Enhancement data incomplete - {} failed: {}",
                endpoint,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }

        recommendations
    }
}

/// Age in whole calendar years at `generated_at`, when the model year is known
///
/// `None` when the model year is so far out of range that the age does not
/// fit in an `i32`.
pub fn vehicle_age(record: &PrimaryDecodeRecord, generated_at: DateTime<Utc>) -> Option<i32> {
    record
        .model_year()
        .and_then(|year| generated_at.year().checked_sub(year))
}

/// `(1 + successes) / (1 + attempted)` as a percentage with one decimal
///
/// The leading 1 is the primary decode.
pub fn api_success_rate(bundle: &EnhancementBundle) -> String {
    let successful = 1 + bundle.success_count();
    let attempted = 1 + bundle.attempted_count();
    format!("{:.1}%", successful as f64 / attempted as f64 * 100.0)
}

fn summarize(vin: &VinCode, record: &PrimaryDecodeRecord) -> VehicleSummary {
    let owned = |field: &str| record.get(field).map(str::to_string);

    VehicleSummary {
        vin: vin.to_string(),
        make: owned(fields::MAKE),
        model: owned(fields::MODEL),
        model_year: owned(fields::MODEL_YEAR),
        manufacturer: owned(fields::MANUFACTURER),
        body_class: owned(fields::BODY_CLASS),
        engine_cylinders: owned(fields::ENGINE_CYLINDERS),
        displacement_l: owned(fields::DISPLACEMENT_L),
        fuel_type: owned(fields::FUEL_TYPE_PRIMARY),
        plant_city: owned(fields::PLANT_CITY),
        plant_country: owned(fields::PLANT_COUNTRY),
        drive_type: owned(fields::DRIVE_TYPE),
    }
}
