//! Quality Scorer
//!
//! Computes a 0-100 data quality score from the primary decode and the
//! enhancement bundle.
//!
//! # Scoring Algorithm
//! - **Basic completeness** (weight: 0.6): non-null essential fields divided
//!   by checklist size. An empty checklist scores 100.
//! - **Enhancement success rate** (weight: 0.4): successful calls divided by
//!   attempted (non-skipped) calls. When nothing was attempted the rate is
//!   100: a skipped call is "not applicable", not a failure.
//! - **Overall**: weighted sum, clamped to [0, 100], one decimal place.

use crate::types::{fields, EnhancementBundle, PrimaryDecodeRecord, QualityScore};
use tracing::debug;

/// Weight of basic completeness in the overall score
pub const BASIC_WEIGHT: f64 = 0.6;

/// Weight of enhancement success rate in the overall score
pub const ENHANCEMENT_WEIGHT: f64 = 0.4;

/// Default essential field checklist
pub const DEFAULT_ESSENTIAL_FIELDS: [&str; 10] = [
    fields::MAKE,
    fields::MODEL,
    fields::MODEL_YEAR,
    fields::BODY_CLASS,
    fields::ENGINE_CYLINDERS,
    fields::DISPLACEMENT_L,
    fields::FUEL_TYPE_PRIMARY,
    fields::PLANT_CITY,
    fields::PLANT_COUNTRY,
    fields::DRIVE_TYPE,
];

/// Default essential fields as owned strings (configuration default)
pub fn default_essential_fields() -> Vec<String> {
    DEFAULT_ESSENTIAL_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// Quality Scorer
#[derive(Debug, Clone)]
pub struct QualityScorer {
    essential_fields: Vec<String>,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityScorer {
    /// Create scorer with the default essential field checklist
    pub fn new() -> Self {
        Self::with_essential_fields(default_essential_fields())
    }

    /// Create scorer with a custom checklist
    pub fn with_essential_fields(essential_fields: Vec<String>) -> Self {
        Self { essential_fields }
    }

    pub fn essential_fields(&self) -> &[String] {
        &self.essential_fields
    }

    /// Essential fields that are null in the record, in checklist order
    pub fn missing_essential_fields<'a>(&'a self, record: &PrimaryDecodeRecord) -> Vec<&'a str> {
        self.essential_fields
            .iter()
            .filter(|f| !record.is_present(f))
            .map(String::as_str)
            .collect()
    }

    /// Percentage of essential fields present
    pub fn basic_completeness(&self, record: &PrimaryDecodeRecord) -> f64 {
        if self.essential_fields.is_empty() {
            return 100.0;
        }
        let present = self
            .essential_fields
            .iter()
            .filter(|f| record.is_present(f))
            .count();
        present as f64 / self.essential_fields.len() as f64 * 100.0
    }

    /// Percentage of attempted enhancement calls that succeeded
    pub fn enhancement_success_rate(&self, bundle: &EnhancementBundle) -> f64 {
        let attempted = bundle.attempted_count();
        if attempted == 0 {
            return 100.0;
        }
        bundle.success_count() as f64 / attempted as f64 * 100.0
    }

    /// Score a record and bundle
    pub fn score(&self, record: &PrimaryDecodeRecord, bundle: &EnhancementBundle) -> QualityScore {
        let basic_completeness = self.basic_completeness(record);
        let enhancement_success_rate = self.enhancement_success_rate(bundle);
        let overall = combine(basic_completeness, enhancement_success_rate);

        debug!(
            overall,
            basic = basic_completeness,
            enhancement = enhancement_success_rate,
            "Quality scoring complete"
        );

        QualityScore {
            overall,
            basic_completeness,
            enhancement_success_rate,
        }
    }
}

/// Weighted overall score, clamped to [0, 100] and rounded to one decimal
pub fn combine(basic_completeness: f64, enhancement_success_rate: f64) -> f64 {
    let raw = BASIC_WEIGHT * basic_completeness + ENHANCEMENT_WEIGHT * enhancement_success_rate;
    round_one_decimal(raw.clamp(0.0, 100.0))
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiCallResult, EnhancementEndpoint};
    use serde_json::json;

    fn full_record() -> PrimaryDecodeRecord {
        DEFAULT_ESSENTIAL_FIELDS
            .iter()
            .map(|f| (*f, Some("value")))
            .collect()
    }

    fn bundle_of(outcomes: &[(EnhancementEndpoint, &str)]) -> EnhancementBundle {
        let mut bundle = EnhancementBundle::default();
        for (endpoint, outcome) in outcomes {
            let result = match *outcome {
                "ok" => ApiCallResult::succeeded(endpoint.key(), "http://x", 200, json!({}), 1),
                "skip" => ApiCallResult::skipped(endpoint.key(), "missing input"),
                _ => ApiCallResult::failed(endpoint.key(), None, Some(500), "HTTP 500", 3),
            };
            bundle.insert(*endpoint, result);
        }
        bundle
    }

    fn all(outcome: &str) -> EnhancementBundle {
        let outcomes: Vec<_> = EnhancementEndpoint::ALL.iter().map(|e| (*e, outcome)).collect();
        bundle_of(&outcomes)
    }

    #[test]
    fn test_perfect_score() {
        let score = QualityScorer::new().score(&full_record(), &all("ok"));
        assert_eq!(score.basic_completeness, 100.0);
        assert_eq!(score.enhancement_success_rate, 100.0);
        assert_eq!(score.overall, 100.0);
    }

    #[test]
    fn test_empty_record_and_failed_bundle_scores_zero() {
        let score = QualityScorer::new().score(&PrimaryDecodeRecord::default(), &all("fail"));
        assert_eq!(score.basic_completeness, 0.0);
        assert_eq!(score.enhancement_success_rate, 0.0);
        assert_eq!(score.overall, 0.0);
    }

    #[test]
    fn test_all_skipped_counts_as_full_enhancement() {
        let scorer = QualityScorer::new();
        assert_eq!(scorer.enhancement_success_rate(&all("skip")), 100.0);
        assert_eq!(
            scorer.enhancement_success_rate(&EnhancementBundle::default()),
            100.0
        );
    }

    #[test]
    fn test_skipped_excluded_from_denominator() {
        use EnhancementEndpoint::*;
        let bundle = bundle_of(&[
            (ManufacturerDetails, "ok"),
            (WmiDecode, "ok"),
            (ModelsForMakeYear, "skip"),
            (EquipmentPlantCodes, "fail"),
            (VehicleTypesForMake, "fail"),
        ]);
        assert_eq!(QualityScorer::new().enhancement_success_rate(&bundle), 50.0);
    }

    #[test]
    fn test_basic_completeness_counts_nulls_as_missing() {
        let mut pairs: Vec<(&str, Option<&str>)> =
            DEFAULT_ESSENTIAL_FIELDS.iter().map(|f| (*f, Some("x"))).collect();
        pairs[3].1 = None;
        pairs[7].1 = None;
        let record: PrimaryDecodeRecord = pairs.into_iter().collect();

        let scorer = QualityScorer::new();
        assert_eq!(scorer.basic_completeness(&record), 80.0);
        assert_eq!(
            scorer.missing_essential_fields(&record),
            vec![fields::BODY_CLASS, fields::PLANT_CITY]
        );
    }

    #[test]
    fn test_non_essential_fields_ignored() {
        let record: PrimaryDecodeRecord = [("Trim", Some("Carrera")), ("Series", Some("997"))]
            .into_iter()
            .collect();
        assert_eq!(QualityScorer::new().basic_completeness(&record), 0.0);
    }

    #[test]
    fn test_basic_completeness_is_monotonic() {
        let scorer = QualityScorer::new();
        let mut pairs: Vec<(String, Option<String>)> = Vec::new();
        let mut previous = scorer.basic_completeness(&PrimaryDecodeRecord::default());

        for field in DEFAULT_ESSENTIAL_FIELDS {
            pairs.push((field.to_string(), Some("x".to_string())));
            let record: PrimaryDecodeRecord = pairs.clone().into_iter().collect();
            let current = scorer.basic_completeness(&record);
            assert!(current >= previous, "{} < {} after adding {}", current, previous, field);
            previous = current;
        }
        assert_eq!(previous, 100.0);
    }

    #[test]
    fn test_empty_checklist_scores_full() {
        let scorer = QualityScorer::with_essential_fields(vec![]);
        assert_eq!(scorer.basic_completeness(&PrimaryDecodeRecord::default()), 100.0);
    }

    #[test]
    fn test_custom_checklist() {
        let scorer =
            QualityScorer::with_essential_fields(vec!["Make".to_string(), "Trim".to_string()]);
        let record: PrimaryDecodeRecord = [("Make", Some("HONDA"))].into_iter().collect();
        assert_eq!(scorer.basic_completeness(&record), 50.0);
    }

    #[test]
    fn test_combine_formula_and_rounding() {
        assert_eq!(combine(80.0, 0.0), 48.0);
        assert_eq!(combine(100.0, 75.0), 90.0);
        // 0.6 * 70 + 0.4 * 66.666... = 68.666... → 68.7
        assert_eq!(combine(70.0, 200.0 / 3.0), 68.7);
        assert_eq!(combine(0.0, 100.0), 40.0);
    }

    #[test]
    fn test_combine_stays_in_range() {
        let samples = [0.0, 0.1, 33.3, 50.0, 66.7, 99.9, 100.0];
        for basic in samples {
            for enhancement in samples {
                let overall = combine(basic, enhancement);
                assert!((0.0..=100.0).contains(&overall));
                let expected = ((0.6 * basic + 0.4 * enhancement) * 10.0).round() / 10.0;
                assert_eq!(overall, expected);
            }
        }
    }
}
