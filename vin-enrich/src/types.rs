//! Core Types and Data Contracts for vin-enrich
//!
//! Each type is the explicit hand-off between two pipeline stages:
//! - HTTP Client Adapter → [`ApiCallResult`]
//! - Primary Decoder → [`PrimaryDecodeRecord`]
//! - Enhancement Collector → [`EnhancementBundle`]
//! - Quality Scorer → [`QualityScore`]
//! - Report Consolidator → [`VehicleReport`]
//!
//! All of them serialize to JSON so the stages can run as separately
//! scheduled units with artifacts passed between them.

use crate::validators::VinComponents;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Registry field names
// ============================================================================

/// Field names as returned by `DecodeVinValuesExtended`
pub mod fields {
    pub const MAKE: &str = "Make";
    pub const MODEL: &str = "Model";
    pub const MODEL_YEAR: &str = "ModelYear";
    pub const MANUFACTURER: &str = "Manufacturer";
    pub const BODY_CLASS: &str = "BodyClass";
    pub const ENGINE_CYLINDERS: &str = "EngineCylinders";
    pub const DISPLACEMENT_L: &str = "DisplacementL";
    pub const FUEL_TYPE_PRIMARY: &str = "FuelTypePrimary";
    pub const PLANT_CITY: &str = "PlantCity";
    pub const PLANT_COUNTRY: &str = "PlantCountry";
    pub const DRIVE_TYPE: &str = "DriveType";
}

// ============================================================================
// HTTP Client Adapter output
// ============================================================================

/// Outcome of one registry endpoint call (after retries)
///
/// Failures are data, not errors: callers inspect `success` / `skipped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallResult {
    /// Endpoint identity (e.g. "DecodeVinValuesExtended", "wmi_decode")
    pub endpoint: String,
    /// Request URL without query string (absent when no request was made)
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP status of the last response (absent on transport failure)
    pub http_status: Option<u16>,
    /// Parsed JSON payload on success
    pub payload: Option<Value>,
    pub success: bool,
    /// Call intentionally not made (required inputs unavailable)
    #[serde(default)]
    pub skipped: bool,
    pub error: Option<String>,
    /// Requests actually sent
    pub attempts: u32,
}

impl ApiCallResult {
    pub fn succeeded(
        endpoint: impl Into<String>,
        url: impl Into<String>,
        http_status: u16,
        payload: Value,
        attempts: u32,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            url: Some(url.into()),
            http_status: Some(http_status),
            payload: Some(payload),
            success: true,
            skipped: false,
            error: None,
            attempts,
        }
    }

    pub fn failed(
        endpoint: impl Into<String>,
        url: Option<String>,
        http_status: Option<u16>,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            url,
            http_status,
            payload: None,
            success: false,
            skipped: false,
            error: Some(error.into()),
            attempts,
        }
    }

    /// Non-error result for a call that was never attempted
    pub fn skipped(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            url: None,
            http_status: None,
            payload: None,
            success: false,
            skipped: true,
            error: Some(reason.into()),
            attempts: 0,
        }
    }

    /// Failed result for a call cut off by the stage timeout
    pub fn timed_out(endpoint: impl Into<String>) -> Self {
        Self::failed(
            endpoint,
            None,
            None,
            "Stage timeout reached before the call completed",
            0,
        )
    }

    /// True when the call was attempted (counted in success rates)
    pub fn is_attempted(&self) -> bool {
        !self.skipped
    }

    /// True for an attempted call that did not succeed
    pub fn is_failure(&self) -> bool {
        !self.success && !self.skipped
    }
}

// ============================================================================
// Primary Decoder output
// ============================================================================

/// Flattened registry attributes for one VIN
///
/// Values are already normalized: "unknown" is `None`, never an empty
/// string. Keys keep the registry's spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryDecodeRecord {
    fields: BTreeMap<String, Option<String>>,
}

impl PrimaryDecodeRecord {
    pub fn new(fields: BTreeMap<String, Option<String>>) -> Self {
        Self { fields }
    }

    /// Non-null value of a field
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_deref())
    }

    pub fn is_present(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Number of attributes (null or not)
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of non-null attributes
    pub fn present_count(&self) -> usize {
        self.fields.values().filter(|v| v.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn make(&self) -> Option<&str> {
        self.get(fields::MAKE)
    }

    pub fn model(&self) -> Option<&str> {
        self.get(fields::MODEL)
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.get(fields::MANUFACTURER)
    }

    /// Model year as a number, if present and numeric
    pub fn model_year(&self) -> Option<i32> {
        self.get(fields::MODEL_YEAR)?.trim().parse().ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for PrimaryDecodeRecord {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        }
    }
}

// ============================================================================
// Enhancement Collector output
// ============================================================================

/// The five supplementary registry endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementEndpoint {
    ManufacturerDetails,
    WmiDecode,
    ModelsForMakeYear,
    EquipmentPlantCodes,
    VehicleTypesForMake,
}

impl EnhancementEndpoint {
    /// Call order used by the collector
    pub const ALL: [EnhancementEndpoint; 5] = [
        Self::ManufacturerDetails,
        Self::WmiDecode,
        Self::ModelsForMakeYear,
        Self::EquipmentPlantCodes,
        Self::VehicleTypesForMake,
    ];

    /// Bundle key (matches the serialized form)
    pub fn key(self) -> &'static str {
        match self {
            Self::ManufacturerDetails => "manufacturer_details",
            Self::WmiDecode => "wmi_decode",
            Self::ModelsForMakeYear => "models_for_make_year",
            Self::EquipmentPlantCodes => "equipment_plant_codes",
            Self::VehicleTypesForMake => "vehicle_types_for_make",
        }
    }

    /// Registry API path name
    pub fn api_name(self) -> &'static str {
        match self {
            Self::ManufacturerDetails => "GetManufacturerDetails",
            Self::WmiDecode => "DecodeWMI",
            Self::ModelsForMakeYear => "GetModelsForMakeYear",
            Self::EquipmentPlantCodes => "GetEquipmentPlantCodes",
            Self::VehicleTypesForMake => "GetVehicleTypesForMake",
        }
    }
}

impl fmt::Display for EnhancementEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Enhancement results keyed by endpoint
///
/// A complete bundle has exactly one entry per [`EnhancementEndpoint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnhancementBundle {
    results: BTreeMap<EnhancementEndpoint, ApiCallResult>,
}

impl EnhancementBundle {
    pub fn insert(&mut self, endpoint: EnhancementEndpoint, result: ApiCallResult) {
        self.results.insert(endpoint, result);
    }

    pub fn get(&self, endpoint: EnhancementEndpoint) -> Option<&ApiCallResult> {
        self.results.get(&endpoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnhancementEndpoint, &ApiCallResult)> {
        self.results.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when every endpoint has a result
    pub fn is_complete(&self) -> bool {
        EnhancementEndpoint::ALL
            .iter()
            .all(|e| self.results.contains_key(e))
    }

    pub fn success_count(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    /// Entries that were not skipped
    pub fn attempted_count(&self) -> usize {
        self.results.values().filter(|r| r.is_attempted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.values().filter(|r| r.skipped).count()
    }

    /// Attempted entries that did not succeed, in endpoint order
    pub fn failures(&self) -> impl Iterator<Item = (EnhancementEndpoint, &ApiCallResult)> {
        self.iter().filter(|(_, r)| r.is_failure())
    }
}

// ============================================================================
// Quality Scorer output
// ============================================================================

/// Data quality score, all components on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// 0.6 × basic + 0.4 × enhancement, one decimal place
    pub overall: f64,
    pub basic_completeness: f64,
    pub enhancement_success_rate: f64,
}

// ============================================================================
// Report Consolidator output
// ============================================================================

/// Final consolidated report for one VIN
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleReport {
    pub metadata: ReportMetadata,
    pub vehicle_summary: VehicleSummary,
    pub processing_information: ProcessingInformation,
    pub detailed_data: DetailedData,
    pub recommendations: Recommendations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub vin: String,
    pub generated_at: DateTime<Utc>,
    pub report_type: String,
    pub data_sources: Vec<String>,
    pub workflow_version: String,
}

/// Human-relevant subset of the primary decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSummary {
    pub vin: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub model_year: Option<String>,
    pub manufacturer: Option<String>,
    pub body_class: Option<String>,
    pub engine_cylinders: Option<String>,
    pub displacement_l: Option<String>,
    pub fuel_type: Option<String>,
    pub plant_city: Option<String>,
    pub plant_country: Option<String>,
    pub drive_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInformation {
    /// Enhancement endpoint keys present in the bundle
    pub api_endpoints_used: Vec<String>,
    /// Successful calls including the primary decode
    pub successful_api_calls: usize,
    /// Attempted calls including the primary decode
    pub attempted_api_calls: usize,
    pub skipped_api_calls: usize,
    /// e.g. "83.3%"
    pub api_success_rate: String,
    pub data_quality_score: QualityScore,
    pub vin_components: VinComponents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedData {
    pub basic_decode: PrimaryDecodeRecord,
    pub enhanced_decode: EnhancementBundle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub data_completeness: Vec<String>,
    pub vehicle_insights: Vec<String>,
    pub potential_issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_accessors() {
        let record: PrimaryDecodeRecord = [
            ("Make", Some("PORSCHE")),
            ("Model", Some("911")),
            ("ModelYear", Some("2006")),
            ("Trim", None),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.make(), Some("PORSCHE"));
        assert_eq!(record.model(), Some("911"));
        assert_eq!(record.model_year(), Some(2006));
        assert_eq!(record.get("Trim"), None);
        assert!(!record.is_present("Trim"));
        assert_eq!(record.len(), 4);
        assert_eq!(record.present_count(), 3);
    }

    #[test]
    fn test_non_numeric_model_year() {
        let record: PrimaryDecodeRecord = [("ModelYear", Some("unknown"))].into_iter().collect();
        assert_eq!(record.model_year(), None);
    }

    #[test]
    fn test_record_serializes_as_flat_map() {
        let record: PrimaryDecodeRecord = [("Make", Some("HONDA")), ("Series", None::<&str>)]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"Make": "HONDA", "Series": null})
        );
    }

    #[test]
    fn test_endpoint_keys_match_serde() {
        for endpoint in EnhancementEndpoint::ALL {
            assert_eq!(
                serde_json::to_value(endpoint).unwrap(),
                json!(endpoint.key())
            );
        }
    }

    #[test]
    fn test_bundle_counts() {
        let mut bundle = EnhancementBundle::default();
        bundle.insert(
            EnhancementEndpoint::WmiDecode,
            ApiCallResult::succeeded("wmi_decode", "http://x/DecodeWMI/WP0", 200, json!({}), 1),
        );
        bundle.insert(
            EnhancementEndpoint::ModelsForMakeYear,
            ApiCallResult::skipped("models_for_make_year", "make unknown"),
        );
        bundle.insert(
            EnhancementEndpoint::VehicleTypesForMake,
            ApiCallResult::failed("vehicle_types_for_make", None, Some(500), "HTTP 500", 3),
        );

        assert_eq!(bundle.len(), 3);
        assert!(!bundle.is_complete());
        assert_eq!(bundle.success_count(), 1);
        assert_eq!(bundle.attempted_count(), 2);
        assert_eq!(bundle.skipped_count(), 1);

        let failures: Vec<_> = bundle.failures().map(|(e, _)| e).collect();
        assert_eq!(failures, vec![EnhancementEndpoint::VehicleTypesForMake]);
    }

    #[test]
    fn test_bundle_serializes_keyed_by_endpoint() {
        let mut bundle = EnhancementBundle::default();
        bundle.insert(
            EnhancementEndpoint::ManufacturerDetails,
            ApiCallResult::skipped("manufacturer_details", "no manufacturer"),
        );
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["manufacturer_details"]["skipped"], json!(true));

        let back: EnhancementBundle = serde_json::from_value(value).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn test_timed_out_is_attempted_failure() {
        let result = ApiCallResult::timed_out("wmi_decode");
        assert!(result.is_attempted());
        assert!(result.is_failure());
        assert!(result.error.unwrap().contains("timeout"));
    }
}
