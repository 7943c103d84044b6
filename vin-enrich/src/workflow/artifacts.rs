//! Stage artifacts
//!
//! The three stages can run as separately scheduled units. Each hands its
//! output to the next as a JSON file:
//! - decode → `vin-basic-data.json` ([`BasicDecodeArtifact`])
//! - enhance → `vin-enhanced-data.json` ([`EnhancedDataArtifact`])
//! - finalize → `vin-complete-{VIN}-{YYYYmmdd_HHMMSS}.json` ([`VehicleReport`])
//!
//! The decode stage can also append a few `key=value` lines to a scheduler
//! outputs file so later jobs can branch on make and year without parsing
//! the artifact.

use crate::extractors::{ResponseSummary, PRIMARY_ENDPOINT};
use crate::types::{fields, EnhancementBundle, PrimaryDecodeRecord, VehicleReport};
use crate::validators::{VinCode, VinComponents};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use vin_common::files::{load_json, save_json};
use vin_common::Result;

/// Default file name of the decode stage output
pub const BASIC_DATA_FILE: &str = "vin-basic-data.json";

/// Default file name of the enhance stage output
pub const ENHANCED_DATA_FILE: &str = "vin-enhanced-data.json";

/// Source label for enhancement artifacts
pub const ENHANCEMENT_SOURCE: &str = "NHTSA vPIC Enhancement APIs";

/// Artifact A: primary decode output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicDecodeArtifact {
    pub vin: VinCode,
    pub decoded_at: DateTime<Utc>,
    pub source: String,
    pub vin_components: VinComponents,
    pub decoded_data: PrimaryDecodeRecord,
    pub raw_response: ResponseSummary,
}

impl BasicDecodeArtifact {
    pub fn new(
        vin: VinCode,
        decoded_at: DateTime<Utc>,
        decoded_data: PrimaryDecodeRecord,
        raw_response: ResponseSummary,
    ) -> Self {
        Self {
            vin_components: vin.components(),
            vin,
            decoded_at,
            source: format!("NHTSA vPIC {}", PRIMARY_ENDPOINT),
            decoded_data,
            raw_response,
        }
    }
}

/// Artifact B: enhancement output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDataArtifact {
    pub vin: VinCode,
    pub enhanced_at: DateTime<Utc>,
    pub source: String,
    pub enhanced_data: EnhancementBundle,
}

impl EnhancedDataArtifact {
    pub fn new(vin: VinCode, enhanced_at: DateTime<Utc>, enhanced_data: EnhancementBundle) -> Self {
        Self {
            vin,
            enhanced_at,
            source: ENHANCEMENT_SOURCE.to_string(),
            enhanced_data,
        }
    }
}

/// `vin-complete-{VIN}-{YYYYmmdd_HHMMSS}.json`
pub fn report_file_name(vin: &VinCode, generated_at: DateTime<Utc>) -> String {
    format!(
        "vin-complete-{}-{}.json",
        vin,
        vin_common::time::file_stamp(generated_at)
    )
}

/// Full report path inside `output_dir`
pub fn report_path(output_dir: &Path, report: &VehicleReport) -> Result<PathBuf> {
    let vin = crate::validators::validate(&report.metadata.vin)
        .map_err(|e| vin_common::Error::InvalidInput(e.to_string()))?;
    Ok(output_dir.join(report_file_name(&vin, report.metadata.generated_at)))
}

pub fn save_basic(artifact: &BasicDecodeArtifact, path: &Path) -> Result<()> {
    save_json(artifact, path)
}

pub fn load_basic(path: &Path) -> Result<BasicDecodeArtifact> {
    load_json(path)
}

pub fn save_enhanced(artifact: &EnhancedDataArtifact, path: &Path) -> Result<()> {
    save_json(artifact, path)
}

pub fn load_enhanced(path: &Path) -> Result<EnhancedDataArtifact> {
    load_json(path)
}

/// Write the report into `output_dir` under its canonical name
pub fn save_report(report: &VehicleReport, output_dir: &Path) -> Result<PathBuf> {
    let path = report_path(output_dir, report)?;
    save_json(report, &path)?;
    Ok(path)
}

/// Scheduler outputs for the decode stage; unknown values are empty
pub fn stage_outputs(basic: &BasicDecodeArtifact) -> Vec<(&'static str, String)> {
    let value = |field: &str| basic.decoded_data.get(field).unwrap_or("").to_string();
    vec![
        ("vin", basic.vin.to_string()),
        ("make", value(fields::MAKE)),
        ("model", value(fields::MODEL)),
        ("model_year", value(fields::MODEL_YEAR)),
        ("manufacturer", value(fields::MANUFACTURER)),
        ("plant_city", value(fields::PLANT_CITY)),
        ("plant_country", value(fields::PLANT_COUNTRY)),
    ]
}

/// Append `key=value` lines to a scheduler outputs file
///
/// Line breaks inside values are flattened to spaces so each output stays
/// on one line.
pub fn append_stage_outputs(path: &Path, outputs: &[(&str, String)]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    for (key, value) in outputs {
        let value = value.replace(['\r', '\n'], " ");
        writeln!(file, "{}={}", key, value)?;
    }

    debug!(path = %path.display(), count = outputs.len(), "Stage outputs appended");
    Ok(())
}
