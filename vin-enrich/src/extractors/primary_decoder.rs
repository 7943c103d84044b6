//! Primary Decoder
//!
//! Calls `DecodeVinValuesExtended` and flattens the single `Results` object
//! into a [`PrimaryDecodeRecord`].
//!
//! The registry reports "no data" as an empty string (and some fields as
//! `"Not Applicable"`). Both become `None` here, at the boundary, so scoring
//! and reporting never have to special-case them.
//!
//! A failed primary decode is fatal for the run: make, model and year seed
//! every later stage.

use crate::error::{PipelineError, PipelineResult};
use crate::services::RegistryClient;
use crate::types::PrimaryDecodeRecord;
use crate::validators::VinCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Registry endpoint used for the primary decode
pub const PRIMARY_ENDPOINT: &str = "DecodeVinValuesExtended";

/// Registry marker treated the same as an empty value
const NOT_APPLICABLE: &str = "Not Applicable";

/// Envelope fields of the decode response (everything except `Results`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub count: Option<u64>,
    pub message: Option<String>,
    pub search_criteria: Option<String>,
}

/// Primary Decoder
pub struct PrimaryDecoder {
    client: Arc<RegistryClient>,
}

impl PrimaryDecoder {
    pub fn new(client: Arc<RegistryClient>) -> Self {
        Self { client }
    }

    /// Decode a VIN into a normalized record
    ///
    /// # Errors
    /// `PrimaryDecode` when the call fails after all retries or the response
    /// carries no `Results` object.
    pub async fn decode(&self, vin: &VinCode) -> PipelineResult<PrimaryDecodeRecord> {
        self.decode_with_summary(vin).await.map(|(record, _)| record)
    }

    /// Decode a VIN, also returning the response envelope
    pub async fn decode_with_summary(
        &self,
        vin: &VinCode,
    ) -> PipelineResult<(PrimaryDecodeRecord, ResponseSummary)> {
        info!(vin = %vin, "Decoding VIN");

        let result = self
            .client
            .get_json(PRIMARY_ENDPOINT, &[PRIMARY_ENDPOINT, vin.as_str()], &[])
            .await;

        if !result.success {
            let reason = result
                .error
                .unwrap_or_else(|| "unknown registry failure".to_string());
            return Err(PipelineError::PrimaryDecode {
                vin: vin.to_string(),
                reason: format!("{} (after {} attempts)", reason, result.attempts),
            });
        }

        let payload = result.payload.unwrap_or(Value::Null);
        let (record, summary) = flatten_response(vin, &payload)?;

        if let Some(code) = record.get("ErrorCode") {
            if !code.starts_with('0') {
                warn!(
                    vin = %vin,
                    error_code = code,
                    error_text = record.get("ErrorText").unwrap_or(""),
                    "Registry reported decode issues"
                );
            }
        }

        info!(
            vin = %vin,
            make = record.make().unwrap_or("Unknown"),
            model = record.model().unwrap_or("Unknown"),
            model_year = record.get(crate::types::fields::MODEL_YEAR).unwrap_or("Unknown"),
            fields = record.len(),
            populated = record.present_count(),
            "Successfully decoded VIN"
        );

        Ok((record, summary))
    }
}

/// Flatten a `DecodeVinValuesExtended` payload
///
/// # Errors
/// `PrimaryDecode` when `Results` is missing, empty, or its first element is
/// not an object.
pub fn flatten_response(
    vin: &VinCode,
    payload: &Value,
) -> PipelineResult<(PrimaryDecodeRecord, ResponseSummary)> {
    let first = payload
        .get("Results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(Value::as_object)
        .ok_or_else(|| PipelineError::PrimaryDecode {
            vin: vin.to_string(),
            reason: "Invalid API response format: no Results object".to_string(),
        })?;

    let summary = ResponseSummary {
        count: payload.get("Count").and_then(Value::as_u64),
        message: payload
            .get("Message")
            .and_then(Value::as_str)
            .map(str::to_string),
        search_criteria: payload
            .get("SearchCriteria")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    Ok((normalize_fields(first), summary))
}

/// Normalize every field of a registry result object
pub fn normalize_fields(raw: &Map<String, Value>) -> PrimaryDecodeRecord {
    raw.iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect()
}

/// Normalize a single registry value: "unknown" becomes `None`
pub fn normalize_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == NOT_APPLICABLE {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::validate;
    use serde_json::json;

    fn vin() -> VinCode {
        validate("WP0AA29936S715303").unwrap()
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(&json!("")), None);
        assert_eq!(normalize_value(&json!("   ")), None);
        assert_eq!(normalize_value(&json!("Not Applicable")), None);
        assert_eq!(normalize_value(&Value::Null), None);
        assert_eq!(normalize_value(&json!(" PORSCHE ")), Some("PORSCHE".to_string()));
        assert_eq!(normalize_value(&json!(6)), Some("6".to_string()));
        assert_eq!(normalize_value(&json!(false)), Some("false".to_string()));
    }

    #[test]
    fn test_flatten_response() {
        let payload = json!({
            "Count": 1,
            "Message": "Results returned successfully",
            "SearchCriteria": "VIN:WP0AA29936S715303",
            "Results": [{
                "Make": "PORSCHE",
                "Model": "911",
                "ModelYear": "2006",
                "Trim": "",
                "Turbo": "Not Applicable",
                "ErrorCode": "0"
            }]
        });

        let (record, summary) = flatten_response(&vin(), &payload).unwrap();

        assert_eq!(record.len(), 6);
        assert_eq!(record.present_count(), 4);
        assert_eq!(record.make(), Some("PORSCHE"));
        assert_eq!(record.model_year(), Some(2006));
        assert_eq!(record.get("Trim"), None);
        assert_eq!(record.get("Turbo"), None);

        assert_eq!(summary.count, Some(1));
        assert_eq!(summary.message.as_deref(), Some("Results returned successfully"));
        assert_eq!(summary.search_criteria.as_deref(), Some("VIN:WP0AA29936S715303"));
    }

    #[test]
    fn test_flatten_rejects_missing_results() {
        for payload in [
            json!({"Count": 0}),
            json!({"Results": []}),
            json!({"Results": ["x"]}),
            Value::Null,
        ] {
            let err = flatten_response(&vin(), &payload).unwrap_err();
            match err {
                PipelineError::PrimaryDecode { vin: reported, reason } => {
                    assert_eq!(reported, "WP0AA29936S715303");
                    assert!(reason.contains("no Results object"), "{}", reason);
                }
                other => panic!("unexpected error for {}: {:?}", payload, other),
            }
        }
    }

    #[test]
    fn test_flatten_tolerates_missing_envelope() {
        let (record, summary) =
            flatten_response(&vin(), &json!({"Results": [{"Make": "HONDA"}]})).unwrap();
        assert_eq!(record.make(), Some("HONDA"));
        assert_eq!(summary, ResponseSummary::default());
    }
}
