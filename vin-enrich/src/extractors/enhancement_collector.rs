//! Enhancement Collector
//!
//! Issues the five supplementary registry calls for a decoded VIN and
//! gathers them into an [`EnhancementBundle`].
//!
//! # Error Isolation
//! Each endpoint is independent: a failure is recorded in that endpoint's
//! entry and the remaining endpoints are still called. Nothing here is fatal.
//!
//! # Skipping
//! An endpoint whose path parameters cannot be resolved from the primary
//! record is recorded as *skipped*, which the scorer leaves out of the
//! success rate. `models_for_make_year` is skipped whenever make or model
//! year is null.
//!
//! # Cancellation
//! Calls run in a fixed sequence. When the stage's cancellation token fires,
//! the in-flight call is dropped (interrupting any spacing or backoff wait)
//! and every endpoint that would still have been requested is recorded as a
//! timed-out failure. Endpoints that plan to skip stay skipped. Results
//! gathered before that point are kept.

use crate::services::RegistryClient;
use crate::types::{
    fields, ApiCallResult, EnhancementBundle, EnhancementEndpoint, PrimaryDecodeRecord,
};
use crate::validators::VinCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How an endpoint will be requested for a given record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPlan {
    /// Path segments after the base URL, plus extra query parameters
    Call {
        segments: Vec<String>,
        params: Vec<(String, String)>,
    },
    /// Required inputs unavailable
    Skip(String),
}

/// Resolve request parameters for `endpoint` from the primary record
pub fn plan_request(
    endpoint: EnhancementEndpoint,
    record: &PrimaryDecodeRecord,
    vin: &VinCode,
) -> RequestPlan {
    let api = endpoint.api_name().to_string();
    let call = |segments: Vec<String>| RequestPlan::Call {
        segments,
        params: Vec::new(),
    };

    match endpoint {
        EnhancementEndpoint::ManufacturerDetails => {
            match record.manufacturer().or_else(|| record.make()) {
                Some(name) => call(vec![api, name.to_string()]),
                None => RequestPlan::Skip("Manufacturer and make unknown".to_string()),
            }
        }
        EnhancementEndpoint::WmiDecode => call(vec![api, vin.wmi().to_string()]),
        EnhancementEndpoint::ModelsForMakeYear => {
            match (record.make(), record.get(fields::MODEL_YEAR)) {
                (Some(make), Some(year)) => call(vec![
                    api,
                    "make".to_string(),
                    make.to_string(),
                    "modelyear".to_string(),
                    year.to_string(),
                ]),
                _ => RequestPlan::Skip(
                    "Make or model year missing from primary decode".to_string(),
                ),
            }
        }
        EnhancementEndpoint::EquipmentPlantCodes => {
            let year = record
                .get(fields::MODEL_YEAR)
                .map(str::to_string)
                .or_else(|| vin.decoded_model_year().map(|y| y.to_string()));
            match year {
                Some(year) => RequestPlan::Call {
                    segments: vec![api],
                    params: vec![("Year".to_string(), year)],
                },
                None => RequestPlan::Skip("Model year unknown".to_string()),
            }
        }
        EnhancementEndpoint::VehicleTypesForMake => {
            match record.make().or_else(|| record.manufacturer()) {
                Some(make) => call(vec![api, make.to_string()]),
                None => RequestPlan::Skip("Make unknown".to_string()),
            }
        }
    }
}

/// Enhancement Collector
pub struct EnhancementCollector {
    client: Arc<RegistryClient>,
}

impl EnhancementCollector {
    pub fn new(client: Arc<RegistryClient>) -> Self {
        Self { client }
    }

    /// Collect all five endpoints with no stage deadline
    pub async fn enhance(&self, record: &PrimaryDecodeRecord, vin: &VinCode) -> EnhancementBundle {
        self.enhance_until(record, vin, &CancellationToken::new()).await
    }

    /// Collect all five endpoints, stopping early when `cancel` fires
    ///
    /// Always returns a complete bundle (one entry per endpoint).
    pub async fn enhance_until(
        &self,
        record: &PrimaryDecodeRecord,
        vin: &VinCode,
        cancel: &CancellationToken,
    ) -> EnhancementBundle {
        info!(vin = %vin, "Enhancing VIN data");
        let mut bundle = EnhancementBundle::default();

        for endpoint in EnhancementEndpoint::ALL {
            let result = self.collect_one(endpoint, record, vin, cancel).await;

            if result.skipped {
                info!(
                    endpoint = %endpoint,
                    reason = result.error.as_deref().unwrap_or(""),
                    "Enhancement skipped"
                );
            } else if result.success {
                debug!(endpoint = %endpoint, attempts = result.attempts, "Enhancement collected");
            } else {
                warn!(
                    endpoint = %endpoint,
                    error = result.error.as_deref().unwrap_or(""),
                    "Enhancement failed"
                );
            }

            bundle.insert(endpoint, result);
        }

        info!(
            vin = %vin,
            successful = bundle.success_count(),
            attempted = bundle.attempted_count(),
            skipped = bundle.skipped_count(),
            "Enhanced with {}/{} API endpoints",
            bundle.success_count(),
            bundle.len()
        );

        bundle
    }

    async fn collect_one(
        &self,
        endpoint: EnhancementEndpoint,
        record: &PrimaryDecodeRecord,
        vin: &VinCode,
        cancel: &CancellationToken,
    ) -> ApiCallResult {
        let (segments, params) = match plan_request(endpoint, record, vin) {
            RequestPlan::Call { segments, params } => (segments, params),
            RequestPlan::Skip(reason) => return ApiCallResult::skipped(endpoint.key(), reason),
        };
        if cancel.is_cancelled() {
            return ApiCallResult::timed_out(endpoint.key());
        }
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(endpoint = %endpoint, "Stage timeout reached during enhancement call");
                ApiCallResult::timed_out(endpoint.key())
            }
            result = self.client.get_json(endpoint.key(), &segments, &params) => result,
        }
    }
}
