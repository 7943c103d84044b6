//! Test Helper Utilities
//!
//! Shared utilities for testing vin-enrich

#![allow(dead_code)]

pub mod fixtures;
pub mod registry_stub;

// Re-export commonly used items
pub use fixtures::{enhancement_payload, honda_decode_payload, porsche_decode_payload};
pub use registry_stub::{Reply, StubRegistry};

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use vin_enrich::services::{ClockPacer, ManualClock, RegistryClient};
use vin_enrich::workflow::{Pipeline, PipelineConfig};

/// Base URL the stub registry answers for
pub const STUB_BASE: &str = "http://registry.test/api/vehicles";

/// Fixed start of the virtual timeline
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
}

/// Pipeline wired to `stub`, a manual clock, and 3 s clock-driven spacing
pub fn create_test_pipeline(stub: Arc<StubRegistry>) -> (Pipeline, Arc<ManualClock>) {
    create_test_pipeline_with(stub, PipelineConfig::default())
}

pub fn create_test_pipeline_with(
    stub: Arc<StubRegistry>,
    config: PipelineConfig,
) -> (Pipeline, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(test_start()));
    let pacer = Arc::new(ClockPacer::new(clock.clone(), Duration::from_secs(3)));
    let client = RegistryClient::new(STUB_BASE, stub, clock.clone(), pacer).unwrap();
    let pipeline = Pipeline::new(Arc::new(client), clock.clone(), config);
    (pipeline, clock)
}
