//! Registry Extractors
//!
//! # Extractors
//! 1. **primary_decoder** - `DecodeVinValuesExtended` → flattened, normalized record
//! 2. **enhancement_collector** - Five supplementary endpoints → enhancement bundle
//!
//! # Failure Handling
//! The primary decode is the only fatal call. Enhancement endpoints report
//! failures through per-endpoint error isolation and never block each other.

pub mod enhancement_collector;
pub mod primary_decoder;

pub use enhancement_collector::{plan_request, EnhancementCollector, RequestPlan};
pub use primary_decoder::{
    flatten_response, normalize_value, PrimaryDecoder, ResponseSummary, PRIMARY_ENDPOINT,
};
