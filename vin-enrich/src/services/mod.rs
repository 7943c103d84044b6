//! Registry access services
//!
//! - `http_client`: retrying HTTP client adapter (the only network dependency)
//! - `pacing`: clock and request-spacing seams

pub mod http_client;
pub mod pacing;

pub use http_client::{
    classify_status, HttpResponse, RegistryClient, ReqwestTransport, RetryPolicy, StatusClass,
    Transport, TransportError, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT,
};
pub use pacing::{CallPacer, Clock, ClockPacer, GovernorPacer, ManualClock, NoPacing, TokioClock};
