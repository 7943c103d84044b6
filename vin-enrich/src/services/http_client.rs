//! Registry HTTP Client Adapter
//!
//! Issues GET requests to the NHTSA vPIC registry with request spacing,
//! retry/backoff and per-request timeouts. The adapter never returns an
//! error: every outcome, including exhausted retries, comes back as an
//! [`ApiCallResult`].
//!
//! # Retry Policy
//! - Up to `max_attempts` requests (default 3)
//! - Retryable: transport failures (connect, timeout) and HTTP 429/5xx
//! - Not retried: other 4xx and 2xx bodies that are not JSON
//! - Backoff between attempts: `base_backoff` doubling per retry, capped at
//!   `max_backoff`
//!
//! Spacing (the registry's rate-limit guidance) is applied before *every*
//! request start. A retry waits the full backoff and then a full spacing
//! period; the two delays add up rather than overlap.
//!
//! API Documentation: https://vpic.nhtsa.dot.gov/api/

use crate::services::pacing::{CallPacer, Clock, GovernorPacer, TokioClock};
use crate::types::ApiCallResult;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use vin_common::{Error, Result};

/// Default registry base URL
pub const DEFAULT_API_BASE: &str = "https://vpic.nhtsa.dot.gov/api/vehicles";

/// Default timeout for a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw HTTP response as seen by the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure (no HTTP response received)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Other(String),
}

/// Network seam: one GET request, no retries
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(HttpResponse { status, body })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(3),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given (1-based) failed attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Permanent,
}

pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        429 | 500..=599 => StatusClass::Retryable,
        _ => StatusClass::Permanent,
    }
}

fn describe_status(status: u16) -> String {
    match StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("HTTP {} {}", status, reason),
        None => format!("HTTP {}", status),
    }
}

/// Registry client
///
/// Cheap to share behind an `Arc`; one instance serves every stage of a run
/// so the pacer sees all requests to the host.
pub struct RegistryClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    pacer: Arc<dyn CallPacer>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl RegistryClient {
    /// Create a client with default retry policy and request timeout
    ///
    /// # Errors
    /// `Config` when `base_url` is not an absolute http(s) URL
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        pacer: Arc<dyn CallPacer>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            transport,
            clock,
            pacer,
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Production client: reqwest transport, tokio clock, governor spacing
    pub fn production(base_url: &str, spacing: Duration) -> Result<Self> {
        let user_agent = format!("vin-enrich/{}", env!("CARGO_PKG_VERSION"));
        Self::new(
            base_url,
            Arc::new(ReqwestTransport::new(&user_agent)?),
            Arc::new(TokioClock),
            Arc::new(GovernorPacer::new(spacing)),
        )
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Build `{base}/{segment}/{segment}...`, percent-encoding each segment
    pub fn endpoint_url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    /// GET a registry endpoint with `format=json` and the default timeout
    pub async fn get_json(
        &self,
        endpoint: &str,
        segments: &[&str],
        extra_params: &[(String, String)],
    ) -> ApiCallResult {
        let url = self.endpoint_url(segments);
        let mut params = extra_params.to_vec();
        params.push(("format".to_string(), "json".to_string()));
        self.call(endpoint, &url, &params, self.request_timeout).await
    }

    /// Issue a GET with spacing, retry and backoff
    ///
    /// Dropping the returned future cancels any pending spacing or backoff
    /// wait, which is how a stage timeout interrupts a call.
    pub async fn call(
        &self,
        endpoint: &str,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> ApiCallResult {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_status = None;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            self.pacer.until_ready().await;

            debug!(endpoint, attempt, url, "Requesting registry endpoint");

            match self.transport.get(url, params, timeout).await {
                Ok(response) => {
                    last_status = Some(response.status);

                    match classify_status(response.status) {
                        StatusClass::Success => {
                            return match serde_json::from_str::<Value>(&response.body) {
                                Ok(payload) => {
                                    info!(
                                        endpoint,
                                        attempt,
                                        status = response.status,
                                        "Registry call successful"
                                    );
                                    ApiCallResult::succeeded(
                                        endpoint,
                                        url,
                                        response.status,
                                        payload,
                                        attempt,
                                    )
                                }
                                Err(e) => {
                                    warn!(
                                        endpoint,
                                        error = %e,
                                        "Registry returned a non-JSON body"
                                    );
                                    ApiCallResult::failed(
                                        endpoint,
                                        Some(url.to_string()),
                                        Some(response.status),
                                        format!("Invalid JSON payload: {}", e),
                                        attempt,
                                    )
                                }
                            };
                        }
                        StatusClass::Permanent => {
                            let message = describe_status(response.status);
                            warn!(
                                endpoint,
                                status = response.status,
                                "Registry rejected request, not retrying"
                            );
                            return ApiCallResult::failed(
                                endpoint,
                                Some(url.to_string()),
                                Some(response.status),
                                message,
                                attempt,
                            );
                        }
                        StatusClass::Retryable => {
                            last_error = describe_status(response.status);
                        }
                    }
                }
                Err(e) => {
                    last_status = None;
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                let backoff = self.retry.backoff_for(attempt);
                let spacing = self.pacer.spacing();
                warn!(
                    endpoint,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    spacing_ms = spacing.as_millis() as u64,
                    error = %last_error,
                    "Registry call failed, will retry after backoff"
                );
                self.clock.sleep(backoff).await;
                // Spacing is charged from the end of the backoff
                if !spacing.is_zero() {
                    self.clock.sleep(spacing).await;
                }
            }
        }

        error!(
            endpoint,
            attempts = max_attempts,
            error = %last_error,
            "All retry attempts failed"
        );
        ApiCallResult::failed(
            endpoint,
            Some(url.to_string()),
            last_status,
            last_error,
            max_attempts,
        )
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "API base URL must be an absolute http(s) URL: {}",
            base_url
        )));
    }
    Ok(url)
}
