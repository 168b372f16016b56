//! External collaborators
//!
//! Each collaborator sits behind a trait so the pipeline can run against fakes
//! in tests. The HTTP implementations share status mapping: 429 becomes
//! [`FlightRiskError::RateLimited`], other failures are reported once and never
//! retried.

pub mod bigquery;
pub mod gemini;
pub mod serpapi;

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::models::{AirlineOnTime, FlightQuery, LiveConditions};
use crate::{FlightRiskError, Result};

pub use bigquery::BigQueryWarehouse;
pub use gemini::GeminiGenerator;
pub use serpapi::SerpApiClient;

/// Parameters of a route search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    /// Outbound date, `YYYY-MM-DD`
    pub date: String,
}

/// Flight and weather search provider
pub trait FlightSearchProvider {
    /// Raw flight search response for a one-way route
    fn search_flights(&self, request: &FlightSearchRequest) -> Result<Value>;

    /// Current conditions at an airport, `None` when the provider has no
    /// weather block for the query
    fn current_weather(&self, airport_code: &str) -> Result<Option<LiveConditions>>;
}

/// Single-turn text generation
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Historical flight warehouse
pub trait FlightWarehouse {
    /// First row matching the query exactly, `None` when nothing matches
    fn find_flight(&self, query: &FlightQuery) -> Result<Option<Map<String, Value>>>;

    /// Airline-wide punctuality, `None` when the airline has no history
    fn airline_on_time(&self, airline_code: &str) -> Result<Option<AirlineOnTime>>;
}

pub(crate) fn build_http_client(service: &'static str, timeout_seconds: u32) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(concat!("flightrisk/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FlightRiskError::config(format!("Failed to create {service} HTTP client: {e}")))
}

/// Convert a transport error without leaking query strings, which may carry
/// credentials
pub(crate) fn transport_error(service: &'static str, err: reqwest::Error) -> FlightRiskError {
    let err = err.without_url();
    error!("{} request failed: {}", service, err);
    if err.is_timeout() {
        FlightRiskError::network(service, "request timed out")
    } else {
        FlightRiskError::network(service, err.to_string())
    }
}

/// Map a non-success status to the error taxonomy
pub(crate) fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    debug!("{} responded with HTTP {}", service, status);
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let detail = crate::model_response::truncate_chars(body.trim(), 300);

    match status.as_u16() {
        429 => {
            error!("{} rate limit exceeded (HTTP 429)", service);
            Err(FlightRiskError::rate_limited(
                service,
                if detail.is_empty() {
                    "Too Many Requests".to_string()
                } else {
                    detail
                },
            ))
        }
        401 | 403 => {
            error!("{} authentication failed (HTTP {})", service, status);
            Err(FlightRiskError::api(
                service,
                status.as_u16(),
                "Authentication failed. Please check the configured credentials.",
            ))
        }
        code => {
            error!("{} request failed with HTTP {}", service, code);
            Err(FlightRiskError::api(service, code, detail))
        }
    }
}

pub(crate) fn read_json(service: &'static str, response: Response) -> Result<Value> {
    response
        .json::<Value>()
        .map_err(|e| FlightRiskError::parse(format!("Invalid JSON from {service}: {}", e.without_url())))
}
