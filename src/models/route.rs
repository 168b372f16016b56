//! Route search results and the joined route risk report

use serde::{Deserialize, Serialize};

use super::flight::FlightRecord;
use super::layover::BatchLayoverAssessment;
use super::weather::{AirportComplexity, WeatherAssessment};

/// Why a route search produced no flights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupErrorKind {
    /// Provider answered HTTP 429
    RateLimit,
    /// Provider answered but listed no itineraries
    NoFlights,
    /// Network failure, non-success status or unreadable payload
    Upstream,
    /// Search provider was never configured
    Unavailable,
    /// Origin or destination missing from the request
    InvalidRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub origin: String,
    pub destination: String,
    pub date: String,
    /// Connection airports requested by the caller, if any
    pub connections: Vec<String>,
}

/// Output of a route search handed to the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSearchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LookupErrorKind>,
    pub flights: Vec<FlightRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_info: Option<RouteInfo>,
}

impl RouteSearchResult {
    #[must_use]
    pub fn found(flights: Vec<FlightRecord>, route_info: RouteInfo) -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            flights,
            route_info: Some(route_info),
        }
    }

    pub fn failed<S: Into<String>>(error: LookupErrorKind, message: S) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: Some(error),
            flights: Vec::new(),
            route_info: None,
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.error == Some(LookupErrorKind::RateLimit)
    }
}

/// Exact-match key for a historical flight lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightQuery {
    pub airline_code: String,
    pub airline_name: String,
    pub flight_number: String,
    /// Local departure date, `YYYY-MM-DD`
    pub date: String,
}

/// Outcome of a warehouse lookup. Absence of a row is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "flight", rename_all = "snake_case")]
pub enum FlightLookup {
    Found(Box<FlightRecord>),
    NotFound,
    Unavailable,
}

/// Feasibility of one layover inside a route report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoverReport {
    pub airport_code: String,
    pub duration_minutes: Option<u32>,
    pub duration: String,
    /// Dedicated complexity analysis of the layover airport
    pub complexity: Option<AirportComplexity>,
    /// Assessment of this layover's own duration. `None` means no
    /// assessment is available, never low risk.
    pub assessment: Option<BatchLayoverAssessment>,
}

/// One flight joined with the weather and layover assessments that apply to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRiskEntry {
    pub flight: FlightRecord,
    pub layovers: Vec<LayoverReport>,
}

/// Full one-directional analysis of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRiskReport {
    pub search: RouteSearchResult,
    pub origin_weather: Option<WeatherAssessment>,
    pub destination_weather: Option<WeatherAssessment>,
    /// Weather for each unique layover airport, in first-seen order
    pub layover_weather: Vec<WeatherAssessment>,
    pub flights: Vec<FlightRiskEntry>,
}
