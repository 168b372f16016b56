//! SerpAPI client for Google Flights and Google weather answers

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{
    FlightSearchProvider, FlightSearchRequest, build_http_client, check_status, read_json,
    transport_error,
};
use crate::config::SearchConfig;
use crate::models::LiveConditions;
use crate::{FlightRiskError, Result};

const SERVICE: &str = "SerpAPI";

/// One-way trip in the provider's `type` parameter
const ONE_WAY: &str = "2";

pub struct SerpApiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    flights_timeout: Duration,
    weather_timeout: Duration,
    currency: String,
    locale: String,
}

impl std::fmt::Debug for SerpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl SerpApiClient {
    /// Create a client; fails when no API key is configured
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                FlightRiskError::config(
                    "Search provider API key is required (search.api_key or SERPAPI_API_KEY)",
                )
            })?;

        let longest = config
            .flights_timeout_seconds
            .max(config.weather_timeout_seconds);
        Ok(Self {
            client: build_http_client(SERVICE, longest)?,
            api_key,
            endpoint: format!("{}/search", config.base_url.trim_end_matches('/')),
            flights_timeout: Duration::from_secs(config.flights_timeout_seconds.into()),
            weather_timeout: Duration::from_secs(config.weather_timeout_seconds.into()),
            currency: config.currency.clone(),
            locale: config.locale.clone(),
        })
    }

    fn get(&self, params: &[(&str, &str)], timeout: Duration) -> Result<Value> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .timeout(timeout)
            .send()
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response)?;
        read_json(SERVICE, response)
    }
}

impl FlightSearchProvider for SerpApiClient {
    #[instrument(skip(self), fields(origin = %request.origin, destination = %request.destination))]
    fn search_flights(&self, request: &FlightSearchRequest) -> Result<Value> {
        info!(
            "Searching flights {} -> {} on {}",
            request.origin, request.destination, request.date
        );
        let data = self.get(
            &[
                ("engine", "google_flights"),
                ("departure_id", request.origin.as_str()),
                ("arrival_id", request.destination.as_str()),
                ("outbound_date", request.date.as_str()),
                ("type", ONE_WAY),
                ("currency", self.currency.as_str()),
                ("hl", self.locale.as_str()),
            ],
            self.flights_timeout,
        )?;

        if let Some(message) = data.get("error").and_then(Value::as_str) {
            warn!("SerpAPI reported: {}", message);
        }
        debug!(
            "SerpAPI flight response keys: {:?}",
            data.as_object().map(|o| o.keys().collect::<Vec<_>>())
        );
        Ok(data)
    }

    #[instrument(skip(self))]
    fn current_weather(&self, airport_code: &str) -> Result<Option<LiveConditions>> {
        let query = format!("weather {} airport", airport_code.to_uppercase());
        let data = self.get(&[("engine", "google"), ("q", query.as_str())], self.weather_timeout)?;
        let conditions = live_conditions_from_response(&data);
        if conditions.is_none() {
            warn!("No weather block in SerpAPI answer for {}", airport_code);
        }
        Ok(conditions)
    }
}

/// Read live conditions from `weather_result`, or from an `answer_box` whose
/// `type` is `weather_result`
#[must_use]
pub fn live_conditions_from_response(data: &Value) -> Option<LiveConditions> {
    let block = data.get("weather_result").or_else(|| {
        data.get("answer_box")
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("weather_result"))
    })?;

    let text = |key: &str| match block.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    };

    Some(LiveConditions {
        conditions: text("weather").unwrap_or_else(|| "Unknown".to_string()),
        temperature: text("temperature"),
        wind: text("wind"),
        humidity: text("humidity"),
        precipitation: text("precipitation"),
        location: text("location"),
        date: text("date"),
    })
}
