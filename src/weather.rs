//! Weather risk for airports
//!
//! The keyword classifier is deterministic and never calls the model. The
//! [`WeatherIntelligence`] flow combines it with live conditions and generated
//! analysis, choosing between real-time and seasonal assessment by how far
//! away the flight is.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::clients::{FlightSearchProvider, TextGenerator};
use crate::complexity::{MAX_CONCERNS, MAX_DESCRIPTION_CHARS};
use crate::model_response::{parse_model_json, truncate_chars};
use crate::models::{
    AirportComplexity, ComplexityLevel, LiveConditions, Provenance, RiskLevel, WeatherAssessment,
};
use crate::normalize::{normalize_travel_date, tables};

const HIGH_RISK_TERMS: [&str; 6] = [
    "thunderstorm",
    "storm",
    "heavy rain",
    "heavy snow",
    "fog",
    "ice",
];
const MEDIUM_RISK_TERMS: [&str; 4] = ["rain", "snow", "cloudy", "overcast"];
const LOW_RISK_TERMS: [&str; 4] = ["partly cloudy", "clear", "sunny", "fair"];

/// Map a free-text conditions string to a risk tier.
///
/// Buckets are checked high, medium, low and the first hit wins. `partly
/// cloudy` belongs to the low bucket, so its `cloudy` does not count towards
/// medium. Text matching no bucket is low.
#[must_use]
pub fn classify_weather(conditions: &str) -> RiskLevel {
    let text = conditions.to_lowercase();

    if HIGH_RISK_TERMS.iter().any(|term| text.contains(term)) {
        return RiskLevel::High;
    }

    let without_low_phrases = text.replace("partly cloudy", " ");
    if MEDIUM_RISK_TERMS
        .iter()
        .any(|term| without_low_phrases.contains(term))
    {
        return RiskLevel::Medium;
    }

    if LOW_RISK_TERMS.iter().any(|term| text.contains(term)) {
        return RiskLevel::Low;
    }

    RiskLevel::Low
}

/// Fixed description for a deterministic tier
#[must_use]
pub fn deterministic_description(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High | RiskLevel::Critical => {
            "Severe weather conditions may cause significant flight delays and cancellations."
        }
        RiskLevel::Medium => {
            "Moderate weather conditions may cause minor delays and require standard precautions."
        }
        RiskLevel::Low | RiskLevel::VeryLow => {
            "Good weather conditions with minimal impact on flight operations."
        }
    }
}

/// Meteorological season for a month number, northern hemisphere
#[must_use]
pub fn season_for_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Winter",
        3..=5 => "Spring",
        6..=8 => "Summer",
        _ => "Fall",
    }
}

#[derive(Debug, Deserialize)]
struct ModelWeatherRisk {
    level: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct ModelConditions {
    #[serde(default)]
    conditions: String,
}

#[derive(Debug, Default, Deserialize)]
struct ModelComplexity {
    #[serde(default)]
    complexity: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    concerns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModelWeatherReply {
    weather_risk: ModelWeatherRisk,
    #[serde(default)]
    weather_conditions: ModelConditions,
    #[serde(default)]
    airport_complexity: ModelComplexity,
}

const RISK_GUIDELINES: &str = "\
Classify weather risk with these rules:
- low: clear skies or partly cloudy, light winds, visibility above 10 miles, no precipitation
- medium: cloudy, winds of 10 to 25 mph, visibility of 5 to 10 miles, light rain or snow
- high: heavy rain or snow, thunderstorms, winds above 25 mph, visibility under 5 miles, fog or ice";

const REPLY_SHAPE: &str = r#"Answer with a single JSON object and nothing else:
{
  "weather_risk": {"level": "low" | "medium" | "high", "description": "impact on flights, at most 250 characters"},
  "weather_conditions": {"conditions": "short summary of the conditions"},
  "airport_complexity": {
    "complexity": "low" | "medium" | "high",
    "description": "operational complexity, at most 250 characters",
    "concerns": ["short specific concern"]
  }
}
Keep both descriptions professional and do not add ellipses or symbols."#;

fn realtime_prompt(airport_code: &str, flight_date: NaiveDate, live: &LiveConditions) -> String {
    let observed = serde_json::to_string_pretty(live).unwrap_or_else(|_| live.conditions.clone());
    format!(
        "Assess the weather risk for flights at {airport_code} airport on {flight_date}, \
         using these live observations:\n{observed}\n\n{RISK_GUIDELINES}\n\n\
         Also describe the airport's operational complexity and the main concerns for travellers.\n\n\
         {REPLY_SHAPE}"
    )
}

fn seasonal_prompt(airport_code: &str, flight_date: NaiveDate) -> String {
    let month = flight_date.month();
    let season = season_for_month(month);
    format!(
        "Assess the typical weather risk for flights at {airport_code} airport during {season} \
         (month {month}). Draw on historical patterns, seasonal storms, temperature ranges and \
         their usual effect on operations.\n\n{RISK_GUIDELINES}\n\n\
         Also describe the airport's operational complexity and the main concerns for travellers.\n\n\
         {REPLY_SHAPE}"
    )
}

/// Weather assessment flow over optional collaborators
pub struct WeatherIntelligence<'a> {
    search: Option<&'a dyn FlightSearchProvider>,
    generator: Option<&'a dyn TextGenerator>,
    realtime_days: i64,
}

impl<'a> WeatherIntelligence<'a> {
    #[must_use]
    pub fn new(
        search: Option<&'a dyn FlightSearchProvider>,
        generator: Option<&'a dyn TextGenerator>,
        realtime_days: i64,
    ) -> Self {
        Self {
            search,
            generator,
            realtime_days,
        }
    }

    /// Assess weather risk at `airport_code` for a flight on `flight_date`.
    ///
    /// Live conditions are used when the flight is between today and
    /// `realtime_days` ahead and the search provider is available. Otherwise
    /// the model estimates from seasonal patterns. Every failure ends in the
    /// fixed fallback assessment.
    #[instrument(skip(self))]
    pub fn assess(&self, airport_code: &str, flight_date: &str, today: NaiveDate) -> WeatherAssessment {
        let code = airport_code.trim().to_uppercase();

        let normalized = normalize_travel_date(flight_date);
        let date = match NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                warn!("Unparsable flight date '{}': {}", flight_date, e);
                return fallback_assessment(&code, None);
            }
        };

        let days_until_flight = (date - today).num_days();
        let within_window = (0..=self.realtime_days).contains(&days_until_flight);
        debug!(
            "Flight is {} days away, real-time window {}: {}",
            days_until_flight, self.realtime_days, within_window
        );

        let live = match self.search {
            Some(search) if within_window => match search.current_weather(&code) {
                Ok(conditions) => conditions,
                Err(e) => {
                    warn!("Live weather unavailable for {}: {}", code, e);
                    None
                }
            },
            _ => None,
        };

        match live {
            Some(live) => self.assess_realtime(&code, date, &live),
            None => self.assess_seasonal(&code, date),
        }
    }

    fn assess_realtime(&self, code: &str, date: NaiveDate, live: &LiveConditions) -> WeatherAssessment {
        let deterministic = classify_weather(&live.conditions);
        info!("Deterministic weather risk at {}: {}", code, deterministic);

        let Some(generator) = self.generator else {
            return deterministic_assessment(code, live, deterministic);
        };

        match generator.generate(&realtime_prompt(code, date, live)) {
            Ok(reply) => match parse_model_json::<ModelWeatherReply>(&reply) {
                Ok(parsed) => {
                    assessment_from_reply(code, parsed, Provenance::RealTime, Some(deterministic))
                        .unwrap_or_else(|| fallback_assessment(code, Some(deterministic)))
                }
                Err(e) => {
                    warn!("Unreadable real-time weather reply for {}: {}", code, e);
                    fallback_assessment(code, Some(deterministic))
                }
            },
            Err(e) => {
                warn!("Real-time weather generation failed for {}: {}", code, e);
                self.assess_seasonal(code, date)
            }
        }
    }

    fn assess_seasonal(&self, code: &str, date: NaiveDate) -> WeatherAssessment {
        let Some(generator) = self.generator else {
            warn!("Text generation unavailable, using fallback weather for {}", code);
            return fallback_assessment(code, None);
        };

        let reply = match generator.generate(&seasonal_prompt(code, date)) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Seasonal weather generation failed for {}: {}", code, e);
                return fallback_assessment(code, None);
            }
        };

        match parse_model_json::<ModelWeatherReply>(&reply) {
            Ok(parsed) => assessment_from_reply(code, parsed, Provenance::Seasonal, None)
                .unwrap_or_else(|| fallback_assessment(code, None)),
            Err(e) => {
                warn!("Unreadable seasonal weather reply for {}: {}", code, e);
                fallback_assessment(code, None)
            }
        }
    }
}

fn airport_identity(code: &str) -> (String, String) {
    let name = tables::airport_name_for_code(code)
        .map_or_else(|| format!("{code} Airport"), ToString::to_string);
    let city = tables::city_for_code(code).unwrap_or("Unknown City").to_string();
    (name, city)
}

/// `None` when the reply names a tier outside the vocabulary
fn assessment_from_reply(
    code: &str,
    reply: ModelWeatherReply,
    provenance: Provenance,
    deterministic_risk: Option<RiskLevel>,
) -> Option<WeatherAssessment> {
    let Some(risk_level) = RiskLevel::from_tag(&reply.weather_risk.level) else {
        warn!("Model used unknown weather tier '{}'", reply.weather_risk.level);
        return None;
    };
    let (airport_name, city) = airport_identity(code);
    let complexity = reply.airport_complexity;

    Some(WeatherAssessment {
        airport_code: code.to_string(),
        airport_name,
        city,
        risk_level,
        description: truncate_chars(&reply.weather_risk.description, MAX_DESCRIPTION_CHARS),
        conditions: reply.weather_conditions.conditions,
        deterministic_risk,
        airport_complexity: AirportComplexity {
            complexity: ComplexityLevel::from_tag(&complexity.complexity),
            description: truncate_chars(&complexity.description, MAX_DESCRIPTION_CHARS),
            concerns: complexity.concerns.into_iter().take(MAX_CONCERNS).collect(),
            provenance: Provenance::Model,
        },
        provenance,
    })
}

fn deterministic_assessment(code: &str, live: &LiveConditions, level: RiskLevel) -> WeatherAssessment {
    let (airport_name, city) = airport_identity(code);
    WeatherAssessment {
        airport_code: code.to_string(),
        airport_name,
        city,
        risk_level: level,
        description: deterministic_description(level).to_string(),
        conditions: live.conditions.clone(),
        deterministic_risk: Some(level),
        airport_complexity: AirportComplexity {
            complexity: ComplexityLevel::Unknown,
            description: format!("Complexity analysis for {code} requires text generation"),
            concerns: Vec::new(),
            provenance: Provenance::Fallback,
        },
        provenance: Provenance::RealTime,
    }
}

/// Fixed medium-risk assessment used whenever analysis fails
#[must_use]
pub fn fallback_assessment(code: &str, deterministic_risk: Option<RiskLevel>) -> WeatherAssessment {
    let (airport_name, city) = airport_identity(code);
    WeatherAssessment {
        airport_code: code.to_string(),
        airport_name,
        city,
        risk_level: RiskLevel::Medium,
        description: format!(
            "Weather analysis for {code} currently unavailable, using standard seasonal patterns"
        ),
        conditions: "Weather conditions analysis pending".to_string(),
        deterministic_risk,
        airport_complexity: AirportComplexity {
            complexity: ComplexityLevel::Medium,
            description: format!(
                "Airport complexity analysis for {code} currently unavailable, standard operational assessment applied"
            ),
            concerns: vec!["Analysis temporarily unavailable".to_string()],
            provenance: Provenance::Fallback,
        },
        provenance: Provenance::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::FlightSearchRequest;
    use crate::{FlightRiskError, Result};
    use rstest::rstest;
    use std::cell::RefCell;

    #[rstest]
    #[case("thunderstorms expected", RiskLevel::High)]
    #[case("Dense FOG", RiskLevel::High)]
    #[case("heavy snow", RiskLevel::High)]
    #[case("light rain", RiskLevel::Medium)]
    #[case("Overcast", RiskLevel::Medium)]
    #[case("mostly cloudy", RiskLevel::Medium)]
    #[case("partly cloudy", RiskLevel::Low)]
    #[case("Sunny", RiskLevel::Low)]
    #[case("windy", RiskLevel::Low)]
    #[case("", RiskLevel::Low)]
    fn test_classify_weather(#[case] conditions: &str, #[case] expected: RiskLevel) {
        assert_eq!(classify_weather(conditions), expected);
    }

    #[test]
    fn test_high_terms_win_over_later_buckets() {
        assert_eq!(
            classify_weather("heavy rain showers, partly cloudy later"),
            RiskLevel::High
        );
        assert_eq!(classify_weather("partly cloudy, light snow"), RiskLevel::Medium);
    }

    #[rstest]
    #[case(1, "Winter")]
    #[case(12, "Winter")]
    #[case(3, "Spring")]
    #[case(7, "Summer")]
    #[case(10, "Fall")]
    fn test_season_for_month(#[case] month: u32, #[case] season: &str) {
        assert_eq!(season_for_month(month), season);
    }

    struct FakeSearch {
        conditions: Option<&'static str>,
        calls: RefCell<u32>,
    }

    impl FlightSearchProvider for FakeSearch {
        fn search_flights(&self, _request: &FlightSearchRequest) -> Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }

        fn current_weather(&self, _airport_code: &str) -> Result<Option<LiveConditions>> {
            *self.calls.borrow_mut() += 1;
            Ok(self.conditions.map(|c| LiveConditions {
                conditions: c.to_string(),
                ..LiveConditions::default()
            }))
        }
    }

    struct FakeGenerator {
        reply: Option<String>,
        prompts: RefCell<Vec<String>>,
    }

    impl TextGenerator for FakeGenerator {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| FlightRiskError::network("Gemini", "down"))
        }
    }

    const REPLY: &str = r#"```json
{"weather_risk": {"level": "high", "description": "Storm cells over the field"},
 "weather_conditions": {"conditions": "Thunderstorms"},
 "airport_complexity": {"complexity": "high", "description": "Busy hub", "concerns": ["ATC", "Gates"]}}
```"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
    }

    fn search(conditions: Option<&'static str>) -> FakeSearch {
        FakeSearch {
            conditions,
            calls: RefCell::new(0),
        }
    }

    fn generator(reply: Option<&str>) -> FakeGenerator {
        FakeGenerator {
            reply: reply.map(ToString::to_string),
            prompts: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_realtime_within_window() {
        let search = search(Some("Thunderstorm"));
        let generator = generator(Some(REPLY));
        let intelligence = WeatherIntelligence::new(Some(&search), Some(&generator), 7);

        let result = intelligence.assess("ord", "2025-07-12", today());
        assert_eq!(result.provenance, Provenance::RealTime);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.deterministic_risk, Some(RiskLevel::High));
        assert_eq!(result.city, "Chicago");
        assert_eq!(result.airport_code, "ORD");
        assert_eq!(result.airport_complexity.concerns.len(), 2);
        assert!(generator.prompts.borrow()[0].contains("Thunderstorm"));
    }

    #[test]
    fn test_seasonal_outside_window() {
        let search = search(Some("Sunny"));
        let generator = generator(Some(REPLY));
        let intelligence = WeatherIntelligence::new(Some(&search), Some(&generator), 7);

        let result = intelligence.assess("ORD", "2025-12-20", today());
        assert_eq!(result.provenance, Provenance::Seasonal);
        assert_eq!(result.deterministic_risk, None);
        assert_eq!(*search.calls.borrow(), 0);
        assert!(generator.prompts.borrow()[0].contains("Winter"));
    }

    #[test]
    fn test_past_dates_use_seasonal() {
        let search = search(Some("Sunny"));
        let generator = generator(Some(REPLY));
        let intelligence = WeatherIntelligence::new(Some(&search), Some(&generator), 7);
        let result = intelligence.assess("ORD", "2025-07-09", today());
        assert_eq!(result.provenance, Provenance::Seasonal);
    }

    #[test]
    fn test_live_conditions_without_model_are_deterministic() {
        let search = search(Some("light rain"));
        let intelligence = WeatherIntelligence::new(Some(&search), None, 7);

        let result = intelligence.assess("SEA", "2025-07-10", today());
        assert_eq!(result.provenance, Provenance::RealTime);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.description, deterministic_description(RiskLevel::Medium));
        assert_eq!(result.airport_complexity.complexity, ComplexityLevel::Unknown);
    }

    #[test]
    fn test_unparsable_reply_is_fallback() {
        let search = search(Some("Sunny"));
        let generator = generator(Some("the weather looks fine"));
        let intelligence = WeatherIntelligence::new(Some(&search), Some(&generator), 7);

        let result = intelligence.assess("JFK", "2025-07-11", today());
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.deterministic_risk, Some(RiskLevel::Low));
        assert_eq!(
            result.airport_complexity.concerns,
            vec!["Analysis temporarily unavailable"]
        );
    }

    #[test]
    fn test_generation_error_retries_as_seasonal_then_falls_back() {
        let search = search(Some("Sunny"));
        let generator = generator(None);
        let intelligence = WeatherIntelligence::new(Some(&search), Some(&generator), 7);

        let result = intelligence.assess("JFK", "2025-07-11", today());
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(generator.prompts.borrow().len(), 2);
    }

    #[test]
    fn test_nothing_available_is_fallback() {
        let intelligence = WeatherIntelligence::new(None, None, 7);
        let result = intelligence.assess("XYZ", "July 12th, 2025", today());
        assert_eq!(result.provenance, Provenance::Fallback);
        assert_eq!(result.city, "Unknown City");
        assert_eq!(result.airport_name, "XYZ Airport");
    }

    #[test]
    fn test_long_descriptions_are_truncated() {
        let long = "y".repeat(600);
        let reply = format!(r#"{{"weather_risk": {{"level": "low", "description": "{long}"}}}}"#);
        let generator = generator(Some(&reply));
        let intelligence = WeatherIntelligence::new(None, Some(&generator), 7);
        let result = intelligence.assess("DEN", "2025-09-01", today());
        assert_eq!(result.provenance, Provenance::Seasonal);
        assert_eq!(result.description.chars().count(), 250);
    }
}
