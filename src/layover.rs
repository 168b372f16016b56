//! Layover feasibility
//!
//! The connection tier and its feasibility phrase are a pure function of the
//! layover duration. The model only elaborates on them. A single analysis fails closed: when the duration
//! cannot be read, the model is missing or its reply is unusable, the result
//! is [`LayoverAnalysis::Failed`] and carries no numbers. The batch path
//! returns an empty map on failure unless the heuristic fallback is enabled.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::clients::TextGenerator;
use crate::model_response::parse_model_json;
use crate::models::{
    BatchLayoverAssessment, BufferAnalysis, ConnectionType, ContextualAnalysis, LayoverAnalysis,
    LayoverContext, LayoverDescriptor, LayoverFeasibility, Provenance, RiskLevel,
};
use crate::normalize::format_duration;

const FEASIBILITY_PHRASES: [&str; 4] = [
    "risky - tight connection",
    "feasible with caution",
    "comfortable connection",
    "plenty of time",
];

/// Read a layover duration in minutes.
///
/// Accepts `"1h 30m"`, `"2h"`, `"45m"`, `"1:30"`, `"1 hr 5 min"`,
/// `"2 hours"` and bare minute counts.
#[must_use]
pub fn parse_duration(raw: &str) -> Option<u32> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }
    if let Ok(minutes) = text.parse::<u32>() {
        return Some(minutes);
    }
    if let Some((hours, minutes)) = text.split_once(':') {
        let hours = hours.trim().parse::<u32>().ok()?;
        let minutes = minutes.trim().parse::<u32>().ok().filter(|m| *m < 60)?;
        return hours.checked_mul(60)?.checked_add(minutes);
    }

    let mut total: u32 = 0;
    let mut rest = text.as_str();
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let amount = rest[..digits_end].parse::<u32>().ok()?;
        rest = rest[digits_end..].trim_start();

        let unit_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let factor = match &rest[..unit_end] {
            "h" | "hr" | "hrs" | "hour" | "hours" => 60,
            "m" | "min" | "mins" | "minute" | "minutes" => 1,
            _ => return None,
        };
        rest = &rest[unit_end..];

        total = total.checked_add(amount.checked_mul(factor)?)?;
    }
    Some(total)
}

/// Duration-bucketed assessment that needs no model.
///
/// Used by the batch path only when `analysis.batch_heuristic_fallback` is on.
#[must_use]
pub fn heuristic_assessment(duration_minutes: u32) -> BatchLayoverAssessment {
    let (risk_level, risk_score, feasibility) = match duration_minutes {
        120.. => (RiskLevel::Low, 30, "Comfortable connection time"),
        60..=119 => (RiskLevel::Medium, 50, "Adequate connection time"),
        _ => (RiskLevel::High, 75, "Tight connection time"),
    };
    BatchLayoverAssessment {
        risk_level,
        risk_score,
        feasibility: feasibility.to_string(),
        minimum_connection_time: Some(60),
        buffer_adequacy: Some("unknown".to_string()),
        airport_specific: Some("Heuristic analysis".to_string()),
        risk_factors: vec!["Fallback analysis used".to_string()],
        recommendations: vec![
            "Monitor flight status".to_string(),
            "Allow extra time".to_string(),
        ],
        provenance: Provenance::Heuristic,
    }
}

#[derive(Debug, Deserialize)]
struct FeasibilityReply {
    minimum_connection_time: Option<f64>,
    risk_level: Option<String>,
    risk_score: Option<f64>,
    #[serde(alias = "feasibility")]
    overall_feasibility: Option<String>,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    contextual_analysis: ContextualAnalysis,
    #[serde(default)]
    buffer_analysis: BufferAnalysis,
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BatchEntryReply {
    risk_level: String,
    risk_score: f64,
    #[serde(alias = "feasibility")]
    overall_feasibility: Option<String>,
    minimum_connection_time: Option<f64>,
    #[serde(default)]
    buffer_analysis: Value,
    #[serde(default)]
    contextual_analysis: Value,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

fn clamp_score(score: f64) -> u8 {
    if score.is_finite() {
        score.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

fn whole_minutes(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round().min(f64::from(u32::MAX)) as u32)
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(ToString::to_string)
}

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("Unknown")
}

fn feasibility_prompt(
    raw_duration: &str,
    minutes: u32,
    airport_code: &str,
    connection_type: ConnectionType,
    context: &LayoverContext,
) -> String {
    format!(
        r#"Analyze the feasibility of this flight connection.

Airport: {airport_code}
Layover duration: {raw_duration} ({minutes} minutes)
Connection type: {connection_type}
Arrival time: {arrival}
Departure time: {departure}
Travel date: {date}
Airline: {airline}
Weather risk: {weather}
Airport complexity: {complexity}

Connection tiers by duration:
- under 45 minutes: tight connection, high risk
- 45 to 120 minutes: standard connection, medium risk
- 120 to 360 minutes: comfortable connection, low risk
- 360 minutes or more: plenty of time, very low risk

For overall_feasibility use exactly one of these phrases, chosen by duration:
- under 45 minutes: "risky - tight connection"
- 45 to 120 minutes: "feasible with caution"
- 120 to 360 minutes: "comfortable connection"
- 360 minutes or more: "plenty of time"

Consider minimum connection times and terminal layout at this airport, peak hour
congestion, seasonal volumes, historical delays, customs and immigration for
international connections, terminal changes and airline on-time performance.

Answer with a single JSON object and nothing else:
{{
  "minimum_connection_time": 90,
  "risk_level": "critical" | "high" | "medium" | "low" | "very_low",
  "risk_score": 0-100,
  "overall_feasibility": "one of the exact phrases above",
  "risk_factors": ["specific risk factor"],
  "contextual_analysis": {{
    "weather_impact": "",
    "peak_hour_analysis": "",
    "seasonal_factors": "",
    "airport_specific": ""
  }},
  "buffer_analysis": {{
    "buffer_time_minutes": 30,
    "buffer_adequacy": "",
    "delay_tolerance": ""
  }},
  "recommendations": ["five to eight actionable recommendations"]
}}"#,
        arrival = or_unknown(context.arrival_time.as_deref()),
        departure = or_unknown(context.departure_time.as_deref()),
        date = or_unknown(context.travel_date.as_deref()),
        airline = or_unknown(context.airline.as_deref()),
        weather = context.weather_risk.unwrap_or(RiskLevel::Medium),
        complexity = context
            .airport_complexity
            .map_or("medium", |c| c.as_str()),
    )
}

fn batch_prompt(layovers: &[LayoverDescriptor], context: &LayoverContext) -> String {
    let details: String = layovers
        .iter()
        .enumerate()
        .map(|(i, layover)| {
            format!(
                "Layover {n}:\n- Airport: {code} ({name}, {city})\n- Duration: {duration} ({minutes} minutes)\n\
                 - Connection type: {tier}\n- Weather risk: {weather}\n- Airport complexity: {complexity}\n\
                 - Arrival time: {arrival}\n- Travel date: {date}\n\n",
                n = i + 1,
                code = layover.airport_code,
                name = layover.airport_name,
                city = layover.city,
                duration = format_duration(i64::from(layover.duration_minutes)),
                minutes = layover.duration_minutes,
                tier = ConnectionType::from_minutes(layover.duration_minutes),
                weather = layover
                    .weather_risk
                    .or(context.weather_risk)
                    .unwrap_or(RiskLevel::Medium),
                complexity = layover
                    .airport_complexity
                    .or(context.airport_complexity)
                    .map_or("medium", |c| c.as_str()),
                arrival = or_unknown(
                    layover
                        .arrival_time
                        .as_deref()
                        .or(context.arrival_time.as_deref())
                ),
                date = or_unknown(
                    layover
                        .travel_date
                        .as_deref()
                        .or(context.travel_date.as_deref())
                ),
            )
        })
        .collect();

    format!(
        r#"Analyze these {count} layovers for connection feasibility.

{details}For each layover give the risk level (very_low, low, medium or high), a risk score
from 0 to 100, an overall feasibility assessment, the minimum connection time needed
in minutes, buffer adequacy (adequate, tight or insufficient), the top three
recommendations, the top three risk factors and an airport-specific assessment.
Weigh airport size and complexity, weather risk, terminal changes and walking
distances, security and customs, peak congestion and airline operations.

Answer with a single JSON object keyed by airport code and nothing else:
{{
  "AIRPORT_CODE": {{
    "risk_level": "medium",
    "risk_score": 60,
    "overall_feasibility": "feasible with monitoring",
    "minimum_connection_time": 90,
    "buffer_analysis": {{"buffer_adequacy": "adequate"}},
    "recommendations": ["", "", ""],
    "risk_factors": ["", "", ""],
    "contextual_analysis": {{"airport_specific": ""}}
  }}
}}"#,
        count = layovers.len(),
    )
}

/// Layover feasibility over an optional text generator
pub struct LayoverAnalyzer<'a> {
    generator: Option<&'a dyn TextGenerator>,
    heuristic_fallback: bool,
}

impl<'a> LayoverAnalyzer<'a> {
    #[must_use]
    pub fn new(generator: Option<&'a dyn TextGenerator>, heuristic_fallback: bool) -> Self {
        Self {
            generator,
            heuristic_fallback,
        }
    }

    /// Assess one layover. No model call happens when the duration cannot be
    /// parsed or no generator is configured.
    #[instrument(skip(self, context))]
    pub fn analyze(&self, duration: &str, airport_code: &str, context: &LayoverContext) -> LayoverAnalysis {
        let code = airport_code.trim().to_uppercase();

        let Some(minutes) = parse_duration(duration) else {
            warn!("Unparsable layover duration '{}' at {}", duration, code);
            return LayoverAnalysis::failed(
                format!("Unable to parse layover duration '{duration}'"),
                &code,
                None,
            );
        };
        let connection_type = ConnectionType::from_minutes(minutes);
        debug!("{} minute layover at {} is {}", minutes, code, connection_type);

        let Some(generator) = self.generator else {
            warn!("Text generation unavailable, no layover analysis for {}", code);
            return LayoverAnalysis::failed(
                "Layover analysis model not available",
                &code,
                Some(minutes),
            );
        };

        let prompt = feasibility_prompt(duration, minutes, &code, connection_type, context);
        let reply = match generator.generate(&prompt) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Layover generation failed for {}: {}", code, e);
                return LayoverAnalysis::failed(
                    format!("Layover analysis failed: {}", e.user_message()),
                    &code,
                    Some(minutes),
                );
            }
        };

        match parse_model_json::<FeasibilityReply>(&reply) {
            Ok(parsed) => feasibility_from_reply(&code, minutes, connection_type, parsed),
            Err(e) => {
                warn!("Unreadable layover reply for {}: {}", code, e);
                LayoverAnalysis::failed(
                    "Layover analysis failed: invalid response format",
                    &code,
                    Some(minutes),
                )
            }
        }
    }

    /// Assess several layovers with one model call.
    ///
    /// The result is keyed by upper-case airport code. A layover missing from
    /// the map has no assessment and must not be read as low risk.
    #[instrument(skip_all, fields(layovers = layovers.len()))]
    pub fn analyze_batch(
        &self,
        layovers: &[LayoverDescriptor],
        context: &LayoverContext,
    ) -> HashMap<String, BatchLayoverAssessment> {
        if layovers.is_empty() {
            return HashMap::new();
        }

        let Some(generator) = self.generator else {
            warn!("Text generation unavailable for batch layover analysis");
            return self.batch_failure(layovers);
        };

        info!("Analyzing {} layovers in one request", layovers.len());
        let reply = match generator.generate(&batch_prompt(layovers, context)) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Batch layover generation failed: {}", e);
                return self.batch_failure(layovers);
            }
        };

        let entries = match parse_model_json::<HashMap<String, Value>>(&reply) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Unreadable batch layover reply: {}", e);
                return self.batch_failure(layovers);
            }
        };

        let results: HashMap<String, BatchLayoverAssessment> = entries
            .into_iter()
            .filter_map(|(code, entry)| {
                let code = code.trim().to_uppercase();
                if !layovers.iter().any(|l| l.airport_code.eq_ignore_ascii_case(&code)) {
                    debug!("Ignoring batch entry for unrequested airport {}", code);
                    return None;
                }
                batch_entry(&code, entry).map(|assessment| (code, assessment))
            })
            .collect();

        info!("Batch layover analysis complete for {} airports", results.len());
        results
    }

    fn batch_failure(&self, layovers: &[LayoverDescriptor]) -> HashMap<String, BatchLayoverAssessment> {
        if !self.heuristic_fallback {
            return HashMap::new();
        }
        info!("Using heuristic assessment for {} layovers", layovers.len());
        layovers
            .iter()
            .map(|l| {
                (
                    l.airport_code.trim().to_uppercase(),
                    heuristic_assessment(l.duration_minutes),
                )
            })
            .collect()
    }
}

fn feasibility_from_reply(
    code: &str,
    minutes: u32,
    connection_type: ConnectionType,
    reply: FeasibilityReply,
) -> LayoverAnalysis {
    let risk_level = reply.risk_level.as_deref().and_then(RiskLevel::from_tag);
    let (Some(risk_level), Some(score)) = (risk_level, reply.risk_score) else {
        warn!("Layover reply for {} lacks a usable risk level or score", code);
        return LayoverAnalysis::failed(
            "Layover analysis failed: incomplete response",
            code,
            Some(minutes),
        );
    };

    let expected = connection_type.feasibility_phrase();
    let offered = reply
        .overall_feasibility
        .as_deref()
        .map(|p| p.trim().to_lowercase())
        .unwrap_or_default();
    if offered != expected {
        if FEASIBILITY_PHRASES.contains(&offered.as_str()) {
            warn!(
                "Model feasibility '{}' contradicts the {} minute {} tier at {}, using '{}'",
                offered, minutes, connection_type, code, expected
            );
        } else {
            warn!(
                "Model feasibility '{}' is not a known phrase, using '{}'",
                offered, expected
            );
        }
    }
    let feasibility = expected.to_string();

    LayoverAnalysis::Assessed(LayoverFeasibility {
        airport_code: code.to_string(),
        duration_minutes: minutes,
        connection_type,
        minimum_connection_time: whole_minutes(reply.minimum_connection_time),
        risk_level,
        risk_score: clamp_score(score),
        feasibility,
        risk_factors: reply.risk_factors,
        contextual_analysis: reply.contextual_analysis,
        buffer_analysis: reply.buffer_analysis,
        recommendations: reply.recommendations,
        provenance: Provenance::Model,
    })
}

fn batch_entry(code: &str, entry: Value) -> Option<BatchLayoverAssessment> {
    let parsed: BatchEntryReply = match serde_json::from_value(entry) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Dropping unreadable batch entry for {}: {}", code, e);
            return None;
        }
    };
    let Some(risk_level) = RiskLevel::from_tag(&parsed.risk_level) else {
        warn!("Dropping batch entry for {} with tier '{}'", code, parsed.risk_level);
        return None;
    };

    Some(BatchLayoverAssessment {
        risk_level,
        risk_score: clamp_score(parsed.risk_score),
        feasibility: parsed.overall_feasibility.unwrap_or_default(),
        minimum_connection_time: whole_minutes(parsed.minimum_connection_time),
        buffer_adequacy: text_field(&parsed.buffer_analysis, "buffer_adequacy"),
        airport_specific: text_field(&parsed.contextual_analysis, "airport_specific"),
        risk_factors: parsed.risk_factors,
        recommendations: parsed.recommendations,
        provenance: Provenance::Model,
    })
}
