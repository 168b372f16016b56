//! Historical flight risk report and its parts

use serde::{Deserialize, Serialize};

use super::risk::{Provenance, RiskLevel};
use super::route::FlightRiskEntry;
use super::weather::{AirportComplexity, WeatherAssessment};

/// Airline-wide punctuality over the warehouse's performance tables.
///
/// Rates are percentages. A departure counts as on time when its delay is
/// 15 minutes or less.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirlineOnTime {
    pub airline_code: String,
    pub total_flights: u64,
    pub on_time_rate: f64,
    pub cancellation_rate: f64,
    pub diversion_rate: f64,
    pub delay_rate: f64,
    /// Share of departures delayed by more than an hour
    pub severe_delay_rate: f64,
    pub avg_departure_delay_minutes: Option<f64>,
    pub avg_arrival_delay_minutes: Option<f64>,
}

/// Five short seasonal risk factors for a travel date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalFactors {
    /// `Winter`, `Spring`, `Summer`, `Fall` or `Unknown`
    pub season: String,
    pub factors: Vec<String>,
    pub provenance: Provenance,
}

/// Combined risk of one flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallRisk {
    pub risk_level: RiskLevel,
    /// 0..=100
    pub risk_score: u8,
    /// True when no component could be assessed and the medium default was used
    pub defaulted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    SkipInsurance,
    ConsiderInsurance,
    StronglyRecommend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceRecommendation {
    pub recommendation_type: RecommendationType,
    pub recommendation: String,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    /// `model` for generated advice, `fallback` for the fixed text
    pub provenance: Provenance,
}

/// Everything known about one historical flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightAnalysis {
    pub entry: FlightRiskEntry,
    pub on_time: Option<AirlineOnTime>,
    pub origin_weather: WeatherAssessment,
    pub destination_weather: WeatherAssessment,
    pub origin_complexity: AirportComplexity,
    pub destination_complexity: AirportComplexity,
    /// Weather for each unique layover airport, in travel order
    pub layover_weather: Vec<WeatherAssessment>,
    pub seasonal_factors: SeasonalFactors,
    pub overall_risk: OverallRisk,
    pub insurance: InsuranceRecommendation,
}

/// Outcome of a historical flight analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "analysis", rename_all = "snake_case")]
pub enum FlightRiskReport {
    Analyzed(Box<FlightAnalysis>),
    NotFound,
    Unavailable,
}
