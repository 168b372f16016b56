//! Weather and airport complexity assessments

use serde::{Deserialize, Serialize};

use super::risk::{ComplexityLevel, Provenance, RiskLevel};

/// Live conditions as reported by the search provider
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveConditions {
    pub conditions: String,
    pub temperature: Option<String>,
    pub wind: Option<String>,
    pub humidity: Option<String>,
    pub precipitation: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
}

/// Operational complexity of an airport with the concerns behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportComplexity {
    pub complexity: ComplexityLevel,
    /// At most 250 characters
    pub description: String,
    /// At most four entries when model generated
    pub concerns: Vec<String>,
    pub provenance: Provenance,
}

/// Weather risk for one airport on one travel date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAssessment {
    pub airport_code: String,
    pub airport_name: String,
    pub city: String,
    pub risk_level: RiskLevel,
    /// At most 250 characters
    pub description: String,
    pub conditions: String,
    /// Keyword tier of the live conditions, present only when they were fetched
    pub deterministic_risk: Option<RiskLevel>,
    pub airport_complexity: AirportComplexity,
    pub provenance: Provenance,
}
