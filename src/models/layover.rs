//! Layover feasibility results

use serde::{Deserialize, Serialize};

use super::risk::{ComplexityLevel, ConnectionType, Provenance, RiskLevel};

/// Travel context forwarded to the model alongside a layover
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoverContext {
    pub weather_risk: Option<RiskLevel>,
    pub airport_complexity: Option<ComplexityLevel>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub travel_date: Option<String>,
    pub airline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextualAnalysis {
    #[serde(default)]
    pub weather_impact: String,
    #[serde(default)]
    pub peak_hour_analysis: String,
    #[serde(default)]
    pub seasonal_factors: String,
    #[serde(default)]
    pub airport_specific: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BufferAnalysis {
    #[serde(default)]
    pub buffer_time_minutes: Option<i64>,
    #[serde(default)]
    pub buffer_adequacy: String,
    #[serde(default)]
    pub delay_tolerance: String,
}

/// A completed feasibility assessment for one layover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoverFeasibility {
    pub airport_code: String,
    pub duration_minutes: u32,
    pub connection_type: ConnectionType,
    pub minimum_connection_time: Option<u32>,
    pub risk_level: RiskLevel,
    /// Clamped to 0..=100
    pub risk_score: u8,
    pub feasibility: String,
    pub risk_factors: Vec<String>,
    pub contextual_analysis: ContextualAnalysis,
    pub buffer_analysis: BufferAnalysis,
    pub recommendations: Vec<String>,
    pub provenance: Provenance,
}

/// Outcome of a single layover analysis.
///
/// `Failed` never carries numbers: callers must not read a failed analysis
/// as a low-risk connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoverAnalysis {
    Assessed(LayoverFeasibility),
    Failed {
        error: String,
        airport_code: String,
        duration_minutes: Option<u32>,
        connection_type: Option<ConnectionType>,
        analysis_failed: bool,
    },
}

impl LayoverAnalysis {
    pub fn failed<S: Into<String>>(
        error: S,
        airport_code: &str,
        duration_minutes: Option<u32>,
    ) -> Self {
        Self::Failed {
            error: error.into(),
            airport_code: airport_code.to_string(),
            duration_minutes,
            connection_type: duration_minutes.map(ConnectionType::from_minutes),
            analysis_failed: true,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn feasibility(&self) -> Option<&LayoverFeasibility> {
        match self {
            Self::Assessed(feasibility) => Some(feasibility),
            Self::Failed { .. } => None,
        }
    }
}

/// One layover submitted to the batch analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoverDescriptor {
    pub airport_code: String,
    pub airport_name: String,
    pub city: String,
    pub duration_minutes: u32,
    pub weather_risk: Option<RiskLevel>,
    pub airport_complexity: Option<ComplexityLevel>,
    pub arrival_time: Option<String>,
    pub travel_date: Option<String>,
}

/// Per-airport entry of a batch analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLayoverAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub feasibility: String,
    pub minimum_connection_time: Option<u32>,
    pub buffer_adequacy: Option<String>,
    pub airport_specific: Option<String>,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub provenance: Provenance,
}
