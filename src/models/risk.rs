//! Shared risk vocabulary
//!
//! Every call site uses the same ordered [`RiskLevel`]. Legacy tags produced by
//! upstream services or model output are mapped through [`RiskLevel::from_tag`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FlightRiskError;

/// Ordered risk tier, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a free-form tier tag onto the unified scale.
    ///
    /// Accepts `very_low`, `very low`, `minimal`, `low`, `medium`, `moderate`,
    /// `high`, `elevated`, `critical`, `severe` and `extreme` in any case.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "very_low" | "minimal" => Some(Self::VeryLow),
            "low" => Some(Self::Low),
            "medium" | "moderate" => Some(Self::Medium),
            "high" | "elevated" => Some(Self::High),
            "critical" | "severe" | "extreme" => Some(Self::Critical),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = FlightRiskError;

    /// Strict counterpart of [`RiskLevel::from_tag`] for user input
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| {
            FlightRiskError::validation(format!(
                "unknown risk tier '{}', expected very_low, low, medium, high or critical",
                s.trim()
            ))
        })
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection tier derived purely from layover minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Under 45 minutes
    Tight,
    /// 45 to 119 minutes
    Standard,
    /// 120 to 359 minutes
    Comfortable,
    /// 360 minutes and more
    PlentyOfTime,
}

impl ConnectionType {
    #[must_use]
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0..45 => Self::Tight,
            45..120 => Self::Standard,
            120..360 => Self::Comfortable,
            _ => Self::PlentyOfTime,
        }
    }

    /// The exact feasibility phrase the model is asked to use for this tier
    #[must_use]
    pub fn feasibility_phrase(&self) -> &'static str {
        match self {
            Self::Tight => "risky - tight connection",
            Self::Standard => "feasible with caution",
            Self::Comfortable => "comfortable connection",
            Self::PlentyOfTime => "plenty of time",
        }
    }

    /// Risk tier the assessment rules associate with this connection type
    #[must_use]
    pub fn baseline_risk(&self) -> RiskLevel {
        match self {
            Self::Tight => RiskLevel::High,
            Self::Standard => RiskLevel::Medium,
            Self::Comfortable => RiskLevel::Low,
            Self::PlentyOfTime => RiskLevel::VeryLow,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tight => "tight",
            Self::Standard => "standard",
            Self::Comfortable => "comfortable",
            Self::PlentyOfTime => "plenty_of_time",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational complexity of an airport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl ComplexityLevel {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" | "moderate" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the values of a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Live flight search provider
    SearchProvider,
    /// Historical analytics warehouse
    Warehouse,
    /// Live weather observation, optionally elaborated by the model
    RealTime,
    /// Model estimate from seasonal patterns
    Seasonal,
    /// Model-generated analysis
    Model,
    /// Deterministic heuristic, no external data
    Heuristic,
    /// Static default used because analysis failed
    Fallback,
}

impl Provenance {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Heuristic | Self::Fallback)
    }
}
