//! Data models for the flight risk pipeline
//!
//! This module contains the request-scoped domain models organized by concern:
//! - Risk: Shared risk, connection and provenance vocabulary
//! - Flight: Canonical flight records, segments and layovers
//! - Weather: Weather and airport complexity assessments
//! - Layover: Layover feasibility results, single and batch
//! - Route: Route search results and the joined route risk report
//! - Report: Historical flight analysis, on-time rates and insurance advice

pub mod flight;
pub mod layover;
pub mod report;
pub mod risk;
pub mod route;
pub mod weather;

// Re-export all public types for convenient access
pub use flight::{ConnectionSegment, FlightRecord, LayoverInfo, SegmentEndpoint};
pub use layover::{
    BatchLayoverAssessment, BufferAnalysis, ContextualAnalysis, LayoverAnalysis,
    LayoverContext, LayoverDescriptor, LayoverFeasibility,
};
pub use report::{
    AirlineOnTime, FlightAnalysis, FlightRiskReport, InsuranceRecommendation, OverallRisk,
    RecommendationType, SeasonalFactors,
};
pub use risk::{ComplexityLevel, ConnectionType, Provenance, RiskLevel};
pub use route::{
    FlightLookup, FlightQuery, FlightRiskEntry, LayoverReport, LookupErrorKind, RouteInfo, RouteRiskReport,
    RouteSearchResult,
};
pub use weather::{AirportComplexity, LiveConditions, WeatherAssessment};
