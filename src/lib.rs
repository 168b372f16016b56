//! `flightrisk` - layover feasibility and weather risk for flight searches
//!
//! Flight options come from a live search provider or a historical
//! warehouse, are normalized into one record shape and enriched with
//! weather and connection risk, partly generated by a text model.
//! Historical flights additionally get punctuality, seasonal factors and
//! travel insurance advice.

pub mod clients;
pub mod complexity;
pub mod config;
pub mod error;
pub mod insurance;
pub mod layover;
pub mod logging;
pub mod lookup;
pub mod model_response;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod seasonal;
pub mod weather;

// Re-export core types for public API
pub use clients::{FlightSearchProvider, FlightWarehouse, TextGenerator};
pub use config::FlightRiskConfig;
pub use error::FlightRiskError;
pub use layover::{LayoverAnalyzer, parse_duration};
pub use models::{
    AirlineOnTime, AirportComplexity, ConnectionType, FlightAnalysis, FlightLookup, FlightQuery,
    FlightRecord, FlightRiskReport, InsuranceRecommendation, LayoverAnalysis, LayoverContext,
    Provenance, RecommendationType, RiskLevel, RouteInfo, RouteRiskReport, RouteSearchResult,
    SeasonalFactors, WeatherAssessment,
};
pub use pipeline::{Availability, Collaborators, FlightRiskService};
pub use weather::{WeatherIntelligence, classify_weather};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, FlightRiskError>;
