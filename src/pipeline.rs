//! Flight risk service
//!
//! Owns the collaborators and runs the two analysis flows. A route report
//! searches, normalizes, assesses weather and complexity per airport and
//! batches layover feasibility. A flight report starts from one warehouse
//! row and adds punctuality, seasonal factors and insurance advice.

use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::clients::{
    BigQueryWarehouse, FlightSearchProvider, FlightWarehouse, GeminiGenerator, SerpApiClient,
    TextGenerator,
};
use crate::complexity::analyze_airport_complexity;
use crate::config::{AnalysisConfig, FlightRiskConfig};
use crate::layover::LayoverAnalyzer;
use crate::lookup;
use crate::insurance::{InsuranceContext, overall_risk, recommend_insurance};
use crate::models::{
    AirlineOnTime, AirportComplexity, BatchLayoverAssessment, ComplexityLevel, FlightAnalysis,
    FlightLookup, FlightQuery, FlightRecord, FlightRiskEntry, FlightRiskReport, LayoverAnalysis,
    LayoverContext, LayoverDescriptor, LayoverReport, RouteInfo, RouteRiskReport,
    RouteSearchResult, WeatherAssessment,
};
use crate::normalize::{UNKNOWN, normalize_travel_date};
use crate::seasonal::seasonal_factors;
use crate::weather::WeatherIntelligence;
use crate::{FlightRiskError, Result};

/// External services the pipeline talks to. Any of them may be absent.
#[derive(Default)]
pub struct Collaborators {
    pub search: Option<Box<dyn FlightSearchProvider>>,
    pub generator: Option<Box<dyn TextGenerator>>,
    pub warehouse: Option<Box<dyn FlightWarehouse>>,
}

/// Which collaborators were configured at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub search: bool,
    pub generation: bool,
    pub warehouse: bool,
}

pub struct FlightRiskService {
    collaborators: Collaborators,
    analysis: AnalysisConfig,
}

/// `None` when the service reports itself unavailable; configuration
/// mistakes still fail
fn optional<T>(built: Result<T>) -> Result<Option<T>> {
    match built {
        Ok(client) => Ok(Some(client)),
        Err(FlightRiskError::Unavailable { service }) => {
            warn!("{} not configured, continuing without it", service);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl FlightRiskService {
    #[must_use]
    pub fn new(collaborators: Collaborators, analysis: AnalysisConfig) -> Self {
        Self {
            collaborators,
            analysis,
        }
    }

    /// Build the HTTP collaborators from configuration.
    ///
    /// Fails when the search credential is missing. Text generation and the
    /// warehouse are optional and recorded as unavailable once, here.
    pub fn from_config(config: &FlightRiskConfig) -> Result<Self> {
        config.require_search_api_key()?;
        let search = SerpApiClient::new(&config.search)?;
        let generator = optional(GeminiGenerator::new(&config.generation))?;
        let warehouse = optional(BigQueryWarehouse::new(&config.warehouse))?;

        let service = Self::new(
            Collaborators {
                search: Some(Box::new(search)),
                generator: generator.map(|g| Box::new(g) as Box<dyn TextGenerator>),
                warehouse: warehouse.map(|w| Box::new(w) as Box<dyn FlightWarehouse>),
            },
            config.analysis.clone(),
        );
        info!("Flight risk service ready: {:?}", service.availability());
        Ok(service)
    }

    #[must_use]
    pub fn availability(&self) -> Availability {
        Availability {
            search: self.collaborators.search.is_some(),
            generation: self.collaborators.generator.is_some(),
            warehouse: self.collaborators.warehouse.is_some(),
        }
    }

    fn search(&self) -> Option<&dyn FlightSearchProvider> {
        self.collaborators.search.as_deref()
    }

    fn generator(&self) -> Option<&dyn TextGenerator> {
        self.collaborators.generator.as_deref()
    }

    fn weather(&self) -> WeatherIntelligence<'_> {
        WeatherIntelligence::new(
            self.search(),
            self.generator(),
            self.analysis.realtime_weather_days,
        )
    }

    fn layovers(&self) -> LayoverAnalyzer<'_> {
        LayoverAnalyzer::new(self.generator(), self.analysis.batch_heuristic_fallback)
    }

    fn max_flights(&self) -> usize {
        usize::try_from(self.analysis.max_flights).unwrap_or(usize::MAX)
    }

    pub fn search_route(&self, route: &RouteInfo) -> RouteSearchResult {
        lookup::search_route(self.search(), route, self.max_flights())
    }

    pub fn lookup_flight(&self, query: &FlightQuery) -> FlightLookup {
        lookup::lookup_flight(self.collaborators.warehouse.as_deref(), query)
    }

    /// Weather risk at an airport for a flight date, relative to today
    pub fn assess_weather(&self, airport_code: &str, flight_date: &str) -> WeatherAssessment {
        self.assess_weather_on(airport_code, flight_date, Local::now().date_naive())
    }

    pub fn assess_weather_on(
        &self,
        airport_code: &str,
        flight_date: &str,
        today: NaiveDate,
    ) -> WeatherAssessment {
        self.weather().assess(airport_code, flight_date, today)
    }

    pub fn airport_complexity(&self, airport_code: &str) -> AirportComplexity {
        let code = airport_code.trim().to_uppercase();
        let name = crate::normalize::tables::airport_name_for_code(&code);
        analyze_airport_complexity(self.generator(), &code, name)
    }

    pub fn assess_layover(
        &self,
        duration: &str,
        airport_code: &str,
        context: &LayoverContext,
    ) -> LayoverAnalysis {
        self.layovers().analyze(duration, airport_code, context)
    }

    pub fn assess_layovers_batch(
        &self,
        layovers: &[LayoverDescriptor],
        context: &LayoverContext,
    ) -> HashMap<String, BatchLayoverAssessment> {
        self.layovers().analyze_batch(layovers, context)
    }

    pub fn analyze_route(&self, route: &RouteInfo) -> RouteRiskReport {
        self.analyze_route_on(route, Local::now().date_naive())
    }

    /// Full route report. A failed search yields a report with no weather
    /// and no flights, carrying the search failure.
    #[instrument(skip(self), fields(origin = %route.origin, destination = %route.destination))]
    pub fn analyze_route_on(&self, route: &RouteInfo, today: NaiveDate) -> RouteRiskReport {
        let search = self.search_route(route);
        let Some(info) = search.route_info.clone().filter(|_| search.success) else {
            return RouteRiskReport {
                search,
                origin_weather: None,
                destination_weather: None,
                layover_weather: Vec::new(),
                flights: Vec::new(),
            };
        };

        let weather = self.weather();
        let origin_weather = weather.assess(&info.origin, &info.date, today);
        let destination_weather = weather.assess(&info.destination, &info.date, today);

        let itineraries = self.assess_itineraries(&search.flights, &info.date, today);
        let flights = search
            .flights
            .iter()
            .cloned()
            .zip(itineraries.layovers)
            .map(|(flight, layovers)| FlightRiskEntry { flight, layovers })
            .collect();

        RouteRiskReport {
            search,
            origin_weather: Some(origin_weather),
            destination_weather: Some(destination_weather),
            layover_weather: itineraries.weather,
            flights,
        }
    }

    /// Airline-wide punctuality. A failed warehouse call only costs the figure.
    pub fn airline_on_time(&self, airline_code: &str) -> Option<AirlineOnTime> {
        let warehouse = self.collaborators.warehouse.as_deref()?;
        let code = airline_code.trim().to_uppercase();
        if code.is_empty() || code == UNKNOWN.to_uppercase() {
            return None;
        }
        match warehouse.airline_on_time(&code) {
            Ok(stats) => stats,
            Err(e) => {
                warn!("On-time rate unavailable for {}: {}", code, e);
                None
            }
        }
    }

    pub fn analyze_flight(&self, query: &FlightQuery) -> FlightRiskReport {
        self.analyze_flight_on(query, Local::now().date_naive())
    }

    /// Risk analysis of one historical flight: warehouse row, weather and
    /// complexity at both ends, layovers, seasonal factors and insurance
    /// advice. Lookup outcomes other than a found row are passed through.
    #[instrument(skip(self), fields(flight = %query.flight_number, date = %query.date))]
    pub fn analyze_flight_on(&self, query: &FlightQuery, today: NaiveDate) -> FlightRiskReport {
        let flight = match self.lookup_flight(query) {
            FlightLookup::Found(flight) => *flight,
            FlightLookup::NotFound => return FlightRiskReport::NotFound,
            FlightLookup::Unavailable => return FlightRiskReport::Unavailable,
        };
        let date = normalize_travel_date(&query.date);

        let on_time = self.airline_on_time(&flight.airline_code);
        let weather = self.weather();
        let origin_weather = weather.assess(&flight.origin, &date, today);
        let destination_weather = weather.assess(&flight.destination, &date, today);
        let origin_complexity = self.airport_complexity(&flight.origin);
        let destination_complexity = self.airport_complexity(&flight.destination);

        let itineraries = self.assess_itineraries(std::slice::from_ref(&flight), &date, today);
        let layovers = itineraries.layovers.into_iter().next().unwrap_or_default();
        let layover_weather = itineraries.weather;

        let seasonal_factors = seasonal_factors(
            self.generator(),
            &flight.origin,
            &flight.destination,
            &date,
            &flight.flight_number,
            today,
        );

        let weather_parts: Vec<&WeatherAssessment> = [&origin_weather, &destination_weather]
            .into_iter()
            .chain(&layover_weather)
            .collect();
        let overall_risk = overall_risk(&weather_parts, &layovers, on_time.as_ref());
        let insurance = recommend_insurance(
            self.generator(),
            &InsuranceContext {
                flight: &flight,
                travel_date: &date,
                layovers: &layovers,
                origin_weather: &origin_weather,
                destination_weather: &destination_weather,
                origin_complexity: &origin_complexity,
                destination_complexity: &destination_complexity,
                layover_weather: &layover_weather,
                seasonal: &seasonal_factors,
                on_time: on_time.as_ref(),
                overall: overall_risk,
            },
        );
        info!(
            "{} analyzed: {} risk ({}/100), {:?}",
            flight.flight_number, overall_risk.risk_level, overall_risk.risk_score, insurance.recommendation_type
        );

        FlightRiskReport::Analyzed(Box::new(FlightAnalysis {
            entry: FlightRiskEntry { flight, layovers },
            on_time,
            origin_weather,
            destination_weather,
            origin_complexity,
            destination_complexity,
            layover_weather,
            seasonal_factors,
            overall_risk,
            insurance,
        }))
    }

    /// Weather and complexity per layover airport, then feasibility per
    /// distinct airport and duration, joined back onto every flight.
    ///
    /// The batch reply is keyed by airport, so layovers of different length
    /// at the same airport go to separate batch rounds.
    fn assess_itineraries(
        &self,
        flights: &[FlightRecord],
        travel_date: &str,
        today: NaiveDate,
    ) -> ItineraryAssessment {
        let airports = layover_airports(flights);
        let weather_service = self.weather();
        let weather: Vec<WeatherAssessment> = airports
            .iter()
            .map(|code| weather_service.assess(code, travel_date, today))
            .collect();
        let complexity: HashMap<String, AirportComplexity> = airports
            .iter()
            .map(|code| (code.clone(), self.airport_complexity(code)))
            .collect();

        let descriptors = layover_descriptors(flights, &weather, &complexity, travel_date);
        let context = LayoverContext {
            travel_date: Some(travel_date.to_string()),
            ..LayoverContext::default()
        };
        let analyzer = self.layovers();
        let mut assessments: HashMap<(String, u32), BatchLayoverAssessment> = HashMap::new();
        for round in batch_rounds(descriptors) {
            let mut results = analyzer.analyze_batch(&round, &context);
            for descriptor in round {
                if let Some(assessment) = results.remove(&descriptor.airport_code) {
                    assessments.insert((descriptor.airport_code, descriptor.duration_minutes), assessment);
                }
            }
        }
        info!(
            "{} layovers assessed across {} airports",
            assessments.len(),
            airports.len()
        );

        let layovers = flights
            .iter()
            .map(|flight| {
                flight
                    .layovers()
                    .map(|layover| {
                        let code = layover.airport_code.trim().to_uppercase();
                        LayoverReport {
                            airport_code: layover.airport_code.clone(),
                            duration_minutes: layover.duration_minutes,
                            duration: layover.duration.clone(),
                            complexity: complexity.get(&code).cloned(),
                            assessment: layover
                                .duration_minutes
                                .filter(|m| *m > 0)
                                .and_then(|m| assessments.get(&(code, m)).cloned()),
                        }
                    })
                    .collect()
            })
            .collect();

        ItineraryAssessment { weather, layovers }
    }
}

/// Layover side of a set of flights
struct ItineraryAssessment {
    /// One entry per unique layover airport, first-seen order
    weather: Vec<WeatherAssessment>,
    /// Per flight, in input order
    layovers: Vec<Vec<LayoverReport>>,
}

fn is_known_airport(code: &str) -> bool {
    !code.is_empty() && code != UNKNOWN.to_uppercase()
}

/// Unique known layover airports, in first-seen order
fn layover_airports(flights: &[FlightRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for layover in flights.iter().flat_map(FlightRecord::layovers) {
        let code = layover.airport_code.trim().to_uppercase();
        if !is_known_airport(&code) || seen.contains(&code) {
            continue;
        }
        seen.push(code);
    }
    seen
}

/// One descriptor per distinct airport and known duration, first-seen order
fn layover_descriptors(
    flights: &[FlightRecord],
    weather: &[WeatherAssessment],
    complexity: &HashMap<String, AirportComplexity>,
    travel_date: &str,
) -> Vec<LayoverDescriptor> {
    let mut descriptors: Vec<LayoverDescriptor> = Vec::new();
    for layover in flights.iter().flat_map(FlightRecord::layovers) {
        let code = layover.airport_code.trim().to_uppercase();
        let Some(minutes) = layover.duration_minutes.filter(|m| *m > 0) else {
            continue;
        };
        if !is_known_airport(&code)
            || descriptors
                .iter()
                .any(|d| d.airport_code == code && d.duration_minutes == minutes)
        {
            continue;
        }
        let assessment = weather.iter().find(|w| w.airport_code == code);
        let airport_complexity = complexity
            .get(&code)
            .map(|c| c.complexity)
            .filter(|c| *c != ComplexityLevel::Unknown)
            .or_else(|| {
                assessment
                    .map(|w| w.airport_complexity.complexity)
                    .filter(|c| *c != ComplexityLevel::Unknown)
            });
        descriptors.push(LayoverDescriptor {
            airport_code: code,
            airport_name: layover.airport_name.clone(),
            city: layover.city.clone(),
            duration_minutes: minutes,
            weather_risk: assessment.map(|w| w.risk_level),
            airport_complexity,
            arrival_time: Some(layover.arrival_time.clone()),
            travel_date: Some(travel_date.to_string()),
        });
    }
    descriptors
}

/// Split descriptors so no round names an airport twice. The n-th distinct
/// duration seen at an airport goes to round n.
fn batch_rounds(descriptors: Vec<LayoverDescriptor>) -> Vec<Vec<LayoverDescriptor>> {
    let mut rounds: Vec<Vec<LayoverDescriptor>> = Vec::new();
    for descriptor in descriptors {
        let index = rounds
            .iter()
            .take_while(|round| round.iter().any(|d| d.airport_code == descriptor.airport_code))
            .count();
        if index == rounds.len() {
            rounds.push(Vec::new());
        }
        rounds[index].push(descriptor);
    }
    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::FlightSearchRequest;
    use crate::models::{LiveConditions, Provenance, RecommendationType, RiskLevel};
    use serde_json::{Map, Value, json};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeSearch {
        data: Value,
    }

    impl FlightSearchProvider for FakeSearch {
        fn search_flights(&self, _request: &FlightSearchRequest) -> Result<Value> {
            Ok(self.data.clone())
        }

        fn current_weather(&self, _airport_code: &str) -> Result<Option<LiveConditions>> {
            Ok(Some(LiveConditions {
                conditions: "Thunderstorms".to_string(),
                ..LiveConditions::default()
            }))
        }
    }

    /// Answers batch prompts with a fixed map and everything else with prose
    struct BatchOnly {
        reply: String,
        prompts: RefCell<Vec<String>>,
    }

    impl TextGenerator for BatchOnly {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            if prompt.contains("keyed by airport code") {
                Ok(self.reply.clone())
            } else {
                Ok("The weather looks fine to me".to_string())
            }
        }
    }

    fn segment(from: &str, to: &str, number: &str) -> Value {
        json!({
            "departure_airport": {"id": from, "name": format!("{from} Airport"), "time": "2025-07-12 08:00"},
            "arrival_airport": {"id": to, "name": format!("{to} Airport"), "time": "2025-07-12 10:00"},
            "airline": "United",
            "flight_number": number,
            "duration": 120
        })
    }

    fn search_data() -> Value {
        json!({
            "best_flights": [
                {
                    "flights": [segment("SFO", "DEN", "UA 1"), segment("DEN", "BOS", "UA 2")],
                    "layovers": [{"id": "DEN", "name": "Denver International Airport", "duration": 50}],
                    "total_duration": 290
                },
                {
                    "flights": [segment("SFO", "ORD", "UA 3"), segment("ORD", "BOS", "UA 4")],
                    "layovers": [],
                    "total_duration": 330
                },
                {
                    "flights": [segment("SFO", "BOS", "UA 5")],
                    "total_duration": 340
                }
            ]
        })
    }

    fn service(generator: Option<Box<dyn TextGenerator>>) -> FlightRiskService {
        service_with(search_data(), generator, AnalysisConfig::default())
    }

    fn service_with(
        data: Value,
        generator: Option<Box<dyn TextGenerator>>,
        analysis: AnalysisConfig,
    ) -> FlightRiskService {
        FlightRiskService::new(
            Collaborators {
                search: Some(Box::new(FakeSearch { data })),
                generator,
                warehouse: None,
            },
            analysis,
        )
    }

    /// Two itineraries through DEN with very different connection times
    fn same_hub_data() -> Value {
        json!({
            "best_flights": [
                {
                    "flights": [segment("SFO", "DEN", "UA 1"), segment("DEN", "BOS", "UA 2")],
                    "layovers": [{"id": "DEN", "name": "Denver International Airport", "duration": 40}],
                    "total_duration": 280
                },
                {
                    "flights": [segment("SFO", "DEN", "UA 7"), segment("DEN", "BOS", "UA 8")],
                    "layovers": [{"id": "DEN", "name": "Denver International Airport", "duration": 300}],
                    "total_duration": 540
                }
            ]
        })
    }

    /// Answers each batch round according to the layover length it names
    struct ByDuration {
        answer_long: bool,
        prompts: RefCell<Vec<String>>,
    }

    impl TextGenerator for ByDuration {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            let reply = if !prompt.contains("keyed by airport code") {
                "No idea"
            } else if prompt.contains("(40 minutes)") {
                r#"{"DEN": {"risk_level": "high", "risk_score": 80, "overall_feasibility": "risky"}}"#
            } else if prompt.contains("(300 minutes)") && self.answer_long {
                r#"{"DEN": {"risk_level": "low", "risk_score": 15, "overall_feasibility": "comfortable"}}"#
            } else {
                "{}"
            };
            Ok(reply.to_string())
        }
    }

    fn route() -> RouteInfo {
        RouteInfo {
            origin: "SFO".to_string(),
            destination: "BOS".to_string(),
            date: "2025-07-12".to_string(),
            connections: Vec::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
    }

    #[test]
    fn test_route_report_joins_assessments() {
        let generator = BatchOnly {
            reply: r#"{"DEN": {"risk_level": "high", "risk_score": 70, "overall_feasibility": "Tight"}}"#
                .to_string(),
            prompts: RefCell::new(Vec::new()),
        };
        let service = service(Some(Box::new(generator)));

        let report = service.analyze_route_on(&route(), today());

        assert!(report.search.success);
        assert_eq!(report.flights.len(), 3);
        let origin = report.origin_weather.unwrap();
        assert_eq!(origin.airport_code, "SFO");
        assert_eq!(origin.deterministic_risk, Some(RiskLevel::High));
        assert_eq!(origin.provenance, Provenance::Fallback);

        let layover_codes: Vec<_> = report
            .layover_weather
            .iter()
            .map(|w| w.airport_code.as_str())
            .collect();
        assert_eq!(layover_codes, vec!["DEN", "ORD"]);

        let den = &report.flights[0].layovers[0];
        assert_eq!(den.airport_code, "DEN");
        assert_eq!(den.duration, "50m");
        let assessment = den.assessment.as_ref().unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.provenance, Provenance::Model);

        // Synthesized layover has no known duration and gets no assessment
        let ord = &report.flights[1].layovers[0];
        assert_eq!(ord.duration, "Unknown");
        assert!(ord.assessment.is_none());

        assert!(report.flights[2].layovers.is_empty());
    }

    #[test]
    fn test_same_hub_layovers_assessed_by_duration() {
        let generator = ByDuration {
            answer_long: true,
            prompts: RefCell::new(Vec::new()),
        };
        let service = service_with(
            same_hub_data(),
            Some(Box::new(generator)),
            AnalysisConfig::default(),
        );

        let report = service.analyze_route_on(&route(), today());

        assert_eq!(report.layover_weather.len(), 1);
        let short = &report.flights[0].layovers[0];
        let long = &report.flights[1].layovers[0];
        assert_eq!(short.duration_minutes, Some(40));
        assert_eq!(long.duration_minutes, Some(300));

        let short = short.assessment.as_ref().unwrap();
        assert_eq!(short.risk_level, RiskLevel::High);
        assert_eq!(short.risk_score, 80);
        let long = long.assessment.as_ref().unwrap();
        assert_eq!(long.risk_level, RiskLevel::Low);
        assert_eq!(long.risk_score, 15);
    }

    #[test]
    fn test_unanswered_round_leaves_layover_unassessed() {
        let generator = ByDuration {
            answer_long: false,
            prompts: RefCell::new(Vec::new()),
        };
        let service = service_with(
            same_hub_data(),
            Some(Box::new(generator)),
            AnalysisConfig::default(),
        );

        let report = service.analyze_route_on(&route(), today());

        let short = report.flights[0].layovers[0].assessment.as_ref().unwrap();
        assert_eq!(short.risk_score, 80);
        assert!(report.flights[1].layovers[0].assessment.is_none());
    }

    #[test]
    fn test_heuristic_follows_each_layover_duration() {
        let analysis = AnalysisConfig {
            batch_heuristic_fallback: true,
            ..AnalysisConfig::default()
        };
        let service = service_with(same_hub_data(), None, analysis);

        let report = service.analyze_route_on(&route(), today());

        let short = report.flights[0].layovers[0].assessment.as_ref().unwrap();
        let long = report.flights[1].layovers[0].assessment.as_ref().unwrap();
        assert_eq!(short.risk_level, RiskLevel::High);
        assert_eq!(long.risk_level, RiskLevel::Low);
        assert_eq!(long.provenance, Provenance::Heuristic);
    }

    #[test]
    fn test_batch_rounds_never_repeat_an_airport() {
        let descriptor = |code: &str, minutes: u32| LayoverDescriptor {
            airport_code: code.to_string(),
            airport_name: String::new(),
            city: String::new(),
            duration_minutes: minutes,
            weather_risk: None,
            airport_complexity: None,
            arrival_time: None,
            travel_date: None,
        };
        let rounds = batch_rounds(vec![
            descriptor("DEN", 40),
            descriptor("ORD", 90),
            descriptor("DEN", 300),
            descriptor("DEN", 75),
            descriptor("ATL", 60),
        ]);

        let shape: Vec<Vec<(&str, u32)>> = rounds
            .iter()
            .map(|round| {
                round
                    .iter()
                    .map(|d| (d.airport_code.as_str(), d.duration_minutes))
                    .collect()
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                vec![("DEN", 40), ("ORD", 90), ("ATL", 60)],
                vec![("DEN", 300)],
                vec![("DEN", 75)],
            ]
        );
    }

    /// Rates every airport as highly complex and answers batches with nothing
    struct ComplexHubs {
        prompts: Rc<RefCell<Vec<String>>>,
    }

    impl TextGenerator for ComplexHubs {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            if prompt.contains("operationally complex") {
                Ok(r#"{"complexity": "high", "description": "Major hub", "concerns": ["Long taxi times"]}"#
                    .to_string())
            } else if prompt.contains("keyed by airport code") {
                Ok("{}".to_string())
            } else {
                Ok("Nothing to add".to_string())
            }
        }
    }

    #[test]
    fn test_layover_complexity_feeds_batch() {
        let prompts = Rc::new(RefCell::new(Vec::new()));
        let service = service(Some(Box::new(ComplexHubs {
            prompts: Rc::clone(&prompts),
        })));

        let report = service.analyze_route_on(&route(), today());

        let den = &report.flights[0].layovers[0];
        let complexity = den.complexity.as_ref().unwrap();
        assert_eq!(complexity.complexity, ComplexityLevel::High);
        assert_eq!(complexity.provenance, Provenance::Model);
        // Synthesized layover still names a known airport
        assert!(report.flights[1].layovers[0].complexity.is_some());

        let prompts = prompts.borrow();
        let batch = prompts
            .iter()
            .find(|p| p.contains("keyed by airport code"))
            .unwrap();
        assert!(batch.contains("- Airport complexity: high"));
        assert_eq!(
            prompts.iter().filter(|p| p.contains("operationally complex")).count(),
            2
        );
    }

    #[test]
    fn test_missing_batch_entry_is_not_low_risk() {
        let service = service(None);
        let report = service.analyze_route_on(&route(), today());

        let den = &report.flights[0].layovers[0];
        assert!(den.assessment.is_none());
        assert!(!service.availability().generation);
    }

    /// Knows one Southwest flight through Denver
    struct FakeWarehouse {
        on_time: Result<Option<AirlineOnTime>>,
    }

    impl FlightWarehouse for FakeWarehouse {
        fn find_flight(&self, query: &FlightQuery) -> Result<Option<Map<String, Value>>> {
            if query.flight_number != "2417" {
                return Ok(None);
            }
            Ok(json!({
                "airline_code": "WN",
                "airline_name": "Southwest Airlines",
                "flight_number": 2417,
                "origin_airport_code": "MDW",
                "destination_airport_code": "PHX",
                "departure_time_local": "2025-07-12 14:20",
                "arrival_time_local": "2025-07-12 18:45",
                "duration_minutes": 385,
                "layovers": "[{\"city\": \"Denver\", \"airport_code\": \"DEN\", \"layover_duration_minutes\": 55}]"
            })
            .as_object()
            .cloned())
        }

        fn airline_on_time(&self, _airline_code: &str) -> Result<Option<AirlineOnTime>> {
            match &self.on_time {
                Ok(stats) => Ok(stats.clone()),
                Err(_) => Err(FlightRiskError::network("BigQuery", "timed out")),
            }
        }
    }

    fn warehouse_service(on_time: Result<Option<AirlineOnTime>>) -> FlightRiskService {
        FlightRiskService::new(
            Collaborators {
                warehouse: Some(Box::new(FakeWarehouse { on_time })),
                ..Collaborators::default()
            },
            AnalysisConfig::default(),
        )
    }

    fn flight_query(number: &str) -> FlightQuery {
        FlightQuery {
            airline_code: "wn".to_string(),
            airline_name: String::new(),
            flight_number: number.to_string(),
            date: "07/12/2025".to_string(),
        }
    }

    fn punctual(rate: f64) -> AirlineOnTime {
        AirlineOnTime {
            airline_code: "WN".to_string(),
            total_flights: 5000,
            on_time_rate: rate,
            cancellation_rate: 1.2,
            diversion_rate: 0.2,
            delay_rate: 100.0 - rate,
            severe_delay_rate: 4.0,
            avg_departure_delay_minutes: Some(9.5),
            avg_arrival_delay_minutes: Some(4.1),
        }
    }

    #[test]
    fn test_flight_analysis_without_generation() {
        let service = warehouse_service(Ok(Some(punctual(85.0))));

        let FlightRiskReport::Analyzed(analysis) = service.analyze_flight_on(&flight_query("2417"), today())
        else {
            panic!("expected an analysis");
        };

        assert_eq!(analysis.entry.flight.flight_number, "WN2417");
        assert_eq!(analysis.origin_weather.airport_code, "MDW");
        assert_eq!(analysis.destination_weather.airport_code, "PHX");
        assert_eq!(analysis.origin_complexity.complexity, ComplexityLevel::Unknown);
        assert_eq!(analysis.on_time.as_ref().unwrap().on_time_rate, 85.0);

        let den = &analysis.entry.layovers[0];
        assert_eq!(den.airport_code, "DEN");
        assert_eq!(den.duration_minutes, Some(55));
        assert!(den.assessment.is_none());
        assert_eq!(analysis.layover_weather.len(), 1);

        assert_eq!(analysis.seasonal_factors.season, "Summer");
        assert_eq!(analysis.seasonal_factors.provenance, Provenance::Fallback);

        // Only the unassessed 55 minute connection and punctuality count
        assert_eq!(analysis.overall_risk.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.overall_risk.risk_score, 50);
        assert!(!analysis.overall_risk.defaulted);
        assert_eq!(
            analysis.insurance.recommendation_type,
            RecommendationType::ConsiderInsurance
        );
        assert_eq!(analysis.insurance.provenance, Provenance::Fallback);

        let rendered = serde_json::to_value(FlightRiskReport::Analyzed(analysis)).unwrap();
        assert_eq!(rendered["status"], "analyzed");
        assert_eq!(rendered["analysis"]["insurance"]["recommendation_type"], "consider_insurance");
    }

    #[test]
    fn test_flight_analysis_survives_on_time_failure() {
        let service = warehouse_service(Err(FlightRiskError::network("BigQuery", "timed out")));

        let FlightRiskReport::Analyzed(analysis) = service.analyze_flight_on(&flight_query("WN2417"), today())
        else {
            panic!("expected an analysis");
        };
        assert!(analysis.on_time.is_none());
    }

    #[test]
    fn test_flight_analysis_passes_lookup_outcomes_through() {
        let service = warehouse_service(Ok(None));
        assert_eq!(
            service.analyze_flight_on(&flight_query("1"), today()),
            FlightRiskReport::NotFound
        );

        let service = FlightRiskService::new(Collaborators::default(), AnalysisConfig::default());
        assert_eq!(
            service.analyze_flight_on(&flight_query("2417"), today()),
            FlightRiskReport::Unavailable
        );
        assert!(service.airline_on_time("WN").is_none());
    }

    #[test]
    fn test_failed_search_has_no_assessments() {
        let service = FlightRiskService::new(Collaborators::default(), AnalysisConfig::default());
        let report = service.analyze_route_on(&route(), today());

        assert!(!report.search.success);
        assert!(report.origin_weather.is_none());
        assert!(report.flights.is_empty());
    }

    #[test]
    fn test_from_config_requires_search_key() {
        let config = FlightRiskConfig::default();
        assert!(matches!(
            FlightRiskService::from_config(&config),
            Err(FlightRiskError::Config { .. })
        ));
    }

    #[test]
    fn test_from_config_optional_collaborators() {
        let mut config = FlightRiskConfig::default();
        config.search.api_key = Some("serp-test-key-123456".to_string());

        let service = FlightRiskService::from_config(&config).unwrap();
        assert_eq!(
            service.availability(),
            Availability {
                search: true,
                generation: false,
                warehouse: false,
            }
        );
        assert_eq!(
            service.lookup_flight(&FlightQuery {
                airline_code: "UA".to_string(),
                airline_name: "United Airlines".to_string(),
                flight_number: "1".to_string(),
                date: "2025-07-12".to_string(),
            }),
            FlightLookup::Unavailable
        );
    }
}
