//! Overall flight risk and the travel insurance advice derived from it

use std::fmt::Write as _;

use tracing::{info, instrument, warn};

use crate::clients::TextGenerator;
use crate::models::{
    AirlineOnTime, AirportComplexity, ConnectionType, FlightRecord, InsuranceRecommendation,
    LayoverReport, OverallRisk, Provenance, RecommendationType, RiskLevel, SeasonalFactors,
    WeatherAssessment,
};

fn level_score(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::VeryLow => 10,
        RiskLevel::Low => 25,
        RiskLevel::Medium => 50,
        RiskLevel::High => 75,
        RiskLevel::Critical => 90,
    }
}

fn on_time_level(rate: f64) -> RiskLevel {
    if rate >= 80.0 {
        RiskLevel::Low
    } else if rate >= 70.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Highest tier and score over every assessed component.
///
/// Fallback weather carries no information and is skipped. A layover without
/// an assessment counts at its connection tier's baseline risk. With nothing
/// to go on the result is a defaulted medium, never low.
#[must_use]
pub fn overall_risk(
    weather: &[&WeatherAssessment],
    layovers: &[LayoverReport],
    on_time: Option<&AirlineOnTime>,
) -> OverallRisk {
    let weather_parts = weather
        .iter()
        .filter(|w| !w.provenance.is_fallback())
        .map(|w| (w.risk_level, level_score(w.risk_level)));

    let layover_parts = layovers.iter().filter_map(|layover| {
        match (&layover.assessment, layover.duration_minutes) {
            (Some(assessment), _) => Some((assessment.risk_level, assessment.risk_score)),
            (None, Some(minutes)) => {
                let baseline = ConnectionType::from_minutes(minutes).baseline_risk();
                Some((baseline, level_score(baseline)))
            }
            (None, None) => None,
        }
    });

    let punctuality = on_time.map(|stats| {
        let level = on_time_level(stats.on_time_rate);
        (level, level_score(level))
    });

    weather_parts
        .chain(layover_parts)
        .chain(punctuality)
        .reduce(|(level_a, score_a), (level_b, score_b)| (level_a.max(level_b), score_a.max(score_b)))
        .map_or(
            OverallRisk {
                risk_level: RiskLevel::Medium,
                risk_score: level_score(RiskLevel::Medium),
                defaulted: true,
            },
            |(risk_level, risk_score)| OverallRisk {
                risk_level,
                risk_score,
                defaulted: false,
            },
        )
}

impl RecommendationType {
    #[must_use]
    pub fn for_risk(risk: OverallRisk) -> Self {
        match risk.risk_level {
            RiskLevel::High | RiskLevel::Critical => Self::StronglyRecommend,
            _ if risk.risk_score > 70 => Self::StronglyRecommend,
            RiskLevel::VeryLow | RiskLevel::Low if risk.risk_score < 30 => Self::SkipInsurance,
            _ => Self::ConsiderInsurance,
        }
    }

    #[must_use]
    pub fn fallback_text(&self) -> &'static str {
        match self {
            Self::SkipInsurance => {
                "Low-risk flight with minimal disruption probability. Travel insurance likely unnecessary - save the money for your trip."
            }
            Self::ConsiderInsurance => {
                "Moderate risk factors suggest considering travel insurance. Provides peace of mind and protection against unexpected disruptions."
            }
            Self::StronglyRecommend => {
                "High-risk factors present. Strongly recommend travel insurance for protection against delays, cancellations, and missed connections."
            }
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            Self::SkipInsurance => {
                "explain why travel insurance is not necessary for this low-risk flight and that the traveller can save the money"
            }
            Self::ConsiderInsurance => {
                "suggest considering travel insurance because of moderate risk factors, weighing the benefits against the cost"
            }
            Self::StronglyRecommend => {
                "strongly recommend travel insurance because of the high-risk factors and explain why the cost is justified"
            }
        }
    }
}

/// Everything the advice is based on
pub struct InsuranceContext<'a> {
    pub flight: &'a FlightRecord,
    pub travel_date: &'a str,
    pub layovers: &'a [LayoverReport],
    pub origin_weather: &'a WeatherAssessment,
    pub destination_weather: &'a WeatherAssessment,
    pub origin_complexity: &'a AirportComplexity,
    pub destination_complexity: &'a AirportComplexity,
    pub layover_weather: &'a [WeatherAssessment],
    pub seasonal: &'a SeasonalFactors,
    pub on_time: Option<&'a AirlineOnTime>,
    pub overall: OverallRisk,
}

fn describe_airport(
    out: &mut String,
    role: &str,
    weather: &WeatherAssessment,
    complexity: &AirportComplexity,
) {
    let _ = writeln!(
        out,
        "{role} airport ({}): weather risk {} - {}",
        weather.airport_code, weather.risk_level, weather.description
    );
    let _ = writeln!(
        out,
        "{role} airport ({}) complexity: {} - {}",
        weather.airport_code, complexity.complexity, complexity.description
    );
}

fn describe(context: &InsuranceContext<'_>) -> String {
    let flight = context.flight;
    let mut out = String::new();
    let _ = writeln!(out, "Flight: {} {}", flight.airline_name, flight.flight_number);
    let _ = writeln!(out, "Route: {} to {}", flight.origin, flight.destination);
    let _ = writeln!(out, "Date: {}", context.travel_date);
    let _ = writeln!(out, "Total flight duration: {}", flight.duration);
    if flight.aircraft != crate::normalize::UNKNOWN {
        let _ = writeln!(out, "Aircraft type: {}", flight.aircraft);
    }
    if let Some(price) = flight.price {
        let _ = writeln!(out, "Flight cost: ${price}");
    }

    if context.layovers.is_empty() {
        let _ = writeln!(out, "Flight type: direct flight (no connections)");
    } else {
        let _ = writeln!(
            out,
            "Flight type: {}-stop flight with connections",
            context.layovers.len()
        );
    }
    for (i, layover) in context.layovers.iter().enumerate() {
        let tier = layover
            .duration_minutes
            .map_or("unknown connection time", |m| ConnectionType::from_minutes(m).as_str());
        let _ = writeln!(
            out,
            "Connection {}: {} - {} layover ({tier})",
            i + 1,
            layover.airport_code,
            layover.duration
        );
        if let Some(assessment) = &layover.assessment {
            let _ = writeln!(
                out,
                "  - feasibility: {} risk, score {}/100, {}",
                assessment.risk_level, assessment.risk_score, assessment.feasibility
            );
        }
        if let Some(weather) = context
            .layover_weather
            .iter()
            .find(|w| w.airport_code == layover.airport_code)
        {
            let _ = writeln!(
                out,
                "  - weather risk: {} - {}",
                weather.risk_level, weather.description
            );
        }
        if let Some(complexity) = &layover.complexity {
            let _ = writeln!(out, "  - complexity: {}", complexity.complexity);
        }
    }

    describe_airport(
        &mut out,
        "Origin",
        context.origin_weather,
        context.origin_complexity,
    );
    describe_airport(
        &mut out,
        "Destination",
        context.destination_weather,
        context.destination_complexity,
    );

    if let Some(stats) = context.on_time {
        let _ = writeln!(
            out,
            "Airline on-time rate: {}% over {} flights, cancellation rate {}%",
            stats.on_time_rate, stats.total_flights, stats.cancellation_rate
        );
    }
    let _ = writeln!(out, "Seasonal risk factors ({}):", context.seasonal.season);
    for factor in &context.seasonal.factors {
        let _ = writeln!(out, "  - {factor}");
    }
    let _ = writeln!(
        out,
        "Overall risk: {} ({}/100)",
        context.overall.risk_level, context.overall.risk_score
    );
    out
}

fn insurance_prompt(context: &InsuranceContext<'_>, kind: RecommendationType) -> String {
    format!(
        "You are an experienced travel insurance advisor giving concise, honest advice. \
         Based on this flight analysis, {guidance}.\n\n\
         Flight analysis:\n{details}\n\
         Keep it brief. Mention the specific connection times, weather conditions, airport \
         complexity and seasonal factors, explain briefly how each could affect the trip and \
         end with a clear recommendation.\n\n\
         Risk score: {score}/100 (0-30 low, 31-70 medium, 71-100 high). \
         Answer in plain text without Markdown.",
        guidance = kind.guidance(),
        details = describe(context),
        score = context.overall.risk_score,
    )
}

fn clean_advice(text: &str) -> String {
    text.replace('*', "")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Travel insurance advice for an analysed flight.
///
/// The recommendation type follows the overall risk deterministically. The
/// model only writes the text; without it, or on failure, the fixed text
/// for the type is used with provenance `fallback`.
#[instrument(skip_all, fields(flight = %context.flight.flight_number))]
pub fn recommend_insurance(
    generator: Option<&dyn TextGenerator>,
    context: &InsuranceContext<'_>,
) -> InsuranceRecommendation {
    let kind = RecommendationType::for_risk(context.overall);
    let fixed = |provenance| InsuranceRecommendation {
        recommendation_type: kind,
        recommendation: kind.fallback_text().to_string(),
        risk_level: context.overall.risk_level,
        risk_score: context.overall.risk_score,
        provenance,
    };

    let Some(generator) = generator else {
        return fixed(Provenance::Fallback);
    };

    match generator.generate(&insurance_prompt(context, kind)) {
        Ok(reply) => {
            let advice = clean_advice(&reply);
            if advice.is_empty() {
                warn!("Empty insurance advice, using fixed text");
                return fixed(Provenance::Fallback);
            }
            info!("Insurance advice generated ({:?})", kind);
            InsuranceRecommendation {
                recommendation: advice,
                ..fixed(Provenance::Model)
            }
        }
        Err(e) => {
            warn!("Insurance advice generation failed: {}", e);
            fixed(Provenance::Fallback)
        }
    }
}
