//! Seasonal risk factors for a travel date
//!
//! The model is asked for five short factors covering weather patterns,
//! holidays and congestion. A reply with fewer than five is replaced by a
//! fixed list for the season.

use chrono::{Datelike, NaiveDate};
use tracing::{info, instrument, warn};

use crate::clients::TextGenerator;
use crate::model_response::parse_or_else;
use crate::models::{Provenance, SeasonalFactors};
use crate::normalize::{UNKNOWN, normalize_travel_date};
use crate::weather::season_for_month;

pub const FACTOR_COUNT: usize = 5;

const WINTER: [&str; FACTOR_COUNT] = [
    "Winter weather may cause de-icing delays",
    "Holiday travel season can increase congestion",
    "Winter storms possible in some regions",
    "Cold weather operational considerations",
    "Seasonal maintenance schedules may apply",
];
const SPRING: [&str; FACTOR_COUNT] = [
    "Spring weather generally favorable for travel",
    "Seasonal thunderstorms possible",
    "Spring rain patterns may affect schedules",
    "Post-winter maintenance activities",
    "Mild congestion during vacation periods",
];
const SUMMER: [&str; FACTOR_COUNT] = [
    "Peak travel season with higher passenger volumes",
    "Summer thunderstorms common in afternoons",
    "Vacation season increases airport congestion",
    "Heat-related operational delays possible",
    "Extended daylight hours benefit operations",
];
const FALL: [&str; FACTOR_COUNT] = [
    "Fall travel season with moderate congestion",
    "Seasonal weather patterns changing",
    "Thanksgiving holiday travel surge possible",
    "Fall wind patterns may affect flights",
    "Generally stable weather conditions",
];
const UNDATED: [&str; FACTOR_COUNT] = [
    "Seasonal travel patterns apply",
    "Weather conditions vary by season",
    "Standard airline operations in effect",
    "Airport congestion varies by time of year",
    "Flight schedules optimized for season",
];

fn parse_date(travel_date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&normalize_travel_date(travel_date), "%Y-%m-%d").ok()
}

/// Fixed factors for the season of `travel_date`
#[must_use]
pub fn basic_seasonal_factors(travel_date: &str) -> SeasonalFactors {
    let (season, factors) = match parse_date(travel_date) {
        Some(date) => {
            let season = season_for_month(date.month());
            let factors = match season {
                "Winter" => WINTER,
                "Spring" => SPRING,
                "Summer" => SUMMER,
                _ => FALL,
            };
            (season, factors)
        }
        None => (UNKNOWN, UNDATED),
    };
    SeasonalFactors {
        season: season.to_string(),
        factors: factors.iter().map(ToString::to_string).collect(),
        provenance: Provenance::Fallback,
    }
}

fn seasonal_prompt(
    origin: &str,
    destination: &str,
    flight_number: &str,
    date: NaiveDate,
    season: &str,
    days_until_flight: i64,
) -> String {
    format!(
        r#"You are a flight risk analyst. Generate exactly {FACTOR_COUNT} seasonal risk factors for this flight.

Flight: {flight_number}
Route: {origin} to {destination}
Travel date: {long_date} ({weekday})
Season: {season}
Days until travel: {days_until_flight}

Consider typical {season} weather at both airports, nearby holidays, peak travel
periods, seasonal airport congestion, weather-related delays, seasonal airline
schedule changes, tourism patterns and {weekday} travel patterns.

Each factor must be specific and at most 70 characters.

Answer with a JSON array of exactly {FACTOR_COUNT} strings and nothing else."#,
        long_date = date.format("%B %d, %Y"),
        weekday = date.format("%A"),
    )
}

/// Five seasonal risk factors for a flight.
///
/// Falls back to [`basic_seasonal_factors`] when the date cannot be read, no
/// generator is configured, generation fails or the reply is short.
#[instrument(skip(generator, today))]
pub fn seasonal_factors(
    generator: Option<&dyn TextGenerator>,
    origin: &str,
    destination: &str,
    travel_date: &str,
    flight_number: &str,
    today: NaiveDate,
) -> SeasonalFactors {
    let fallback = basic_seasonal_factors(travel_date);
    let Some(date) = parse_date(travel_date) else {
        warn!("Unparsable travel date '{}', using generic factors", travel_date);
        return fallback;
    };
    let Some(generator) = generator else {
        return fallback;
    };

    let season = season_for_month(date.month());
    let prompt = seasonal_prompt(
        origin,
        destination,
        flight_number,
        date,
        season,
        (date - today).num_days(),
    );
    let reply = match generator.generate(&prompt) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Seasonal factor generation failed for {}: {}", flight_number, e);
            return fallback;
        }
    };

    let factors: Vec<String> = parse_or_else(&reply, Vec::new);
    let factors: Vec<String> = factors
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .take(FACTOR_COUNT)
        .collect();
    if factors.len() < FACTOR_COUNT {
        warn!(
            "Only {} seasonal factors generated for {}, using {} defaults",
            factors.len(),
            flight_number,
            season
        );
        return fallback;
    }

    info!("Generated seasonal factors for {}", flight_number);
    SeasonalFactors {
        season: season.to_string(),
        factors,
        provenance: Provenance::Model,
    }
}
