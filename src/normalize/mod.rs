//! Flight record normalization
//!
//! Converts search provider itineraries and warehouse rows into the canonical
//! [`FlightRecord`]. Missing fields become `Unknown` placeholders; a single
//! malformed itinerary never aborts the whole result set.

pub mod tables;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{ConnectionSegment, FlightRecord, LayoverInfo, Provenance, SegmentEndpoint};

pub const UNKNOWN: &str = "Unknown";

/// Airport block of a provider segment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirportPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    pub time: Option<String>,
}

/// One leg as reported by the search provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentPayload {
    #[serde(default)]
    pub departure_airport: AirportPayload,
    #[serde(default)]
    pub arrival_airport: AirportPayload,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub airplane: Option<String>,
    pub aircraft: Option<String>,
    pub aircraft_type: Option<String>,
    pub duration: Option<i64>,
}

impl SegmentPayload {
    fn aircraft(&self) -> String {
        self.airplane
            .as_ref()
            .or(self.aircraft.as_ref())
            .or(self.aircraft_type.as_ref())
            .cloned()
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Ground time as reported by the search provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoverPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    pub duration: Option<i64>,
    #[serde(default)]
    pub overnight: bool,
}

/// One bookable option from the search provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItineraryPayload {
    #[serde(default)]
    pub flights: Vec<SegmentPayload>,
    #[serde(default)]
    pub layovers: Vec<LayoverPayload>,
    pub total_duration: Option<i64>,
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub trip_type: Option<String>,
}

/// Derive the airline code for a flight.
///
/// Precedence: alphanumeric prefix of the flight number, then the airline
/// name table, then initials of the first two words of the name, then
/// `Unknown`. A prefix must contain a letter so bare numbers fall through.
#[must_use]
pub fn extract_airline_code(flight_number: &str, airline_name: &str) -> String {
    if let Some(code) = airline_code_prefix(flight_number) {
        debug!("Extracted airline code '{}' from '{}'", code, flight_number);
        return code;
    }

    if let Some(code) = tables::airline_code_for_name(airline_name) {
        return code.to_string();
    }

    let words: Vec<&str> = airline_name.split_whitespace().collect();
    if airline_name.trim().len() >= 2 && words.len() >= 2 {
        let initials: String = words
            .iter()
            .take(2)
            .filter_map(|w| w.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        debug!("Guessed airline code '{}' from '{}'", initials, airline_name);
        return initials;
    }

    warn!(
        "Could not determine airline code for '{}' / '{}'",
        airline_name, flight_number
    );
    UNKNOWN.to_string()
}

fn airline_code_prefix(flight_number: &str) -> Option<String> {
    let upper = flight_number.trim().to_uppercase();
    if upper.chars().count() < 2 {
        return None;
    }

    let run: Vec<char> = upper
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    if !run.iter().any(char::is_ascii_alphabetic) {
        return None;
    }

    let leading_letters = run.iter().take_while(|c| c.is_ascii_alphabetic()).count();
    if leading_letters >= 2 {
        return Some(run.iter().take(leading_letters.min(3)).collect());
    }

    // Mixed designators such as B6 or 9W
    let pair: String = run.iter().take(2).collect();
    (pair.chars().count() == 2 && pair.chars().any(|c| c.is_ascii_alphabetic())).then_some(pair)
}

/// Strip the airline code from the front of a flight number.
///
/// Leading separators after the code are dropped too. When nothing is left,
/// or the code is unknown, the original string is returned.
#[must_use]
pub fn clean_flight_number(flight_number: &str, airline_code: &str) -> String {
    let code = airline_code.trim().to_uppercase();
    if flight_number.is_empty() || code.is_empty() || code == UNKNOWN.to_uppercase() {
        return flight_number.to_string();
    }

    let upper = flight_number.trim().to_uppercase();
    if let Some(rest) = upper.strip_prefix(&code) {
        let cleaned = rest
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
        if !cleaned.is_empty() {
            return cleaned.to_string();
        }
    }

    flight_number.to_string()
}

/// Minutes as `{h}h {m}m`, `{h}h` or `{m}m`; zero and negative are `Unknown`
#[must_use]
pub fn format_duration(minutes: i64) -> String {
    if minutes <= 0 {
        return UNKNOWN.to_string();
    }
    render_minutes(minutes)
}

/// Warehouse variant: parses loosely typed minutes and renders invalid or
/// negative input as `0m`
#[must_use]
pub fn format_duration_lenient(raw: &str) -> String {
    match parse_minutes(raw) {
        Some(minutes) if minutes > 0 => render_minutes(minutes),
        _ => "0m".to_string(),
    }
}

fn render_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

fn parse_minutes(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

/// Render a `YYYY-MM-DD HH:MM` timestamp as a 12-hour clock time, e.g.
/// `6:59 AM`.
///
/// Empty or blank input becomes `Unknown`. Anything else that does not
/// parse is returned unchanged.
#[must_use]
pub fn format_time(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN {
        return UNKNOWN.to_string();
    }

    match NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M") {
        Ok(time) => time.format("%-I:%M %p").to_string(),
        Err(e) => {
            debug!("Leaving time '{}' unformatted: {}", raw, e);
            raw.to_string()
        }
    }
}

/// City for an airport code, falling back to the airport name with common
/// suffixes removed, then to the raw code
#[must_use]
pub fn resolve_city(code: &str, name: &str) -> String {
    if let Some(city) = tables::city_for_code(code) {
        return city.to_string();
    }
    if !name.trim().is_empty() && name != UNKNOWN {
        return city_from_airport_name(name);
    }
    if !code.trim().is_empty() {
        return code.trim().to_string();
    }
    UNKNOWN.to_string()
}

/// `Los Angeles International Airport` becomes `Los Angeles`
#[must_use]
pub fn city_from_airport_name(name: &str) -> String {
    let mut city = name.trim();
    for suffix in tables::AIRPORT_NAME_SUFFIXES {
        if let Some(stripped) = city.strip_suffix(suffix) {
            city = stripped.trim();
        }
    }
    if city.is_empty() {
        UNKNOWN.to_string()
    } else {
        city.to_string()
    }
}

/// Display name for an airline code, or the code itself
#[must_use]
pub fn airline_name_for_code(code: &str) -> String {
    tables::airline_name_for_code(code)
        .map_or_else(|| code.to_string(), ToString::to_string)
}

/// Bring a user-supplied travel date into `YYYY-MM-DD`.
///
/// Accepts `2025-07-12`, `07/12/2025`, `July 12, 2025` and ordinal forms
/// such as `July 12th, 2025`. Anything else is returned unchanged.
#[must_use]
pub fn normalize_travel_date(raw: &str) -> String {
    let trimmed = raw.trim();
    let candidate = strip_ordinal_suffix(trimmed);

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%B %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    warn!("Could not parse travel date '{}'", raw);
    raw.to_string()
}

fn strip_ordinal_suffix(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        out.push(chars[i]);
        if chars[i].is_ascii_digit() && i + 2 < chars.len() {
            let suffix: String = chars[i + 1..i + 3].iter().collect::<String>().to_lowercase();
            let at_boundary = chars.get(i + 3).is_none_or(|c| !c.is_alphanumeric());
            if at_boundary && matches!(suffix.as_str(), "st" | "nd" | "rd" | "th") {
                i += 3;
                continue;
            }
        }
        i += 1;
    }
    out
}

/// Collect itineraries from a flight search response, best options first.
///
/// Entries that do not match the expected shape are skipped with a warning.
#[must_use]
pub fn itineraries_from_response(response: &Value) -> Vec<ItineraryPayload> {
    ["best_flights", "other_flights"]
        .iter()
        .filter_map(|key| response.get(*key).and_then(Value::as_array))
        .flatten()
        .enumerate()
        .filter_map(|(index, raw)| {
            match serde_json::from_value::<ItineraryPayload>(raw.clone()) {
                Ok(itinerary) => Some(itinerary),
                Err(e) => {
                    warn!("Skipping malformed itinerary {}: {}", index + 1, e);
                    None
                }
            }
        })
        .collect()
}

/// Normalize one provider itinerary.
///
/// Returns `None` when the itinerary has no segments. For an itinerary with
/// `n` segments the record carries `n` connection segments of which the first
/// `n - 1` have layover info; gaps in the provider's layover list are
/// synthesized from the neighbouring segments.
#[must_use]
pub fn normalize_itinerary(
    itinerary: &ItineraryPayload,
    origin: &str,
    destination: &str,
) -> Option<FlightRecord> {
    let segments = &itinerary.flights;
    let first = segments.first()?;
    let last = segments.last()?;

    let airline_name = first.airline.clone().unwrap_or_else(|| UNKNOWN.to_string());
    let raw_number = first.flight_number.clone().unwrap_or_default();
    let airline_code = extract_airline_code(&raw_number, &airline_name);
    let flight_number = display_flight_number(&raw_number, &airline_code);

    let origin_code = first
        .departure_airport
        .id
        .clone()
        .unwrap_or_else(|| origin.to_uppercase());
    let destination_code = last
        .arrival_airport
        .id
        .clone()
        .unwrap_or_else(|| destination.to_uppercase());

    let total = itinerary.total_duration.unwrap_or(0);
    let connections = if segments.len() > 1 {
        build_connections(segments, &itinerary.layovers, &airline_name)
    } else {
        Vec::new()
    };

    if segments.len() > 1 && itinerary.layovers.len() < segments.len() - 1 {
        warn!(
            "Itinerary {} has {} segments but only {} layovers",
            flight_number,
            segments.len(),
            itinerary.layovers.len()
        );
    }

    Some(FlightRecord {
        origin_city: resolve_city(
            &origin_code,
            first.departure_airport.name.as_deref().unwrap_or_default(),
        ),
        destination_city: resolve_city(
            &destination_code,
            last.arrival_airport.name.as_deref().unwrap_or_default(),
        ),
        origin: origin_code,
        destination: destination_code,
        airline_code,
        airline_name,
        flight_number,
        departure_time: format_time(first.departure_airport.time.as_deref().unwrap_or_default()),
        arrival_time: format_time(last.arrival_airport.time.as_deref().unwrap_or_default()),
        duration_minutes: u32::try_from(total).ok().filter(|m| *m > 0),
        duration: format_duration(total),
        aircraft: first.aircraft(),
        price: itinerary.price,
        trip_type: itinerary.trip_type.clone(),
        connections,
        provenance: Provenance::SearchProvider,
    })
}

fn display_flight_number(raw: &str, airline_code: &str) -> String {
    if raw.trim().is_empty() {
        return UNKNOWN.to_string();
    }
    let cleaned = clean_flight_number(raw, airline_code);
    if airline_code == UNKNOWN || cleaned == raw {
        // Nothing was stripped, so the code is either already embedded or unknown
        let compact: String = raw.split_whitespace().collect();
        if airline_code != UNKNOWN && !compact.to_uppercase().starts_with(airline_code) {
            return format!("{airline_code}{compact}");
        }
        return compact;
    }
    format!("{airline_code}{cleaned}")
}

fn endpoint(airport: &AirportPayload) -> SegmentEndpoint {
    SegmentEndpoint {
        airport_code: airport.id.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        airport_name: airport.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        time: format_time(airport.time.as_deref().unwrap_or_default()),
    }
}

fn build_connections(
    segments: &[SegmentPayload],
    layovers: &[LayoverPayload],
    airline_name: &str,
) -> Vec<ConnectionSegment> {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let airline = segment.airline.as_deref().unwrap_or(airline_name);
            let raw_number = segment.flight_number.clone().unwrap_or_default();
            let code = extract_airline_code(&raw_number, airline);

            let layover = segments.get(i + 1).map(|next| match layovers.get(i) {
                Some(provided) => provided_layover(provided, segment, next),
                None => synthesized_layover(segment, next),
            });

            ConnectionSegment {
                segment_id: format!("segment_{i}"),
                flight_number: display_flight_number(&raw_number, &code),
                airline: airline.to_string(),
                aircraft: segment.aircraft(),
                departure: endpoint(&segment.departure_airport),
                arrival: endpoint(&segment.arrival_airport),
                duration: format_duration(segment.duration.unwrap_or(0)),
                layover,
            }
        })
        .collect()
}

fn provided_layover(
    layover: &LayoverPayload,
    inbound: &SegmentPayload,
    outbound: &SegmentPayload,
) -> LayoverInfo {
    let code = layover
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let name = layover
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unknown Airport".to_string());
    let minutes = layover.duration.unwrap_or(0);
    if minutes <= 0 {
        warn!("Layover at {} has no usable duration ({})", code, minutes);
    }

    LayoverInfo {
        city: resolve_city(&code, &name),
        duration_minutes: u32::try_from(minutes).ok().filter(|m| *m > 0),
        duration: format_duration(minutes),
        arrival_time: format_time(inbound.arrival_airport.time.as_deref().unwrap_or_default()),
        departure_time: format_time(outbound.departure_airport.time.as_deref().unwrap_or_default()),
        overnight: layover.overnight,
        synthesized: false,
        airport_code: code,
        airport_name: name,
    }
}

fn synthesized_layover(inbound: &SegmentPayload, outbound: &SegmentPayload) -> LayoverInfo {
    let next = &outbound.departure_airport;
    let code = next.id.clone().unwrap_or_else(|| UNKNOWN.to_string());
    let name = next
        .name
        .clone()
        .unwrap_or_else(|| "Unknown Airport".to_string());

    LayoverInfo {
        city: resolve_city(&code, &name),
        duration_minutes: None,
        duration: UNKNOWN.to_string(),
        arrival_time: format_time(inbound.arrival_airport.time.as_deref().unwrap_or_default()),
        departure_time: format_time(next.time.as_deref().unwrap_or_default()),
        overnight: false,
        synthesized: true,
        airport_code: code,
        airport_name: name,
    }
}

fn field_string(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Normalize an exact-match warehouse row.
///
/// The `layovers` column may hold a JSON string or an array of
/// `{city, airport_code, layover_duration_minutes, travel_time_minutes,
/// arrival_time, departure_time}` objects.
#[must_use]
pub fn flight_from_warehouse_row(row: &Map<String, Value>) -> FlightRecord {
    let get = |key: &str| field_string(row, key).unwrap_or_else(|| UNKNOWN.to_string());

    let airline_name = get("airline_name");
    let raw_number = field_string(row, "flight_number").unwrap_or_default();
    let airline_code = field_string(row, "airline_code")
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| extract_airline_code(&raw_number, &airline_name));
    let origin = get("origin_airport_code");
    let destination = get("destination_airport_code");

    let departure_time = ["departure_time_local", "departure_time"]
        .iter()
        .find_map(|k| field_string(row, k))
        .unwrap_or_default();
    let arrival_time = ["arrival_time_local", "arrival_time"]
        .iter()
        .find_map(|k| field_string(row, k))
        .unwrap_or_default();

    let total = ["duration_minutes", "total_duration"]
        .iter()
        .find_map(|k| field_string(row, k))
        .and_then(|raw| parse_minutes(&raw))
        .unwrap_or(0);

    let aircraft = ["airplane_model", "aircraft_type", "aircraft"]
        .iter()
        .find_map(|k| field_string(row, k))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let price = ["price", "cost"]
        .iter()
        .find_map(|k| field_string(row, k))
        .and_then(|p| p.trim().parse::<f64>().ok());

    let layovers = row.get("layovers").map(layover_rows).unwrap_or_default();

    let mut record = FlightRecord {
        origin_city: resolve_city(&origin, ""),
        destination_city: resolve_city(&destination, ""),
        flight_number: display_flight_number(&raw_number, &airline_code),
        airline_code,
        airline_name,
        departure_time: format_time(&departure_time),
        arrival_time: format_time(&arrival_time),
        duration_minutes: u32::try_from(total).ok().filter(|m| *m > 0),
        duration: format_duration(total),
        aircraft,
        price,
        trip_type: None,
        connections: Vec::new(),
        provenance: Provenance::Warehouse,
        origin,
        destination,
    };
    record.connections = warehouse_connections(&record, &layovers);
    record
}

fn layover_rows(column: &Value) -> Vec<Map<String, Value>> {
    let rows = match column {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to parse layovers column: {}", e);
                return Vec::new();
            }
        },
        other => other.clone(),
    };

    match rows {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Turns the warehouse's layover list into legs: `n` layovers become `n + 1`
/// segments from origin to destination
fn warehouse_connections(
    record: &FlightRecord,
    layovers: &[Map<String, Value>],
) -> Vec<ConnectionSegment> {
    if layovers.is_empty() {
        return Vec::new();
    }

    let mut connections = Vec::with_capacity(layovers.len() + 1);
    let mut departure = SegmentEndpoint {
        airport_code: record.origin.clone(),
        airport_name: record.origin_city.clone(),
        time: record.departure_time.clone(),
    };

    for (i, row) in layovers.iter().enumerate() {
        let code = field_string(row, "airport_code").unwrap_or_else(|| UNKNOWN.to_string());
        let city = field_string(row, "city").unwrap_or_else(|| resolve_city(&code, ""));
        let arrival_time = field_string(row, "arrival_time").unwrap_or_default();
        let departure_time = field_string(row, "departure_time").unwrap_or_default();
        let raw_layover = field_string(row, "layover_duration_minutes").unwrap_or_default();
        let raw_travel = field_string(row, "travel_time_minutes").unwrap_or_default();

        let arrival = SegmentEndpoint {
            airport_code: code.clone(),
            airport_name: city.clone(),
            time: format_time(&arrival_time),
        };
        connections.push(ConnectionSegment {
            segment_id: format!("segment_{i}"),
            flight_number: record.flight_number.clone(),
            airline: record.airline_name.clone(),
            aircraft: record.aircraft.clone(),
            departure: departure.clone(),
            arrival,
            duration: format_duration_lenient(&raw_travel),
            layover: Some(LayoverInfo {
                airport_code: code.clone(),
                airport_name: city.clone(),
                city: city.clone(),
                duration_minutes: parse_minutes(&raw_layover)
                    .filter(|m| *m > 0)
                    .and_then(|m| u32::try_from(m).ok()),
                duration: format_duration_lenient(&raw_layover),
                arrival_time: format_time(&arrival_time),
                departure_time: format_time(&departure_time),
                overnight: false,
                synthesized: false,
            }),
        });

        departure = SegmentEndpoint {
            airport_code: code,
            airport_name: city,
            time: format_time(&departure_time),
        };
    }

    connections.push(ConnectionSegment {
        segment_id: format!("segment_{}", layovers.len()),
        flight_number: record.flight_number.clone(),
        airline: record.airline_name.clone(),
        aircraft: record.aircraft.clone(),
        departure,
        arrival: SegmentEndpoint {
            airport_code: record.destination.clone(),
            airport_name: record.destination_city.clone(),
            time: record.arrival_time.clone(),
        },
        duration: UNKNOWN.to_string(),
        layover: None,
    });

    connections
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("DL1590", "Delta Air Lines", "DL")]
    #[case("B6 615", "JetBlue", "B6")]
    #[case("AS 41", "Alaska Airlines", "AS")]
    #[case("aal100", "American Airlines", "AAL")]
    #[case("9W 12", "Jet Airways", "9W")]
    #[case("1590", "Delta Air Lines", "DL")]
    #[case("", "frontier", "F9")]
    #[case("123", "Virgin America", "VA")]
    #[case("", "Zed", "Unknown")]
    fn test_extract_airline_code(#[case] number: &str, #[case] name: &str, #[case] code: &str) {
        assert_eq!(extract_airline_code(number, name), code);
    }

    #[rstest]
    #[case("AS 41", "AS", "41")]
    #[case("DL1732", "DL", "1732")]
    #[case("dl-1732", "DL", "1732")]
    #[case("DL", "DL", "DL")]
    #[case("615", "B6", "615")]
    #[case("AS 41", "Unknown", "AS 41")]
    fn test_clean_flight_number(#[case] number: &str, #[case] code: &str, #[case] expected: &str) {
        assert_eq!(clean_flight_number(number, code), expected);
    }

    #[rstest]
    #[case(125, "2h 5m")]
    #[case(60, "1h")]
    #[case(5, "5m")]
    #[case(0, "Unknown")]
    #[case(-10, "Unknown")]
    fn test_format_duration(#[case] minutes: i64, #[case] expected: &str) {
        assert_eq!(format_duration(minutes), expected);
    }

    #[rstest]
    #[case("125", "2h 5m")]
    #[case("60", "1h")]
    #[case("90.0", "1h 30m")]
    #[case("0", "0m")]
    #[case("-15", "0m")]
    #[case("soon", "0m")]
    fn test_format_duration_lenient(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_duration_lenient(raw), expected);
    }

    #[rstest]
    #[case("2025-07-30 06:59", "6:59 AM")]
    #[case("2025-07-30 18:05", "6:05 PM")]
    #[case("2025-07-30 00:15", "12:15 AM")]
    #[case("", "Unknown")]
    #[case("   ", "Unknown")]
    #[case("tomorrow", "tomorrow")]
    fn test_format_time(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_time(raw), expected);
    }

    #[rstest]
    #[case("ORD", "Chicago O'Hare International Airport", "Chicago")]
    #[case("XNA", "Northwest Arkansas Regional", "Northwest Arkansas")]
    #[case("ZZZ", "Springfield International Airport", "Springfield")]
    #[case("ZZZ", "", "ZZZ")]
    fn test_resolve_city(#[case] code: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(resolve_city(code, name), expected);
    }

    #[rstest]
    #[case("2025-07-12", "2025-07-12")]
    #[case("07/12/2025", "2025-07-12")]
    #[case("July 12, 2025", "2025-07-12")]
    #[case("July 12th, 2025", "2025-07-12")]
    #[case("July 1st, 2025", "2025-07-01")]
    #[case("next friday", "next friday")]
    fn test_normalize_travel_date(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_travel_date(raw), expected);
    }

    #[test]
    fn test_airline_name_for_code_falls_back_to_code() {
        assert_eq!(airline_name_for_code("UA"), "United Airlines");
        assert_eq!(airline_name_for_code("QQ"), "QQ");
    }

    fn segment(from: &str, to: &str, dep: &str, arr: &str, number: &str) -> Value {
        json!({
            "departure_airport": {"id": from, "name": format!("{from} International Airport"), "time": dep},
            "arrival_airport": {"id": to, "name": format!("{to} International Airport"), "time": arr},
            "airline": "Delta",
            "flight_number": number,
            "airplane": "Boeing 737",
            "duration": 150
        })
    }

    #[test]
    fn test_two_segments_with_one_layover() {
        let raw = json!({
            "flights": [
                segment("JFK", "ATL", "2025-07-30 06:59", "2025-07-30 09:29", "DL 1590"),
                segment("ATL", "SFO", "2025-07-30 10:45", "2025-07-30 13:15", "DL 400")
            ],
            "layovers": [{"id": "ATL", "name": "Hartsfield-Jackson Atlanta International Airport", "duration": 76}],
            "total_duration": 376,
            "price": 412
        });
        let itinerary: ItineraryPayload = serde_json::from_value(raw).unwrap();
        let record = normalize_itinerary(&itinerary, "JFK", "SFO").unwrap();

        assert_eq!(record.connections.len(), 2);
        assert_eq!(record.layovers().count(), 1);
        let layover = record.layovers().next().unwrap();
        assert_eq!(layover.duration, "1h 16m");
        assert_eq!(layover.duration_minutes, Some(76));
        assert_eq!(layover.city, "Atlanta");
        assert_eq!(layover.arrival_time, "9:29 AM");
        assert_eq!(layover.departure_time, "10:45 AM");
        assert!(!layover.synthesized);

        assert_eq!(record.flight_number, "DL1590");
        assert_eq!(record.airline_code, "DL");
        assert_eq!(record.duration, "6h 16m");
        assert_eq!(record.departure_time, "6:59 AM");
        assert_eq!(record.connections[0].segment_id, "segment_0");
        assert_eq!(record.price, Some(412.0));
        assert_eq!(record.provenance, Provenance::SearchProvider);
    }

    #[test]
    fn test_missing_layover_is_synthesized() {
        let raw = json!({
            "flights": [
                segment("JFK", "ORD", "2025-07-30 06:59", "2025-07-30 08:30", "UA 10"),
                segment("ORD", "SEA", "2025-07-30 09:40", "2025-07-30 12:15", "UA 11")
            ],
            "total_duration": 556
        });
        let itinerary: ItineraryPayload = serde_json::from_value(raw).unwrap();
        let record = normalize_itinerary(&itinerary, "JFK", "SEA").unwrap();

        assert_eq!(record.connections.len(), 2);
        let layover = record.connections[0].layover.as_ref().unwrap();
        assert_eq!(layover.duration, "Unknown");
        assert_eq!(layover.duration_minutes, None);
        assert_eq!(layover.airport_code, "ORD");
        assert_eq!(layover.city, "Chicago");
        assert_eq!(layover.arrival_time, "8:30 AM");
        assert_eq!(layover.departure_time, "9:40 AM");
        assert!(layover.synthesized);
        assert!(record.connections[1].layover.is_none());
    }

    #[test]
    fn test_direct_flight_has_no_connections() {
        let raw = json!({
            "flights": [segment("JFK", "LAX", "2025-07-30 07:00", "2025-07-30 10:30", "B6 615")],
            "total_duration": 390
        });
        let itinerary: ItineraryPayload = serde_json::from_value(raw).unwrap();
        let record = normalize_itinerary(&itinerary, "JFK", "LAX").unwrap();
        assert!(record.is_direct());
        assert_eq!(record.flight_number, "B6615");
    }

    #[test]
    fn test_empty_itinerary_is_skipped() {
        assert!(normalize_itinerary(&ItineraryPayload::default(), "JFK", "LAX").is_none());
    }

    #[test]
    fn test_non_positive_layover_duration_is_unknown() {
        let raw = json!({
            "flights": [
                segment("JFK", "ATL", "2025-07-30 06:59", "2025-07-30 09:29", "DL 1"),
                segment("ATL", "SFO", "2025-07-30 10:45", "2025-07-30 13:15", "DL 2")
            ],
            "layovers": [{"id": "ATL", "name": "Atlanta", "duration": 0}]
        });
        let itinerary: ItineraryPayload = serde_json::from_value(raw).unwrap();
        let record = normalize_itinerary(&itinerary, "JFK", "SFO").unwrap();
        let layover = record.layovers().next().unwrap();
        assert_eq!(layover.duration, "Unknown");
        assert_eq!(layover.duration_minutes, None);
        assert_eq!(record.duration, "Unknown");
    }

    #[test]
    fn test_itineraries_skip_malformed_entries() {
        let response = json!({
            "best_flights": [{"flights": [segment("JFK", "LAX", "", "", "AA1")]}],
            "other_flights": [{"flights": "not a list"}, {"flights": []}]
        });
        let itineraries = itineraries_from_response(&response);
        assert_eq!(itineraries.len(), 2);
        assert_eq!(itineraries[0].flights.len(), 1);
    }

    #[test]
    fn test_warehouse_row_with_layover_string() {
        let row = json!({
            "airline_code": "UA",
            "airline_name": "United Airlines",
            "flight_number": 1234,
            "origin_airport_code": "SFO",
            "destination_airport_code": "BOS",
            "departure_time_local": "2025-07-12 08:00",
            "duration_minutes": "420",
            "layovers": "[{\"city\": \"Denver\", \"airport_code\": \"DEN\", \"layover_duration_minutes\": 55, \"travel_time_minutes\": \"bad\"}]"
        });
        let record = flight_from_warehouse_row(row.as_object().unwrap());

        assert_eq!(record.provenance, Provenance::Warehouse);
        assert_eq!(record.flight_number, "UA1234");
        assert_eq!(record.departure_time, "8:00 AM");
        assert_eq!(record.duration, "7h");
        assert_eq!(record.connections.len(), 2);
        let first = &record.connections[0];
        assert_eq!(first.duration, "0m");
        assert_eq!(first.departure.airport_code, "SFO");
        let layover = first.layover.as_ref().unwrap();
        assert_eq!(layover.airport_code, "DEN");
        assert_eq!(layover.duration, "55m");
        assert_eq!(record.connections[1].arrival.airport_code, "BOS");
        assert!(record.connections[1].layover.is_none());
    }

    #[test]
    fn test_warehouse_zero_layover_has_no_minutes() {
        let row = json!({
            "airline_code": "UA",
            "airline_name": "United Airlines",
            "flight_number": "UA9",
            "origin_airport_code": "SFO",
            "destination_airport_code": "BOS",
            "layovers": [
                {"airport_code": "DEN", "layover_duration_minutes": "0"},
                {"airport_code": "ORD", "layover_duration_minutes": -5}
            ]
        });
        let record = flight_from_warehouse_row(row.as_object().unwrap());

        let layovers: Vec<_> = record.layovers().collect();
        assert_eq!(layovers.len(), 2);
        for layover in layovers {
            assert_eq!(layover.duration_minutes, None);
            assert_eq!(layover.duration, "0m");
        }
    }

    #[test]
    fn test_warehouse_row_with_bad_layovers_is_direct() {
        let row = json!({
            "airline_code": "DL",
            "airline_name": "Delta",
            "flight_number": "DL100",
            "layovers": "{not json"
        });
        let record = flight_from_warehouse_row(row.as_object().unwrap());
        assert!(record.is_direct());
        assert_eq!(record.flight_number, "DL100");
        assert_eq!(record.duration, "Unknown");
    }
}
