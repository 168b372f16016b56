//! Route and flight lookup
//!
//! Route searches go to the live search provider and return normalized
//! itineraries. Flight lookups match one row exactly in the historical
//! warehouse.

use tracing::{info, instrument, warn};

use crate::clients::{FlightSearchProvider, FlightSearchRequest, FlightWarehouse};
use crate::models::{FlightLookup, FlightQuery, LookupErrorKind, RouteInfo, RouteSearchResult};
use crate::normalize::{
    airline_name_for_code, clean_flight_number, flight_from_warehouse_row,
    itineraries_from_response, normalize_itinerary, normalize_travel_date,
};

pub const NO_FLIGHTS_MESSAGE: &str = "No flights found for this route";
pub const RATE_LIMIT_MESSAGE: &str =
    "Flight search rate limit exceeded. Please upgrade the search plan or try again later";

/// Search a one-way route and normalize up to `max_flights` itineraries.
///
/// Never fails: every problem is reported through
/// [`RouteSearchResult::failed`] with a [`LookupErrorKind`].
#[instrument(skip(search), fields(origin = %route.origin, destination = %route.destination))]
pub fn search_route(
    search: Option<&dyn FlightSearchProvider>,
    route: &RouteInfo,
    max_flights: usize,
) -> RouteSearchResult {
    let origin = route.origin.trim().to_uppercase();
    let destination = route.destination.trim().to_uppercase();
    if origin.is_empty() || destination.is_empty() {
        return RouteSearchResult::failed(
            LookupErrorKind::InvalidRequest,
            "Origin and destination airports are required",
        );
    }

    let Some(search) = search else {
        warn!("Flight search provider not configured");
        return RouteSearchResult::failed(
            LookupErrorKind::Unavailable,
            "Flight search is not available",
        );
    };

    let date = normalize_travel_date(&route.date);
    let request = FlightSearchRequest {
        origin: origin.clone(),
        destination: destination.clone(),
        date: date.clone(),
    };

    let response = match search.search_flights(&request) {
        Ok(response) => response,
        Err(e) if e.is_rate_limited() => {
            warn!("Route search rate limited: {}", e);
            return RouteSearchResult::failed(LookupErrorKind::RateLimit, RATE_LIMIT_MESSAGE);
        }
        Err(e) => {
            warn!("Route search failed: {}", e);
            return RouteSearchResult::failed(
                LookupErrorKind::Upstream,
                format!("Route analysis failed: {}", e.user_message()),
            );
        }
    };

    let mut flights: Vec<_> = itineraries_from_response(&response)
        .iter()
        .filter_map(|itinerary| normalize_itinerary(itinerary, &origin, &destination))
        .collect();
    if flights.is_empty() {
        warn!("No flights for {} -> {} on {}", origin, destination, date);
        return RouteSearchResult::failed(LookupErrorKind::NoFlights, NO_FLIGHTS_MESSAGE);
    }

    if flights.len() > max_flights {
        info!("Limiting {} flights to {}", flights.len(), max_flights);
        flights.truncate(max_flights);
    }
    info!("Found {} flights {} -> {}", flights.len(), origin, destination);

    RouteSearchResult::found(
        flights,
        RouteInfo {
            origin,
            destination,
            date,
            connections: route
                .connections
                .iter()
                .map(|c| c.trim().to_uppercase())
                .collect(),
        },
    )
}

/// Canonical form of a warehouse query: upper-case code, flight number
/// without the code prefix, display name filled from the code, ISO date
#[must_use]
pub fn normalize_query(query: &FlightQuery) -> FlightQuery {
    let airline_code = query.airline_code.trim().to_uppercase();
    let airline_name = if query.airline_name.trim().is_empty() {
        airline_name_for_code(&airline_code)
    } else {
        query.airline_name.trim().to_string()
    };
    FlightQuery {
        flight_number: clean_flight_number(query.flight_number.trim(), &airline_code),
        airline_name,
        date: normalize_travel_date(&query.date),
        airline_code,
    }
}

/// Look up one historical flight by exact match.
///
/// A failed warehouse call is reported as [`FlightLookup::Unavailable`],
/// an empty result as [`FlightLookup::NotFound`].
#[instrument(skip(warehouse))]
pub fn lookup_flight(warehouse: Option<&dyn FlightWarehouse>, query: &FlightQuery) -> FlightLookup {
    let Some(warehouse) = warehouse else {
        warn!("Flight warehouse not configured");
        return FlightLookup::Unavailable;
    };

    let query = normalize_query(query);
    match warehouse.find_flight(&query) {
        Ok(Some(row)) => {
            info!("Found {}{} on {}", query.airline_code, query.flight_number, query.date);
            FlightLookup::Found(Box::new(flight_from_warehouse_row(&row)))
        }
        Ok(None) => FlightLookup::NotFound,
        Err(e) => {
            warn!("Warehouse lookup failed: {}", e);
            FlightLookup::Unavailable
        }
    }
}
