//! Canonical flight record shared by every lookup path

use serde::{Deserialize, Serialize};

use super::risk::Provenance;

/// One flight option in the canonical shape handed to the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Origin airport code
    pub origin: String,
    /// Destination airport code
    pub destination: String,
    pub origin_city: String,
    pub destination_city: String,
    /// Derived airline code, or `Unknown`
    pub airline_code: String,
    pub airline_name: String,
    /// Airline code followed by the cleaned number, e.g. `AA179`
    pub flight_number: String,
    /// Local departure time, 12-hour clock
    pub departure_time: String,
    /// Local arrival time, 12-hour clock
    pub arrival_time: String,
    /// Total duration in minutes, when known
    pub duration_minutes: Option<u32>,
    /// Human-readable total duration
    pub duration: String,
    pub aircraft: String,
    pub price: Option<f64>,
    /// Provider trip type, e.g. `One way`
    pub trip_type: Option<String>,
    /// Ordered legs, empty for direct flights
    pub connections: Vec<ConnectionSegment>,
    pub provenance: Provenance,
}

impl FlightRecord {
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.connections.is_empty()
    }

    /// Layovers in travel order
    pub fn layovers(&self) -> impl Iterator<Item = &LayoverInfo> {
        self.connections.iter().filter_map(|c| c.layover.as_ref())
    }
}

/// Airport and local time at one end of a leg
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentEndpoint {
    pub airport_code: String,
    pub airport_name: String,
    pub time: String,
}

/// A single leg of a connecting itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSegment {
    /// `segment_{n}`, counting from zero
    pub segment_id: String,
    pub flight_number: String,
    pub airline: String,
    pub aircraft: String,
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
    pub duration: String,
    /// Ground time after this leg; absent on the final leg
    pub layover: Option<LayoverInfo>,
}

/// Ground time at an intermediate airport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoverInfo {
    pub airport_code: String,
    pub airport_name: String,
    pub city: String,
    pub duration_minutes: Option<u32>,
    /// Human-readable duration, `Unknown` when not reported
    pub duration: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub overnight: bool,
    /// True when the provider omitted this layover and it was filled in
    /// from the neighbouring segments
    #[serde(default)]
    pub synthesized: bool,
}
