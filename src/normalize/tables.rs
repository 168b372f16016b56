//! Fixed lookup tables for airports and airlines

/// Words stripped from the end of an airport name when resolving its city
pub const AIRPORT_NAME_SUFFIXES: [&str; 6] = [
    "International Airport",
    "International",
    "Airport",
    "Regional",
    "Municipal",
    "Field",
];

/// City served by a major airport code
#[must_use]
pub fn city_for_code(code: &str) -> Option<&'static str> {
    let city = match code.trim().to_uppercase().as_str() {
        "JFK" | "LGA" => "New York",
        "SFO" => "San Francisco",
        "LAX" => "Los Angeles",
        "ORD" | "MDW" => "Chicago",
        "DFW" | "DAL" => "Dallas",
        "ATL" => "Atlanta",
        "DEN" => "Denver",
        "SEA" => "Seattle",
        "LAS" => "Las Vegas",
        "IAD" | "DCA" => "Washington",
        "BWI" => "Baltimore",
        "SAN" => "San Diego",
        "TPA" => "Tampa",
        "PDX" | "PWM" => "Portland",
        "AUS" => "Austin",
        "CLT" => "Charlotte",
        "MSP" => "Minneapolis",
        "DTW" => "Detroit",
        "BOS" => "Boston",
        "FLL" => "Fort Lauderdale",
        "SJC" => "San Jose",
        "HNL" => "Honolulu",
        "ANC" => "Anchorage",
        "MIA" => "Miami",
        "MCO" => "Orlando",
        "PHL" => "Philadelphia",
        "IAH" => "Houston",
        "PHX" => "Phoenix",
        "EWR" => "Newark",
        "STL" => "St. Louis",
        "BNA" => "Nashville",
        "MCI" => "Kansas City",
        "CVG" => "Cincinnati",
        "SLC" => "Salt Lake City",
        "CLE" => "Cleveland",
        "SMF" => "Sacramento",
        "OAK" => "Oakland",
        "SNA" => "Santa Ana",
        "RDU" => "Raleigh",
        "IND" => "Indianapolis",
        "CMH" => "Columbus",
        "JAX" => "Jacksonville",
        "RSW" => "Fort Myers",
        "COS" => "Colorado Springs",
        "PIT" => "Pittsburgh",
        "BUF" => "Buffalo",
        "BUR" => "Burbank",
        "ABQ" => "Albuquerque",
        "LGB" => "Long Beach",
        "ONT" => "Ontario",
        "OGG" => "Kahului",
        "KOA" => "Kona",
        "MKE" => "Milwaukee",
        "OMA" => "Omaha",
        "OKC" => "Oklahoma City",
        "TUL" => "Tulsa",
        "ICT" => "Wichita",
        "DSM" => "Des Moines",
        "ROC" => "Rochester",
        "ALB" => "Albany",
        "SYR" => "Syracuse",
        "PVD" => "Providence",
        "BDL" => "Hartford",
        "BGR" => "Bangor",
        "MHT" => "Manchester",
        "BTV" => "Burlington",
        "GRR" => "Grand Rapids",
        "FNT" => "Flint",
        "LAN" => "Lansing",
        "MSN" => "Madison",
        "GRB" => "Green Bay",
        "FAR" => "Fargo",
        "BIS" => "Bismarck",
        "FSD" => "Sioux Falls",
        "RAP" => "Rapid City",
        "BIL" => "Billings",
        "MSO" => "Missoula",
        "GTF" => "Great Falls",
        "BOI" => "Boise",
        "GEG" => "Spokane",
        "FAI" => "Fairbanks",
        "JNU" => "Juneau",
        _ => return None,
    };
    Some(city)
}

/// Display name of a major airport, used for weather reports
#[must_use]
pub fn airport_name_for_code(code: &str) -> Option<&'static str> {
    let name = match code.trim().to_uppercase().as_str() {
        "ATL" => "Hartsfield-Jackson Atlanta International Airport",
        "LAX" => "Los Angeles International Airport",
        "ORD" => "Chicago O'Hare International Airport",
        "DFW" => "Dallas/Fort Worth International Airport",
        "DEN" => "Denver International Airport",
        "JFK" => "John F. Kennedy International Airport",
        "SFO" => "San Francisco International Airport",
        "SEA" => "Seattle-Tacoma International Airport",
        "LAS" => "Harry Reid International Airport",
        "BOS" => "Boston Logan International Airport",
        "EWR" => "Newark Liberty International Airport",
        "LGA" => "LaGuardia Airport",
        "CLT" => "Charlotte Douglas International Airport",
        "PHX" => "Phoenix Sky Harbor International Airport",
        "IAH" => "George Bush Intercontinental Airport",
        "MIA" => "Miami International Airport",
        "MCO" => "Orlando International Airport",
        "MSP" => "Minneapolis-St. Paul International Airport",
        "DTW" => "Detroit Metropolitan Airport",
        "PHL" => "Philadelphia International Airport",
        "BWI" => "Baltimore/Washington International Airport",
        "SAN" => "San Diego International Airport",
        "DCA" => "Ronald Reagan Washington National Airport",
        "IAD" => "Washington Dulles International Airport",
        "TPA" => "Tampa International Airport",
        "PDX" => "Portland International Airport",
        "STL" => "St. Louis Lambert International Airport",
        "HNL" => "Daniel K. Inouye International Airport",
        _ => return None,
    };
    Some(name)
}

/// Airline code for a display name, full or short form, case-insensitive
#[must_use]
pub fn airline_code_for_name(name: &str) -> Option<&'static str> {
    let code = match name.trim().to_lowercase().as_str() {
        "delta air lines" | "delta" => "DL",
        "american airlines" | "american" => "AA",
        "united airlines" | "united" => "UA",
        "southwest airlines" | "southwest" => "WN",
        "jetblue airways" | "jetblue" => "B6",
        "alaska airlines" | "alaska" => "AS",
        "spirit airlines" | "spirit" => "NK",
        "frontier airlines" | "frontier" => "F9",
        "hawaiian airlines" | "hawaiian" => "HA",
        "allegiant air" | "allegiant" => "G4",
        _ => return None,
    };
    Some(code)
}

/// Full display name for an airline code
#[must_use]
pub fn airline_name_for_code(code: &str) -> Option<&'static str> {
    let name = match code.trim().to_uppercase().as_str() {
        "DL" => "Delta Air Lines",
        "AA" => "American Airlines",
        "UA" => "United Airlines",
        "WN" => "Southwest Airlines",
        "B6" => "JetBlue Airways",
        "AS" => "Alaska Airlines",
        "NK" => "Spirit Airlines",
        "F9" => "Frontier Airlines",
        "HA" => "Hawaiian Airlines",
        "G4" => "Allegiant Air",
        _ => return None,
    };
    Some(name)
}
