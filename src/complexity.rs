//! Airport operational complexity from generated analysis

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::clients::TextGenerator;
use crate::model_response::{parse_embedded_json, truncate_chars};
use crate::models::{AirportComplexity, ComplexityLevel, Provenance};

pub const MAX_DESCRIPTION_CHARS: usize = 250;
pub const MAX_CONCERNS: usize = 4;

#[derive(Debug, Deserialize)]
struct ComplexityReply {
    complexity: Option<String>,
    description: Option<String>,
    #[serde(default)]
    concerns: Vec<String>,
}

fn complexity_prompt(airport_code: &str, airport_name: Option<&str>) -> String {
    format!(
        r#"You are assessing how operationally complex {code} airport ({name}) is for passengers and airlines.

Weigh traffic volume, runway layout and airspace, weather sensitivity through the year,
hub and connection load, terminal layout, ground operations and typical delay history.

Answer with a single JSON object and nothing else:
{{
  "complexity": "high" | "medium" | "low",
  "description": "operational challenges, at most 250 characters",
  "concerns": ["four short, specific concerns"]
}}

Keep the description professional and do not add ellipses or symbols."#,
        code = airport_code,
        name = airport_name.unwrap_or("Unknown"),
    )
}

/// Ask the model how complex an airport is to operate through.
///
/// Never fails: without a generator, or when the reply cannot be read, the
/// result is `unknown` with provenance `fallback`.
#[instrument(skip(generator))]
pub fn analyze_airport_complexity(
    generator: Option<&dyn TextGenerator>,
    airport_code: &str,
    airport_name: Option<&str>,
) -> AirportComplexity {
    let Some(generator) = generator else {
        warn!("Text generation unavailable, no complexity analysis for {}", airport_code);
        return failed_complexity(airport_code);
    };

    let reply = match generator.generate(&complexity_prompt(airport_code, airport_name)) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Complexity generation failed for {}: {}", airport_code, e);
            return failed_complexity(airport_code);
        }
    };

    match parse_embedded_json::<ComplexityReply>(&reply) {
        Ok(parsed) => {
            info!("Complexity analysis complete for {}", airport_code);
            AirportComplexity {
                complexity: ComplexityLevel::from_tag(parsed.complexity.as_deref().unwrap_or("medium")),
                description: truncate_chars(
                    parsed.description.as_deref().unwrap_or_default(),
                    MAX_DESCRIPTION_CHARS,
                ),
                concerns: parsed.concerns.into_iter().take(MAX_CONCERNS).collect(),
                provenance: Provenance::Model,
            }
        }
        Err(e) => {
            warn!("Unreadable complexity reply for {}: {}", airport_code, e);
            failed_complexity(airport_code)
        }
    }
}

/// Explicit failure marker, never a guessed tier
#[must_use]
pub fn failed_complexity(airport_code: &str) -> AirportComplexity {
    AirportComplexity {
        complexity: ComplexityLevel::Unknown,
        description: format!(
            "Complexity analysis failed for {airport_code}. No airport data is available."
        ),
        concerns: vec![format!("Complexity analysis failed for {airport_code}")],
        provenance: Provenance::Fallback,
    }
}
