use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use flightrisk::{FlightQuery, FlightRiskConfig, FlightRiskService, LayoverContext, RiskLevel, RouteInfo};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FLIGHTRISK_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a route and assess weather and layover risk
    Route {
        origin: String,
        destination: String,
        /// Travel date, e.g. 2025-07-12 or "July 12th, 2025"
        date: String,
        /// Only search, skip the risk analysis
        #[arg(long)]
        search_only: bool,
    },
    /// Look up a historical flight in the warehouse
    Flight {
        airline_code: String,
        flight_number: String,
        date: String,
        /// Airline display name, derived from the code when omitted
        #[arg(long)]
        airline_name: Option<String>,
        /// Full risk analysis with seasonal factors and insurance advice
        #[arg(long)]
        analyze: bool,
    },
    /// Weather risk at an airport for a travel date
    Weather { airport: String, date: String },
    /// Operational complexity of an airport
    Complexity { airport: String },
    /// Feasibility of one layover
    Layover {
        airport: String,
        /// Duration such as "1h 30m", "1:30" or "90"
        duration: String,
        #[arg(long)]
        date: Option<String>,
        /// Weather risk tier at the airport, e.g. low, medium, high
        #[arg(long)]
        weather_risk: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render result")?;
    println!("{rendered}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = FlightRiskConfig::load_from_path(cli.config)?;
    flightrisk::logging::init(&config.logging, cli.verbose)?;

    let service =
        FlightRiskService::from_config(&config).context("Failed to start flight risk service")?;

    match cli.command {
        Commands::Route {
            origin,
            destination,
            date,
            search_only,
        } => {
            let route = RouteInfo {
                origin,
                destination,
                date,
                connections: Vec::new(),
            };
            if search_only {
                print_json(&service.search_route(&route))
            } else {
                print_json(&service.analyze_route(&route))
            }
        }
        Commands::Flight {
            airline_code,
            flight_number,
            date,
            airline_name,
            analyze,
        } => {
            let query = FlightQuery {
                airline_code,
                airline_name: airline_name.unwrap_or_default(),
                flight_number,
                date,
            };
            if analyze {
                print_json(&service.analyze_flight(&query))
            } else {
                print_json(&service.lookup_flight(&query))
            }
        }
        Commands::Weather { airport, date } => print_json(&service.assess_weather(&airport, &date)),
        Commands::Complexity { airport } => print_json(&service.airport_complexity(&airport)),
        Commands::Layover {
            airport,
            duration,
            date,
            weather_risk,
        } => {
            let weather_risk = weather_risk
                .as_deref()
                .map(str::parse::<RiskLevel>)
                .transpose()
                .context("Invalid --weather-risk")?;
            let context = LayoverContext {
                weather_risk,
                travel_date: date,
                ..LayoverContext::default()
            };
            print_json(&service.assess_layover(&duration, &airport, &context))
        }
    }
}
