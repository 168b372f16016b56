//! BigQuery warehouse access through the `jobs.query` REST endpoint
//!
//! Lookups use named query parameters; only table references, which are
//! validated at construction, are formatted into the SQL text.

use chrono::DateTime;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument, warn};

use super::{FlightWarehouse, build_http_client, check_status, read_json, transport_error};
use crate::config::WarehouseConfig;
use crate::models::{AirlineOnTime, FlightQuery};
use crate::{FlightRiskError, Result};

const SERVICE: &str = "BigQuery";

pub struct BigQueryWarehouse {
    client: Client,
    access_token: String,
    endpoint: String,
    table: String,
    performance_tables: Vec<String>,
    timeout_ms: u64,
}

impl std::fmt::Debug for BigQueryWarehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigQueryWarehouse")
            .field("endpoint", &self.endpoint)
            .field("table", &self.table)
            .field("access_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl BigQueryWarehouse {
    /// Create a warehouse client; returns `Unavailable` when the project or
    /// access token is missing
    pub fn new(config: &WarehouseConfig) -> Result<Self> {
        let project = config
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or(FlightRiskError::unavailable("Flight warehouse"))?;
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or(FlightRiskError::unavailable("Flight warehouse"))?;

        let parts = [
            ("project_id", project.as_str()),
            ("dataset", config.dataset.as_str()),
            ("table", config.table.as_str()),
        ]
        .into_iter()
        .chain(
            config
                .performance_tables
                .iter()
                .map(|t| ("performance_tables", t.as_str())),
        );
        for (name, part) in parts {
            if !is_identifier(part) {
                return Err(FlightRiskError::config(format!(
                    "warehouse.{name} contains invalid characters: {part}"
                )));
            }
        }

        Ok(Self {
            client: build_http_client(SERVICE, config.timeout_seconds)?,
            access_token,
            endpoint: format!(
                "{}/projects/{}/queries",
                config.base_url.trim_end_matches('/'),
                project
            ),
            table: format!("{}.{}.{}", project, config.dataset, config.table),
            performance_tables: config
                .performance_tables
                .iter()
                .map(|t| format!("{}.{}.{}", project, config.dataset, t))
                .collect(),
            timeout_ms: u64::from(config.timeout_seconds) * 1000,
        })
    }

    fn lookup_sql(&self) -> String {
        format!(
            "SELECT * FROM `{}` \
             WHERE UPPER(airline_code) = UPPER(@airline_code) \
             AND UPPER(airline_name) = UPPER(@airline_name) \
             AND UPPER(CAST(flight_number AS STRING)) = UPPER(@flight_number) \
             AND DATE(departure_time_local) = @departure_date \
             LIMIT 1",
            self.table
        )
    }

    /// `None` when no performance tables are configured
    fn on_time_sql(&self) -> Option<String> {
        if self.performance_tables.is_empty() {
            return None;
        }
        let combined = self
            .performance_tables
            .iter()
            .map(|t| {
                format!("SELECT OP_CARRIER, CANCELLED, DIVERTED, DEP_DELAY, ARR_DELAY FROM `{t}`")
            })
            .collect::<Vec<_>>()
            .join(" UNION ALL ");
        Some(format!(
            "WITH combined AS ({combined}) \
             SELECT COUNT(*) AS total_flights, \
             COUNTIF(CANCELLED = 1.0) AS cancelled_flights, \
             COUNTIF(DIVERTED = 1.0) AS diverted_flights, \
             COUNTIF(DEP_DELAY IS NOT NULL AND DEP_DELAY <= 15) AS on_time_flights, \
             COUNTIF(DEP_DELAY > 15) AS delayed_flights, \
             COUNTIF(DEP_DELAY > 60) AS severe_delays, \
             ROUND(AVG(IF(DEP_DELAY >= 0, DEP_DELAY, 0)), 1) AS avg_departure_delay, \
             ROUND(AVG(IF(ARR_DELAY >= 0, ARR_DELAY, 0)), 1) AS avg_arrival_delay \
             FROM combined WHERE OP_CARRIER = UPPER(@airline_code)"
        ))
    }

    fn run_query(&self, body: &Value) -> Result<Vec<Map<String, Value>>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = check_status(SERVICE, response)?;
        let data = read_json(SERVICE, response)?;
        decode_query_response(&data)
    }
}

fn is_identifier(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

fn string_param(name: &str, value: &str) -> Value {
    json!({
        "name": name,
        "parameterType": {"type": "STRING"},
        "parameterValue": {"value": value}
    })
}

impl FlightWarehouse for BigQueryWarehouse {
    #[instrument(skip(self), fields(flight = %query.flight_number, date = %query.date))]
    fn find_flight(&self, query: &FlightQuery) -> Result<Option<Map<String, Value>>> {
        info!(
            "Querying warehouse for {}{} on {}",
            query.airline_code, query.flight_number, query.date
        );

        let body = json!({
            "query": self.lookup_sql(),
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [
                string_param("airline_code", &query.airline_code),
                string_param("airline_name", &query.airline_name),
                string_param("flight_number", &query.flight_number),
                {
                    "name": "departure_date",
                    "parameterType": {"type": "DATE"},
                    "parameterValue": {"value": query.date}
                }
            ],
            "maxResults": 1,
            "timeoutMs": self.timeout_ms
        });

        let rows = self.run_query(&body)?;
        if rows.is_empty() {
            warn!("No warehouse row for {}{}", query.airline_code, query.flight_number);
        }
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    fn airline_on_time(&self, airline_code: &str) -> Result<Option<AirlineOnTime>> {
        let Some(sql) = self.on_time_sql() else {
            debug!("No performance tables configured");
            return Ok(None);
        };
        info!(
            "Calculating on-time rate for {} over {} tables",
            airline_code,
            self.performance_tables.len()
        );

        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [string_param("airline_code", airline_code)],
            "timeoutMs": self.timeout_ms
        });

        let rows = self.run_query(&body)?;
        let on_time = rows.first().and_then(|row| on_time_from_row(airline_code, row));
        match &on_time {
            Some(stats) => info!(
                "{} on-time rate {}% over {} flights",
                airline_code, stats.on_time_rate, stats.total_flights
            ),
            None => warn!("No performance history for {}", airline_code),
        }
        Ok(on_time)
    }
}

fn count(row: &Map<String, Value>, column: &str) -> u64 {
    row.get(column).and_then(Value::as_u64).unwrap_or(0)
}

fn percentage(part: u64, total: u64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (part as f64 / total as f64 * 100.0 * scale).round() / scale
}

/// Rates from the aggregate row; `None` when the airline flew nothing
pub(crate) fn on_time_from_row(airline_code: &str, row: &Map<String, Value>) -> Option<AirlineOnTime> {
    let total = count(row, "total_flights");
    if total == 0 {
        return None;
    }
    Some(AirlineOnTime {
        airline_code: airline_code.trim().to_uppercase(),
        total_flights: total,
        on_time_rate: percentage(count(row, "on_time_flights"), total, 1),
        cancellation_rate: percentage(count(row, "cancelled_flights"), total, 2),
        diversion_rate: percentage(count(row, "diverted_flights"), total, 2),
        delay_rate: percentage(count(row, "delayed_flights"), total, 2),
        severe_delay_rate: percentage(count(row, "severe_delays"), total, 2),
        avg_departure_delay_minutes: row.get("avg_departure_delay").and_then(Value::as_f64),
        avg_arrival_delay_minutes: row.get("avg_arrival_delay").and_then(Value::as_f64),
    })
}

#[derive(Debug, Clone, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

/// Decode a `jobs.query` response into one JSON object per row
pub(crate) fn decode_query_response(data: &Value) -> Result<Vec<Map<String, Value>>> {
    if data.get("jobComplete").and_then(Value::as_bool) == Some(false) {
        return Err(FlightRiskError::network(
            SERVICE,
            "query did not complete within the configured timeout",
        ));
    }

    let Some(rows) = data.get("rows").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let fields: Vec<FieldSchema> = data
        .pointer("/schema/fields")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| FlightRiskError::parse(format!("Invalid BigQuery schema: {e}")))?
        .unwrap_or_default();

    debug!("Decoding {} BigQuery rows", rows.len());
    Ok(rows.iter().map(|row| decode_record(&fields, row)).collect())
}

fn decode_record(fields: &[FieldSchema], row: &Value) -> Map<String, Value> {
    let cells = row.get("f").and_then(Value::as_array);
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let cell = cells
                .and_then(|c| c.get(i))
                .and_then(|c| c.get("v"))
                .unwrap_or(&Value::Null);
            (field.name.clone(), decode_field(field, cell))
        })
        .collect()
}

fn decode_field(field: &FieldSchema, value: &Value) -> Value {
    if field.mode.as_deref() == Some("REPEATED") {
        return match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| decode_single(field, item.get("v").unwrap_or(&Value::Null)))
                    .collect(),
            ),
            _ => Value::Array(Vec::new()),
        };
    }
    decode_single(field, value)
}

fn decode_single(field: &FieldSchema, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match field.field_type.as_str() {
        "RECORD" | "STRUCT" => Value::Object(decode_record(&field.fields, value)),
        "INTEGER" | "INT64" => value
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map_or_else(|| value.clone(), Value::from),
        "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => value
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .map_or_else(|| value.clone(), Value::from),
        "BOOLEAN" | "BOOL" => value
            .as_str()
            .map_or_else(|| value.clone(), |s| Value::Bool(s.eq_ignore_ascii_case("true"))),
        "TIMESTAMP" => value
            .as_str()
            .and_then(timestamp_text)
            .map_or_else(|| value.clone(), Value::String),
        _ => value.clone(),
    }
}

/// TIMESTAMP cells arrive as epoch seconds in float notation, e.g.
/// `1.7523072E9`. Rendered in UTC as `YYYY-MM-DD HH:MM`, the layout the
/// normalizer reads.
fn timestamp_text(raw: &str) -> Option<String> {
    let seconds = raw.trim().parse::<f64>().ok().filter(|s| s.is_finite())?;
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos).map(|t| t.format("%Y-%m-%d %H:%M").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WarehouseConfig {
        WarehouseConfig {
            project_id: Some("demo-project".to_string()),
            access_token: Some("ya29.test-token".to_string()),
            ..WarehouseConfig::default()
        }
    }

    #[test]
    fn test_missing_credentials_are_unavailable() {
        let err = BigQueryWarehouse::new(&WarehouseConfig::default()).unwrap_err();
        assert!(matches!(err, FlightRiskError::Unavailable { .. }));
    }

    #[test]
    fn test_table_reference_is_validated() {
        let mut bad = config();
        bad.table = "flights`; DROP TABLE x".to_string();
        assert!(matches!(
            BigQueryWarehouse::new(&bad),
            Err(FlightRiskError::Config { .. })
        ));
    }

    #[test]
    fn test_sql_uses_named_parameters() {
        let warehouse = BigQueryWarehouse::new(&config()).unwrap();
        let sql = warehouse.lookup_sql();
        assert!(sql.contains("`demo-project.airline_data.flight_data`"));
        assert!(sql.contains("@flight_number"));
        assert!(sql.contains("@departure_date"));
        assert!(!format!("{warehouse:?}").contains("ya29"));
    }

    #[test]
    fn test_on_time_sql_unions_performance_tables() {
        let warehouse = BigQueryWarehouse::new(&config()).unwrap();
        let sql = warehouse.on_time_sql().unwrap();
        assert!(sql.contains("`demo-project.airline_data.flights_2016`"));
        assert!(sql.contains("`demo-project.airline_data.flights_2018`"));
        assert_eq!(sql.matches("UNION ALL").count(), 2);
        assert!(sql.contains("@airline_code"));

        let mut none = config();
        none.performance_tables.clear();
        assert!(BigQueryWarehouse::new(&none).unwrap().on_time_sql().is_none());

        let mut bad = config();
        bad.performance_tables = vec!["flights` --".to_string()];
        assert!(BigQueryWarehouse::new(&bad).is_err());
    }

    #[test]
    fn test_on_time_rates_from_aggregate_row() {
        let data = json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "total_flights", "type": "INTEGER"},
                {"name": "cancelled_flights", "type": "INTEGER"},
                {"name": "diverted_flights", "type": "INTEGER"},
                {"name": "on_time_flights", "type": "INTEGER"},
                {"name": "delayed_flights", "type": "INTEGER"},
                {"name": "severe_delays", "type": "INTEGER"},
                {"name": "avg_departure_delay", "type": "FLOAT"},
                {"name": "avg_arrival_delay", "type": "FLOAT"}
            ]},
            "rows": [{"f": [
                {"v": "3000"}, {"v": "30"}, {"v": "3"}, {"v": "2400"},
                {"v": "570"}, {"v": "120"}, {"v": "11.4"}, {"v": null}
            ]}]
        });
        let rows = decode_query_response(&data).unwrap();
        let stats = on_time_from_row("wn", &rows[0]).unwrap();

        assert_eq!(stats.airline_code, "WN");
        assert_eq!(stats.total_flights, 3000);
        assert_eq!(stats.on_time_rate, 80.0);
        assert_eq!(stats.cancellation_rate, 1.0);
        assert_eq!(stats.diversion_rate, 0.1);
        assert_eq!(stats.delay_rate, 19.0);
        assert_eq!(stats.severe_delay_rate, 4.0);
        assert_eq!(stats.avg_departure_delay_minutes, Some(11.4));
        assert_eq!(stats.avg_arrival_delay_minutes, None);

        let empty = json!({"total_flights": 0});
        assert!(on_time_from_row("WN", empty.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_decode_typed_rows() {
        let data = json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "flight_number", "type": "INTEGER", "mode": "NULLABLE"},
                {"name": "airline_code", "type": "STRING"},
                {"name": "price", "type": "FLOAT"},
                {"name": "layovers", "type": "RECORD", "mode": "REPEATED", "fields": [
                    {"name": "airport_code", "type": "STRING"},
                    {"name": "layover_duration_minutes", "type": "INTEGER"}
                ]}
            ]},
            "rows": [{"f": [
                {"v": "1234"},
                {"v": "UA"},
                {"v": "219.5"},
                {"v": [{"v": {"f": [{"v": "DEN"}, {"v": "55"}]}}]}
            ]}]
        });

        let rows = decode_query_response(&data).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["flight_number"], json!(1234));
        assert_eq!(row["airline_code"], json!("UA"));
        assert_eq!(row["price"], json!(219.5));
        assert_eq!(
            row["layovers"],
            json!([{"airport_code": "DEN", "layover_duration_minutes": 55}])
        );
    }

    #[test]
    fn test_decode_timestamp_cells() {
        let data = json!({
            "jobComplete": true,
            "schema": {"fields": [
                {"name": "departure_time_local", "type": "TIMESTAMP"},
                {"name": "arrival_time_local", "type": "TIMESTAMP"},
                {"name": "flight_date", "type": "DATE"}
            ]},
            "rows": [{"f": [
                {"v": "1.7523072E9"},
                {"v": "not a time"},
                {"v": "2025-07-12"}
            ]}]
        });

        let row = &decode_query_response(&data).unwrap()[0];
        assert_eq!(row["departure_time_local"], json!("2025-07-12 08:00"));
        assert_eq!(row["arrival_time_local"], json!("not a time"));
        assert_eq!(row["flight_date"], json!("2025-07-12"));
    }

    #[test]
    fn test_no_rows_is_empty() {
        let data = json!({"jobComplete": true, "totalRows": "0"});
        assert!(decode_query_response(&data).unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_job_is_error() {
        let data = json!({"jobComplete": false});
        assert!(decode_query_response(&data).is_err());
    }
}
