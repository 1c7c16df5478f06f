//! Feature-store ingest and normalization.
//!
//! This module turns the store's two documents into clean inputs for the
//! pipeline:
//!
//! - `routes.csv` → [`RouteRecord`]s, with **row-level validation**: a
//!   malformed row is skipped, counted, and reported, and the batch continues
//! - `modifiers.json` → a validated [`ModifierSet`]; invalid modifier data is
//!   **load-time fatal** because the engine cannot price off garbage tables
//!
//! Design goals:
//! - Strict schema for required columns (clear errors + exit code 2)
//! - Deterministic behavior (no hidden randomness)
//! - Separation of concerns: no estimation logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{RouteClass, RouteRecord};
use crate::error::AppError;
use crate::tables::ModifierSet;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub key: Option<String>,
    pub message: String,
}

/// Ingest output: normalized records + row errors + counts.
#[derive(Debug, Clone)]
pub struct IngestedRoutes {
    pub records: Vec<RouteRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// Rows carrying an observed market price (regression training set).
    pub labeled_rows: usize,
}

/// Load and validate the modifier tables from `modifiers.json`.
pub fn load_modifier_tables(path: &Path) -> Result<ModifierSet, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!(
            "Failed to open modifier tables '{}': {e}",
            path.display()
        ))
    })?;
    parse_modifier_tables(file, &path.display().to_string())
}

/// Parse and validate modifier tables from any reader (exposed for tests).
pub fn parse_modifier_tables(
    reader: impl std::io::Read,
    source: &str,
) -> Result<ModifierSet, AppError> {
    let tables: ModifierSet = serde_json::from_reader(reader)
        .map_err(|e| AppError::input(format!("Invalid modifier tables in '{source}': {e}")))?;
    tables.validate()?;
    Ok(tables)
}

/// Load `routes.csv` into normalized records.
pub fn load_route_records(path: &Path) -> Result<IngestedRoutes, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("Failed to open routes CSV '{}': {e}", path.display()))
    })?;
    read_route_records(file)
}

/// Read route records from any CSV reader (exposed for tests).
pub fn read_route_records(reader: impl std::io::Read) -> Result<IngestedRoutes, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read routes CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    ensure_required_columns_exist(&header_map)?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in csv_reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    key: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(route) => records.push(route),
            Err((key, message)) => row_errors.push(RowError { line, key, message }),
        }
    }

    if records.is_empty() {
        return Err(AppError::data(
            "No valid route rows remain after validation.",
        ));
    }

    let labeled_rows = records.iter().filter(|r| r.actual_price.is_some()).count();

    Ok(IngestedRoutes {
        records,
        row_errors,
        rows_read,
        labeled_rows,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header (e.g. "﻿origin"). If we don't strip it, schema validation
    // will incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

const REQUIRED_COLUMNS: [&str; 8] = [
    "origin",
    "destination",
    "origin_population",
    "destination_population",
    "weekly_frequency",
    "capacity",
    "route_class",
    "duration",
];

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(AppError::input(format!(
                "Missing required column: `{column}`"
            )));
        }
    }
    Ok(())
}

fn field<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    header_map
        .get(name)
        .and_then(|&idx| record.get(idx))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

type RowResult = Result<RouteRecord, (Option<String>, String)>;

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> RowResult {
    let origin = field(record, header_map, "origin")
        .map(str::to_uppercase)
        .ok_or((None, "Missing origin code".to_string()))?;
    let destination = field(record, header_map, "destination")
        .map(str::to_uppercase)
        .ok_or((None, "Missing destination code".to_string()))?;
    let key = Some(format!("{origin}-{destination}"));

    let err = |message: String| (key.clone(), message);

    let origin_population = parse_number::<u64>(record, header_map, "origin_population")
        .map_err(&err)?;
    let destination_population = parse_number::<u64>(record, header_map, "destination_population")
        .map_err(&err)?;
    let weekly_frequency =
        parse_number::<u32>(record, header_map, "weekly_frequency").map_err(&err)?;

    // Capacity 0 is the store's "unknown" marker, so an absent field maps to 0.
    let capacity = match field(record, header_map, "capacity") {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|e| err(format!("Invalid capacity '{raw}': {e}")))?,
        None => 0,
    };

    let class_raw = field(record, header_map, "route_class")
        .ok_or_else(|| err("Missing route_class".to_string()))?;
    let class = RouteClass::parse(class_raw)
        .ok_or_else(|| err(format!("Unknown route class '{class_raw}'")))?;

    let duration_raw = field(record, header_map, "duration")
        .ok_or_else(|| err("Missing duration".to_string()))?;
    let duration_minutes = parse_flight_duration(duration_raw).map_err(&err)?;

    let carrier = field(record, header_map, "carrier")
        .unwrap_or("Unknown")
        .to_string();
    let aircraft = field(record, header_map, "aircraft")
        .unwrap_or("Unknown")
        .to_string();

    let actual_price = match field(record, header_map, "price") {
        Some(raw) => {
            let price = raw
                .parse::<f64>()
                .map_err(|e| err(format!("Invalid price '{raw}': {e}")))?;
            if !(price.is_finite() && price > 0.0) {
                return Err(err(format!("Invalid price '{raw}': must be > 0")));
            }
            Some(price)
        }
        None => None,
    };

    Ok(RouteRecord {
        origin,
        destination,
        origin_population,
        destination_population,
        weekly_frequency,
        carrier,
        aircraft,
        capacity,
        class,
        duration_minutes,
        actual_price,
    })
}

fn parse_number<T: std::str::FromStr>(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    let raw = field(record, header_map, name).ok_or_else(|| format!("Missing {name}"))?;
    raw.parse::<T>()
        .map_err(|e| format!("Invalid {name} '{raw}': {e}"))
}

/// Decode the store's hours-and-tenths duration format into minutes.
///
/// `"6.30"` is 6 hours and 3 tenths of an hour (390 minutes), **not** 6.30
/// decimal hours. The fractional part must therefore be a whole number of
/// tenths: `"6.3"` and `"6.30"` are valid, `"6.35"` is not.
pub fn parse_flight_duration(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    let (hours_part, frac_part) = match raw.split_once('.') {
        Some((h, f)) => (h, f),
        None => (raw, ""),
    };

    let hours: u32 = hours_part
        .parse()
        .map_err(|e| format!("Invalid duration '{raw}': {e}"))?;

    let tenths: u32 = match frac_part {
        "" => 0,
        f if f.len() == 1 => f
            .parse()
            .map_err(|e| format!("Invalid duration '{raw}': {e}"))?,
        f if f.len() == 2 => {
            let value: u32 = f
                .parse()
                .map_err(|e| format!("Invalid duration '{raw}': {e}"))?;
            if value % 10 != 0 {
                return Err(format!(
                    "Invalid duration '{raw}': fractional part must be whole tenths of an hour"
                ));
            }
            value / 10
        }
        _ => {
            return Err(format!(
                "Invalid duration '{raw}': at most two fractional digits"
            ));
        }
    };

    let minutes = hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(tenths * 10))
        .ok_or_else(|| format!("Invalid duration '{raw}': out of range"))?;

    if minutes == 0 {
        return Err(format!("Invalid duration '{raw}': must be > 0"));
    }

    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "origin,destination,origin_population,destination_population,\
                          weekly_frequency,carrier,aircraft,capacity,route_class,duration,price";

    fn ingest(rows: &str) -> Result<IngestedRoutes, AppError> {
        let data = format!("{HEADER}\n{rows}");
        read_route_records(data.as_bytes())
    }

    #[test]
    fn duration_decodes_hours_and_tenths() {
        assert_eq!(parse_flight_duration("6.30").unwrap(), 390);
        assert_eq!(parse_flight_duration("6.3").unwrap(), 390);
        assert_eq!(parse_flight_duration("0.5").unwrap(), 50);
        assert_eq!(parse_flight_duration("1").unwrap(), 60);
        assert_eq!(parse_flight_duration("10.0").unwrap(), 600);
    }

    #[test]
    fn duration_rejects_malformed_values() {
        // Not whole tenths.
        assert!(parse_flight_duration("6.35").is_err());
        // Too many fractional digits.
        assert!(parse_flight_duration("6.305").is_err());
        assert!(parse_flight_duration("abc").is_err());
        assert!(parse_flight_duration("-2.0").is_err());
        assert!(parse_flight_duration("0.0").is_err());
        assert!(parse_flight_duration("").is_err());
    }

    #[test]
    fn well_formed_rows_are_parsed() {
        let out = ingest(
            "osl,TRD,700000,200000,35,SAS,B738,189,Pure Business,1.0,120.0\n\
             BGO,SVG,280000,130000,14,,,,pure-leisure,0.5,",
        )
        .unwrap();

        assert_eq!(out.rows_read, 2);
        assert!(out.row_errors.is_empty());
        assert_eq!(out.labeled_rows, 1);

        let first = &out.records[0];
        assert_eq!(first.origin, "OSL");
        assert_eq!(first.duration_minutes, 60);
        assert_eq!(first.actual_price, Some(120.0));

        let second = &out.records[1];
        assert_eq!(second.carrier, "Unknown");
        assert_eq!(second.aircraft, "Unknown");
        assert_eq!(second.capacity, 0);
        assert_eq!(second.actual_price, None);
    }

    #[test]
    fn malformed_rows_are_skipped_and_reported() {
        let out = ingest(
            "OSL,TRD,700000,200000,35,SAS,B738,189,Pure Business,1.0,\n\
             OSL,BGO,700000,not-a-number,20,SAS,B738,189,Pure Business,1.0,\n\
             OSL,SVG,700000,130000,20,SAS,B738,189,Interplanetary,1.0,\n\
             OSL,AES,700000,50000,20,SAS,B738,189,Pure Business,1.45,",
        )
        .unwrap();

        assert_eq!(out.rows_read, 4);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.row_errors.len(), 3);
        // Line numbers point into the CSV, 1-based, after the header.
        assert_eq!(out.row_errors[0].line, 3);
        assert_eq!(out.row_errors[0].key.as_deref(), Some("OSL-BGO"));
    }

    #[test]
    fn all_rows_invalid_is_fatal() {
        let err = ingest("OSL,TRD,x,y,z,,,,Pure Business,1.0,").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let data = "origin,destination\nOSL,TRD";
        let err = read_route_records(data.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("origin_population"));
    }

    #[test]
    fn modifier_tables_parse_and_validate() {
        let json = r#"{
            "airline": {"SAS": 1.12, "Ryanair": 0.62},
            "population": [
                {"min": 0, "max": 99999, "multiplier": 0.85},
                {"min": 100000, "max": 999999, "multiplier": 1.0},
                {"min": 1000000, "multiplier": 1.25}
            ],
            "season": [{"min": 152, "max": 243, "multiplier": 1.3}],
            "frequency": [{"min": 0, "max": 6, "multiplier": 1.15}],
            "capacity": [{"min": 0, "max": 99, "multiplier": 1.1}],
            "route_class": {"hub-to-hub": 1.2}
        }"#;
        let tables = parse_modifier_tables(json.as_bytes(), "test").unwrap();
        assert_eq!(tables.airline.lookup("Ryanair"), 0.62);
        assert_eq!(tables.population.lookup(2_000_000), 1.25);
        assert_eq!(tables.route_class.lookup("hub-to-hub"), 1.2);
    }

    #[test]
    fn non_positive_modifier_rejects_the_whole_load() {
        let json = r#"{
            "airline": {"SAS": 0.0},
            "population": [],
            "season": [],
            "frequency": [],
            "capacity": [],
            "route_class": {}
        }"#;
        let err = parse_modifier_tables(json.as_bytes(), "test").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
