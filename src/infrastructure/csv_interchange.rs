// CSV codec for the two interchange tables (raw measurements, computed results) joined by date
use crate::domain::measurement::Measurement;
use crate::domain::record::AqiRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MEASUREMENT_COLUMNS: [&str; 6] = [
    "Date",
    "Initial Mass (mg)",
    "Final Mass (mg)",
    "Flow Rate (L/min)",
    "Start Time (min)",
    "Stop Time (min)",
];

pub const RESULT_COLUMNS: [&str; 4] = ["Date", "Concentration (µg/m³)", "AQI Value", "Category"];

/// Both tables as CSV text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeTables {
    pub measurements: String,
    pub results: String,
}

/// One merged row pair, not yet validated against the domain rules.
#[derive(Debug, Clone, PartialEq)]
pub struct InterchangeRecord {
    pub date: NaiveDate,
    pub measurement: Measurement,
    pub concentration: f64,
    pub aqi_value: i64,
    pub category: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MeasurementRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Initial Mass (mg)")]
    initial_mass: f64,
    #[serde(rename = "Final Mass (mg)")]
    final_mass: f64,
    #[serde(rename = "Flow Rate (L/min)")]
    flow_rate: f64,
    #[serde(rename = "Start Time (min)")]
    start_time: f64,
    #[serde(rename = "Stop Time (min)")]
    stop_time: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Concentration (µg/m³)")]
    concentration: f64,
    #[serde(rename = "AQI Value")]
    aqi_value: i64,
    #[serde(rename = "Category")]
    category: String,
}

impl From<&AqiRecord> for MeasurementRow {
    fn from(record: &AqiRecord) -> Self {
        let m = &record.measurement;
        Self {
            date: record.date,
            initial_mass: m.initial_mass_mg,
            final_mass: m.final_mass_mg,
            flow_rate: m.flow_rate_lpm,
            start_time: m.start_time_min,
            stop_time: m.stop_time_min,
        }
    }
}

impl From<&AqiRecord> for ResultRow {
    fn from(record: &AqiRecord) -> Self {
        Self {
            date: record.date,
            concentration: (record.concentration * 10.0).round() / 10.0,
            aqi_value: i64::from(record.index),
            category: record.category.label().to_string(),
        }
    }
}

fn write_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Encode records into the two tables; concentrations are rounded to one decimal.
pub fn write_tables(records: &[AqiRecord]) -> Result<InterchangeTables> {
    // Header rows come from serde even when there are no records
    if records.is_empty() {
        return Ok(InterchangeTables {
            measurements: format!("{}\n", MEASUREMENT_COLUMNS.join(",")),
            results: format!("{}\n", RESULT_COLUMNS.join(",")),
        });
    }

    Ok(InterchangeTables {
        measurements: write_rows(records.iter().map(MeasurementRow::from))?,
        results: write_rows(records.iter().map(ResultRow::from))?,
    })
}

fn missing_columns(reader: &mut csv::Reader<&[u8]>, required: &[&str]) -> Result<Vec<String>> {
    let headers = reader.headers().context("Failed to read CSV header")?;
    Ok(required
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect())
}

/// Decode and merge the two tables by date.
///
/// Row-level problems are collected as messages instead of aborting; a result
/// row whose date has no measurement row is reported and skipped.
pub fn read_tables(tables: &InterchangeTables) -> (Vec<InterchangeRecord>, Vec<String>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    let mut measurement_reader = csv::Reader::from_reader(tables.measurements.as_bytes());
    let mut result_reader = csv::Reader::from_reader(tables.results.as_bytes());

    for (table, reader, required) in [
        ("measurements", &mut measurement_reader, &MEASUREMENT_COLUMNS[..]),
        ("results", &mut result_reader, &RESULT_COLUMNS[..]),
    ] {
        match missing_columns(reader, required) {
            Ok(missing) if missing.is_empty() => {}
            Ok(missing) => errors.push(format!("Missing columns in {} table: {:?}", table, missing)),
            Err(e) => errors.push(format!("Error reading {} table: {:#}", table, e)),
        }
    }
    if !errors.is_empty() {
        return (records, errors);
    }

    let mut measurements = BTreeMap::new();
    for (i, row) in measurement_reader.deserialize::<MeasurementRow>().enumerate() {
        match row {
            Ok(row) => {
                measurements.insert(
                    row.date,
                    Measurement::new(row.initial_mass, row.final_mass, row.flow_rate, row.start_time, row.stop_time),
                );
            }
            Err(e) => errors.push(format!("Error processing measurement row {}: {}", i + 1, e)),
        }
    }

    for (i, row) in result_reader.deserialize::<ResultRow>().enumerate() {
        match row {
            Ok(row) => match measurements.get(&row.date) {
                Some(measurement) => records.push(InterchangeRecord {
                    date: row.date,
                    measurement: *measurement,
                    concentration: row.concentration,
                    aqi_value: row.aqi_value,
                    category: row.category,
                }),
                None => errors.push(format!("No PM2.5 data found for date: {}", row.date)),
            },
            Err(e) => errors.push(format!("Error processing result row {}: {}", i + 1, e)),
        }
    }

    tracing::info!("Read {} records from interchange tables", records.len());
    if !errors.is_empty() {
        tracing::warn!("Interchange read completed with {} errors", errors.len());
    }

    (records, errors)
}

/// Blank tables pre-filled with two example days.
pub fn template_tables() -> InterchangeTables {
    let mut measurements = MEASUREMENT_COLUMNS.join(",");
    measurements.push_str("\n2025-08-01,100.0,102.5,16.7,0.0,1440.0\n2025-08-02,105.2,108.1,16.7,0.0,1440.0\n");

    let mut results = RESULT_COLUMNS.join(",");
    results.push_str("\n2025-08-01,28.5,83,Moderate\n2025-08-02,35.2,98,Moderate\n");

    InterchangeTables {
        measurements,
        results,
    }
}
