//! ---
//! gw_section: "03-simulation"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "Simulation feed: synthetic readings, fault injection, scenario replay."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use csv::ReaderBuilder;

use genwatch_engine::model::Reading;

use crate::errors::{Result, SimError};

/// Deterministic reading replay from a recorded scenario file.
///
/// JSON scenarios are an array of reading objects; CSV scenarios carry a
/// `timestamp` column plus one column per parameter key. The cursor wraps, so
/// a scenario loops forever.
#[derive(Debug, Default, Clone)]
pub struct ReplayEngine {
    pub(crate) readings: Vec<Reading>,
    pub(crate) cursor: usize,
}

impl ReplayEngine {
    pub fn from_path(path: &Path) -> Result<Self> {
        let readings = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => read_json(path)?,
            Some("csv") => read_csv(path)?,
            _ => return Err(SimError::UnsupportedFormat(path.to_path_buf())),
        };
        if readings.is_empty() {
            return Err(SimError::EmptyScenario {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            readings,
            cursor: 0,
        })
    }

    /// Concatenate several scenario files into one looping timeline.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut combined = Vec::new();
        for path in paths {
            let engine = Self::from_path(path.as_ref())?;
            combined.extend(engine.readings);
        }
        if combined.is_empty() {
            return Err(SimError::EmptyScenario {
                path: Path::new("<no scenario files>").to_path_buf(),
            });
        }
        Ok(Self {
            readings: combined,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn next_reading(&mut self) -> Option<Reading> {
        if self.readings.is_empty() {
            return None;
        }
        let reading = self.readings[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.readings.len();
        Some(reading)
    }
}

fn read_json(path: &Path) -> Result<Vec<Reading>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn read_csv(path: &Path) -> Result<Vec<Reading>> {
    let file = fs::File::open(path)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader.headers()?.clone();
    let mut readings = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row?;
        let mut reading = Reading::now();
        for (column, field) in headers.iter().zip(row.iter()) {
            if column == "timestamp" {
                // Keep the evaluation-time default for unparsable stamps.
                if let Ok(stamp) = field.parse() {
                    reading.timestamp = stamp;
                }
                continue;
            }
            let value: f64 = field.parse().map_err(|_| SimError::BadCsvValue {
                path: path.to_path_buf(),
                row: row_idx + 1,
                column: column.to_owned(),
                value: field.to_owned(),
            })?;
            reading.values.insert(column.to_owned(), value);
        }
        readings.push(reading);
    }
    Ok(readings)
}
