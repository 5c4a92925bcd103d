use super::{touches_range, HireDataSource, IngestError};
use crate::data::{DateRange, HireEvent, Station};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads events and stations from local JSON files
///
/// Each file holds either a single JSON array or one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    events_path: PathBuf,
    stations_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(events_path: impl Into<PathBuf>, stations_path: impl Into<PathBuf>) -> Self {
        Self {
            events_path: events_path.into(),
            stations_path: stations_path.into(),
        }
    }
}

impl HireDataSource for JsonFileSource {
    fn fetch_events(&self, range: &DateRange) -> Result<Vec<HireEvent>, IngestError> {
        let all: Vec<HireEvent> = read_records(&self.events_path)?;
        let total = all.len();
        let events: Vec<HireEvent> = all.into_iter().filter(|e| touches_range(e, range)).collect();

        info!(
            path = %self.events_path.display(),
            total,
            in_range = events.len(),
            "Loaded hire events"
        );
        if events.is_empty() {
            return Err(IngestError::Empty("hire events"));
        }
        Ok(events)
    }

    fn fetch_stations(&self) -> Result<Vec<Station>, IngestError> {
        let stations: Vec<Station> = read_records(&self.stations_path)?;
        info!(path = %self.stations_path.display(), count = stations.len(), "Loaded stations");
        if stations.is_empty() {
            return Err(IngestError::Empty("stations"));
        }
        Ok(stations)
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    let contents = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&contents, &path.display().to_string())
}

/// Parse a JSON array, or JSON lines when the text does not open with `[`
pub(crate) fn parse_records<T: DeserializeOwned>(contents: &str, origin: &str) -> Result<Vec<T>, IngestError> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents).map_err(|source| IngestError::Json {
            context: origin.to_string(),
            source,
        });
    }

    let mut records = Vec::new();
    for (n, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| IngestError::Json {
            context: format!("{}:{}", origin, n + 1),
            source,
        })?;
        records.push(record);
    }
    debug!(origin, records = records.len(), "Parsed JSON lines");
    Ok(records)
}
