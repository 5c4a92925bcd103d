pub mod file;
pub mod memory;
pub mod cache;
pub mod warehouse;

use crate::data::{DateRange, HireEvent, Station};
use std::path::PathBuf;
use thiserror::Error;

pub use cache::{CacheKey, IngestionCache};
pub use file::JsonFileSource;
pub use memory::MemorySource;
pub use warehouse::WarehouseClient;

/// Failures at the ingestion boundary
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("warehouse responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid warehouse URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("no {0} returned")]
    Empty(&'static str),
}

/// Anything that can supply hire events and station metadata
pub trait HireDataSource {
    /// Events with a departure or arrival inside `range`
    fn fetch_events(&self, range: &DateRange) -> Result<Vec<HireEvent>, IngestError>;

    fn fetch_stations(&self) -> Result<Vec<Station>, IngestError>;
}

/// Range filter shared by the in-process sources
pub(crate) fn touches_range(event: &HireEvent, range: &DateRange) -> bool {
    range.contains(event.start_time) || range.contains(event.end_time)
}
