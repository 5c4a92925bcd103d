pub mod data;
pub mod analysis;
pub mod planning;
pub mod pipeline;
pub mod ingest;
pub mod utils;

// Re-export commonly used types
pub use data::{
    DateRange, Direction, Granularity, HireEvent, ImbalanceEvent, RedistributionMove, Station,
    StationId, StationInterval,
};
pub use analysis::{
    CapacityModel, FlowAggregator, FlowTable, HotspotAnalyzer, ImbalanceDetector, PeakTimes,
    ProblemRanker, RankedStation,
};
pub use planning::{RedistributionPlan, RedistributionPlanner, SnapshotMode, SystemBalance};
pub use pipeline::{analyze, analyze_source, AnalysisFailure, AnalysisOutcome, AnalysisReport, Diagnostics};
pub use ingest::{HireDataSource, IngestError, IngestionCache, JsonFileSource, MemorySource, WarehouseClient};
pub use utils::{AnalysisConfig, Config, ConfigError};
