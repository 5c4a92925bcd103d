pub mod config;
pub mod logger;
pub mod metrics;

pub use config::{AnalysisConfig, Config, ConfigError};
pub use logger::{init_from_config, init_logger};
pub use metrics::PipelineMetrics;
