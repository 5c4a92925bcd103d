use crate::analysis::{HotspotConfig, SeverityWeights};
use crate::data::{DateRange, Granularity};
use crate::planning::SnapshotMode;
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rejected analysis parameters
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("stress threshold must be positive, got {0}")]
    NonPositiveThreshold(f64),

    #[error("clamp frequency threshold must be within [0, 1], got {0}")]
    ClampFrequencyOutOfRange(f64),

    #[error("top_n must be at least 1")]
    ZeroTopN,

    #[error("date range start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("initial fill ratio must be within [0, 1], got {0}")]
    FillRatioOutOfRange(f64),

    #[error("stress limit must be positive, got {0}")]
    NonPositiveStressLimit(f64),

    #[error("stress threshold {threshold} must be below the stress limit {limit}")]
    ThresholdAboveStressLimit { threshold: f64, limit: f64 },

    #[error("severity weight '{name}' must be non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("hotspot bands must satisfy 0 < near ({near}) <= at ({at})")]
    InvalidHotspotBands { near: f64, at: f64 },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Parameters of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub interval: Granularity,
    pub stress_threshold: f64,
    pub clamp_frequency_threshold: f64,
    pub top_n: usize,
    pub date_range: DateRange,
    pub capacity: CapacityConfig,
    pub ranking: SeverityWeights,
    pub planner: PlannerConfig,
    pub hotspots: HotspotConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval: Granularity::Weekly,
            stress_threshold: 0.5,
            clamp_frequency_threshold: 0.1,
            top_n: 10,
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default(),
                NaiveDate::from_ymd_opt(2016, 12, 31).unwrap_or_default(),
            ),
            capacity: CapacityConfig::default(),
            ranking: SeverityWeights::default(),
            planner: PlannerConfig::default(),
            hotspots: HotspotConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Check every parameter before any computation starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.stress_threshold > 0.0 && self.stress_threshold.is_finite()) {
            return Err(ConfigError::NonPositiveThreshold(self.stress_threshold));
        }
        if !(0.0..=1.0).contains(&self.clamp_frequency_threshold) {
            return Err(ConfigError::ClampFrequencyOutOfRange(self.clamp_frequency_threshold));
        }
        if self.top_n == 0 {
            return Err(ConfigError::ZeroTopN);
        }
        if !self.date_range.is_ordered() {
            return Err(ConfigError::InvertedDateRange {
                start: self.date_range.start,
                end: self.date_range.end,
            });
        }
        if !(0.0..=1.0).contains(&self.capacity.initial_fill_ratio) {
            return Err(ConfigError::FillRatioOutOfRange(self.capacity.initial_fill_ratio));
        }
        if !(self.capacity.stress_limit > 0.0) {
            return Err(ConfigError::NonPositiveStressLimit(self.capacity.stress_limit));
        }
        // Stress never exceeds the limit, so a threshold at or above it flags nothing
        if self.stress_threshold >= self.capacity.stress_limit {
            return Err(ConfigError::ThresholdAboveStressLimit {
                threshold: self.stress_threshold,
                limit: self.capacity.stress_limit,
            });
        }

        let weights = [
            ("interval_count", self.ranking.interval_count),
            ("average_magnitude", self.ranking.average_magnitude),
            ("clamp_frequency", self.ranking.clamp_frequency),
        ];
        for (name, value) in weights {
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }

        let (near, at) = (self.hotspots.near_capacity_pct, self.hotspots.at_capacity_pct);
        if !(near > 0.0 && near <= at) {
            return Err(ConfigError::InvalidHotspotBands { near, at });
        }

        Ok(())
    }
}

/// Occupancy model tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Share of docks assumed occupied at period start
    pub initial_fill_ratio: f64,
    pub stress_limit: f64,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            initial_fill_ratio: 0.5,
            stress_limit: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub snapshot: SnapshotMode,
    /// Net flow above which a station is listed as significant
    pub min_significant_net_flow: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            snapshot: SnapshotMode::Period,
            min_significant_net_flow: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Files,
    Warehouse,
}

/// Where hire data comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub events_path: PathBuf,
    pub stations_path: PathBuf,
    pub warehouse_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Files,
            events_path: PathBuf::from("data/events.json"),
            stations_path: PathBuf::from("data/stations.json"),
            warehouse_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub output: String,
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: "pretty".to_string(),
            file_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load from environment variable or default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_FILE")
            .unwrap_or_else(|_| "config/analysis.toml".to_string());
        Self::from_file(path)
    }
}
