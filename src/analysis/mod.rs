pub mod flow;
pub mod capacity;
pub mod imbalance;
pub mod ranking;
pub mod hotspots;
pub mod demand;

pub use flow::{FlowAggregator, FlowStats, FlowTable};
pub use capacity::{AssessedInterval, CapacityAssessment, CapacityModel, CapacityProfile};
pub use imbalance::ImbalanceDetector;
pub use ranking::{ProblemRanker, RankedStation, SeverityWeights};
pub use hotspots::{CapacityHotspot, HotspotAnalyzer, HotspotConfig, PeakSlot};
pub use demand::PeakTimes;
