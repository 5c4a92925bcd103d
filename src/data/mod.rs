pub mod records;
pub mod interval;
pub mod derived;
pub mod index;
pub mod synthetic;

pub use records::{HireEvent, Station, StationId, haversine_km};
pub use interval::{DateRange, Granularity, IntervalWindow, is_weekend, locate};
pub use derived::{Clamp, Direction, ImbalanceEvent, RedistributionMove, StationInterval};
pub use index::StationIndex;
pub use synthetic::{SyntheticDataSet, SyntheticSpec};
