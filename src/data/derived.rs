use super::interval::IntervalWindow;
use super::records::StationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Departure and arrival counts for one station over one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationInterval {
    pub station_id: StationId,
    pub window: IntervalWindow,
    pub departures: u32,
    pub arrivals: u32,
}

impl StationInterval {
    pub fn empty(station_id: StationId, window: IntervalWindow) -> Self {
        Self {
            station_id,
            window,
            departures: 0,
            arrivals: 0,
        }
    }

    /// Arrivals minus departures; positive means bikes accumulating
    pub fn net_flow(&self) -> i64 {
        i64::from(self.arrivals) - i64::from(self.departures)
    }

    pub fn is_idle(&self) -> bool {
        self.departures == 0 && self.arrivals == 0
    }
}

/// Which way a station is out of balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Too many bikes, docks running out
    Surplus,
    /// Too few bikes, nothing to hire
    Deficit,
}

impl Direction {
    /// Direction implied by a signed net flow, None when balanced
    pub fn from_net_flow(net_flow: i64) -> Option<Self> {
        match net_flow.signum() {
            1 => Some(Direction::Surplus),
            -1 => Some(Direction::Deficit),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Surplus => f.write_str("surplus"),
            Direction::Deficit => f.write_str("deficit"),
        }
    }
}

/// Occupancy estimate hitting a hard bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clamp {
    Empty,
    Full,
}

impl Clamp {
    pub fn direction(&self) -> Direction {
        match self {
            Clamp::Empty => Direction::Deficit,
            Clamp::Full => Direction::Surplus,
        }
    }
}

/// A flagged station-interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImbalanceEvent {
    pub station_id: StationId,
    pub window: IntervalWindow,
    pub direction: Direction,
    /// Bikes gained or lost over the window
    pub magnitude: u32,
    pub stress: f64,
    pub clamp: Option<Clamp>,
}

/// A planned transfer from a surplus station to a deficit station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedistributionMove {
    pub from_station_id: StationId,
    pub to_station_id: StationId,
    pub bike_count: u32,
    /// 1 is executed first
    pub priority: u32,
    pub distance_km: Option<f64>,
}
