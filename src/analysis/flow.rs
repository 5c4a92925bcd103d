use crate::data::{
    locate, DateRange, Granularity, HireEvent, IntervalWindow, StationId, StationIndex,
    StationInterval,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Hire flow aggregator
///
/// FIRST STAGE: turns raw hire events into per-station, per-window
/// departure and arrival counts.
///
/// Algorithm:
/// 1. Partition the requested range into windows of the chosen granularity
/// 2. Seed every known station with a zero row per window
/// 3. Drop events referencing unknown stations (counted, never fatal)
/// 4. Count each departure in the window holding `start_time` and each
///    arrival in the window holding `end_time`; events are never split
///
/// Counting is additive, so the result does not depend on event order.
pub struct FlowAggregator {
    granularity: Granularity,
    range: DateRange,
}

impl FlowAggregator {
    pub fn new(granularity: Granularity, range: DateRange) -> Self {
        Self { granularity, range }
    }

    /// Aggregate events into a flow table covering every indexed station
    pub fn aggregate(&self, events: &[HireEvent], stations: &StationIndex) -> FlowTable {
        let windows = self.granularity.partition(&self.range);

        let mut intervals: BTreeMap<StationId, Vec<StationInterval>> = stations
            .ids()
            .map(|id| {
                let rows = windows.iter().map(|w| StationInterval::empty(id, *w)).collect();
                (id, rows)
            })
            .collect();

        let mut stats = FlowStats {
            events_received: events.len(),
            zero_capacity_stations: stations.zero_capacity_count(),
            duplicate_stations: stations.duplicate_count(),
            ..FlowStats::default()
        };

        for event in events {
            if !stations.contains(event.start_station_id) {
                stats.unknown_start_station += 1;
                continue;
            }
            if !stations.contains(event.end_station_id) {
                stats.unknown_end_station += 1;
                continue;
            }
            if event.is_inverted() {
                stats.inverted_timestamps += 1;
                continue;
            }

            let departure = locate(&windows, event.start_time);
            let arrival = locate(&windows, event.end_time);

            match (departure, arrival) {
                (None, None) => {
                    stats.outside_period += 1;
                    continue;
                }
                (Some(_), None) => stats.unreturned += 1,
                (None, Some(_)) => stats.carried_in += 1,
                (Some(_), Some(_)) => {}
            }
            stats.events_accepted += 1;

            if let (Some(i), Some(rows)) = (departure, intervals.get_mut(&event.start_station_id)) {
                rows[i].departures += 1;
            }
            if let (Some(i), Some(rows)) = (arrival, intervals.get_mut(&event.end_station_id)) {
                rows[i].arrivals += 1;
            }
        }

        if stats.malformed_records() > 0 {
            warn!(
                malformed = stats.malformed_records(),
                unknown_start = stats.unknown_start_station,
                unknown_end = stats.unknown_end_station,
                inverted = stats.inverted_timestamps,
                "Skipped malformed hire events"
            );
        }
        debug!(
            granularity = %self.granularity,
            windows = windows.len(),
            stations = intervals.len(),
            accepted = stats.events_accepted,
            "Aggregated hire flow"
        );

        FlowTable {
            granularity: self.granularity,
            range: self.range,
            windows,
            intervals,
            stats,
        }
    }
}

/// Per-station flow over a partitioned period
#[derive(Debug, Clone)]
pub struct FlowTable {
    pub granularity: Granularity,
    pub range: DateRange,
    pub windows: Vec<IntervalWindow>,
    /// One row per window for every station, ordered by station id
    pub intervals: BTreeMap<StationId, Vec<StationInterval>>,
    pub stats: FlowStats,
}

impl FlowTable {
    pub fn station(&self, id: StationId) -> Option<&[StationInterval]> {
        self.intervals.get(&id).map(Vec::as_slice)
    }

    /// All station-intervals, station by station
    pub fn iter(&self) -> impl Iterator<Item = &StationInterval> {
        self.intervals.values().flatten()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn station_count(&self) -> usize {
        self.intervals.len()
    }

    /// (departures, arrivals) summed over the whole period
    pub fn period_totals(&self, id: StationId) -> (u64, u64) {
        self.station(id)
            .unwrap_or_default()
            .iter()
            .fold((0, 0), |(d, a), row| (d + u64::from(row.departures), a + u64::from(row.arrivals)))
    }

    /// Sum of net flow across the network
    pub fn network_net_flow(&self) -> i64 {
        self.iter().map(StationInterval::net_flow).sum()
    }

    /// Allowed drift from zero: hires that crossed the period boundary
    pub fn conservation_tolerance(&self) -> u64 {
        (self.stats.unreturned + self.stats.carried_in) as u64
    }

    /// Bikes are conserved modulo boundary-crossing hires
    pub fn is_conserved(&self) -> bool {
        self.network_net_flow().unsigned_abs() <= self.conservation_tolerance()
    }
}

/// Ingestion quality counters for one aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStats {
    pub events_received: usize,
    pub events_accepted: usize,
    pub unknown_start_station: usize,
    pub unknown_end_station: usize,
    pub inverted_timestamps: usize,
    /// Neither end of the hire falls in the period
    pub outside_period: usize,
    /// Departed in the period, returned after it
    pub unreturned: usize,
    /// Departed before the period, returned in it
    pub carried_in: usize,
    pub zero_capacity_stations: usize,
    pub duplicate_stations: usize,
}

impl FlowStats {
    pub fn malformed_records(&self) -> usize {
        self.unknown_start_station + self.unknown_end_station + self.inverted_timestamps
    }
}
