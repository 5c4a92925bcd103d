use super::flow::FlowTable;
use crate::data::{Clamp, StationId, StationIndex, StationInterval};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Station-interval with its capacity assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessedInterval {
    pub interval: StationInterval,
    pub capacity: u32,
    /// Net flow over capacity, clamped to the stress limit
    pub stress: f64,
    /// Estimated bikes docked at the end of the window
    pub occupancy_estimate: f64,
    pub clamp: Option<Clamp>,
}

impl AssessedInterval {
    pub fn station_id(&self) -> StationId {
        self.interval.station_id
    }

    pub fn net_flow(&self) -> i64 {
        self.interval.net_flow()
    }
}

/// Capacity exhaustion summary for one station over the period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityProfile {
    pub station_id: StationId,
    pub capacity: u32,
    pub interval_count: usize,
    pub empty_clamps: usize,
    pub full_clamps: usize,
    pub final_occupancy: f64,
}

impl CapacityProfile {
    pub fn clamp_count(&self) -> usize {
        self.empty_clamps + self.full_clamps
    }

    /// Share of windows in which the station ran empty or full
    pub fn clamp_frequency(&self) -> f64 {
        if self.interval_count == 0 {
            return 0.0;
        }
        self.clamp_count() as f64 / self.interval_count as f64
    }
}

/// Output of the capacity model
#[derive(Debug, Clone, Default)]
pub struct CapacityAssessment {
    pub intervals: BTreeMap<StationId, Vec<AssessedInterval>>,
    pub profiles: BTreeMap<StationId, CapacityProfile>,
}

impl CapacityAssessment {
    pub fn iter(&self) -> impl Iterator<Item = &AssessedInterval> {
        self.intervals.values().flatten()
    }

    pub fn profile(&self, id: StationId) -> Option<&CapacityProfile> {
        self.profiles.get(&id)
    }
}

/// Dock capacity model
///
/// Converts flow into a stress score and a running occupancy estimate.
/// Without a real dock-level feed the station is assumed to start at
/// `initial_fill_ratio` of its capacity; the running balance is clamped to
/// `[0, capacity]` and every clamp is recorded as an exhaustion signal.
#[derive(Debug, Clone)]
pub struct CapacityModel {
    initial_fill_ratio: f64,
    stress_limit: f64,
}

impl Default for CapacityModel {
    fn default() -> Self {
        Self::new(0.5, 1.0)
    }
}

impl CapacityModel {
    /// # Arguments
    /// * `initial_fill_ratio` - Share of docks occupied at period start (0.0-1.0)
    /// * `stress_limit` - Absolute bound applied to the stress score
    pub fn new(initial_fill_ratio: f64, stress_limit: f64) -> Self {
        Self {
            initial_fill_ratio,
            stress_limit,
        }
    }

    /// Normalised stress of a net flow against capacity
    pub fn stress(&self, net_flow: i64, capacity: u32) -> f64 {
        if capacity == 0 {
            return 0.0;
        }
        (net_flow as f64 / f64::from(capacity)).clamp(-self.stress_limit, self.stress_limit)
    }

    /// Assess every station in the flow table
    pub fn assess(&self, flow: &FlowTable, stations: &StationIndex) -> CapacityAssessment {
        let mut assessment = CapacityAssessment::default();

        for (&id, rows) in &flow.intervals {
            let Some(capacity) = stations.capacity(id) else {
                continue;
            };
            let (assessed, profile) = self.assess_station(id, capacity, rows);
            assessment.intervals.insert(id, assessed);
            assessment.profiles.insert(id, profile);
        }

        assessment
    }

    fn assess_station(
        &self,
        station_id: StationId,
        capacity: u32,
        rows: &[StationInterval],
    ) -> (Vec<AssessedInterval>, CapacityProfile) {
        let cap = f64::from(capacity);
        let mut occupancy = self.initial_fill_ratio * cap;
        let mut profile = CapacityProfile {
            station_id,
            capacity,
            interval_count: rows.len(),
            empty_clamps: 0,
            full_clamps: 0,
            final_occupancy: occupancy,
        };

        let assessed = rows
            .iter()
            .map(|row| {
                let net = row.net_flow();
                let raw = occupancy + net as f64;

                let clamp = if net < 0 && raw <= 0.0 {
                    profile.empty_clamps += 1;
                    Some(Clamp::Empty)
                } else if net > 0 && raw >= cap {
                    profile.full_clamps += 1;
                    Some(Clamp::Full)
                } else {
                    None
                };

                occupancy = raw.clamp(0.0, cap);

                AssessedInterval {
                    interval: row.clone(),
                    capacity,
                    stress: self.stress(net, capacity),
                    occupancy_estimate: occupancy,
                    clamp,
                }
            })
            .collect();

        profile.final_occupancy = occupancy;
        (assessed, profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::flow::FlowAggregator;
    use crate::data::{DateRange, Granularity, HireEvent, IntervalWindow, Station};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn window(h: u32) -> IntervalWindow {
        IntervalWindow {
            start: Utc.with_ymd_and_hms(2016, 6, 1, h, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2016, 6, 1, h + 1, 0, 0).unwrap(),
        }
    }

    fn row(h: u32, departures: u32, arrivals: u32) -> StationInterval {
        StationInterval {
            station_id: 1,
            window: window(h),
            departures,
            arrivals,
        }
    }

    #[test]
    fn test_stress_normalised_and_clamped() {
        let model = CapacityModel::new(0.5, 1.0);

        assert_eq!(model.stress(-13, 20), -0.65);
        assert_eq!(model.stress(45, 20), 1.0);
        assert_eq!(model.stress(5, 0), 0.0);
    }

    #[test]
    fn test_running_occupancy_clamps() {
        let model = CapacityModel::default();
        let rows = vec![row(7, 3, 0), row(8, 9, 1), row(9, 0, 2), row(10, 0, 30)];
        let (assessed, profile) = model.assess_station(1, 20, &rows);

        // 10 -> 7 -> raw -1 clamps empty -> 2 -> raw 32 clamps full
        assert_eq!(assessed[0].occupancy_estimate, 7.0);
        assert_eq!(assessed[0].clamp, None);
        assert_eq!(assessed[1].occupancy_estimate, 0.0);
        assert_eq!(assessed[1].clamp, Some(Clamp::Empty));
        assert_eq!(assessed[2].occupancy_estimate, 2.0);
        assert_eq!(assessed[3].occupancy_estimate, 20.0);
        assert_eq!(assessed[3].clamp, Some(Clamp::Full));

        assert_eq!(profile.empty_clamps, 1);
        assert_eq!(profile.full_clamps, 1);
        assert_eq!(profile.clamp_frequency(), 0.5);
        assert_eq!(profile.final_occupancy, 20.0);
    }

    #[test]
    fn test_idle_full_station_does_not_clamp() {
        let model = CapacityModel::new(1.0, 1.0);
        let rows = vec![row(7, 0, 0), row(8, 1, 1)];
        let (assessed, profile) = model.assess_station(1, 10, &rows);

        assert!(assessed.iter().all(|a| a.clamp.is_none()));
        assert_eq!(profile.clamp_count(), 0);
    }

    #[test]
    fn test_assess_covers_flow_table() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, 2).unwrap(),
        );
        let stations = StationIndex::build(&[Station::new(1, "A", 20), Station::new(2, "B", 20)]);
        let start = Utc.with_ymd_and_hms(2016, 6, 1, 8, 0, 0).unwrap();
        let events: Vec<_> = (0..5)
            .map(|i| HireEvent::new(i, 1, 1, 2, start, start + chrono::Duration::minutes(10)))
            .collect();

        let flow = FlowAggregator::new(Granularity::Daily, range).aggregate(&events, &stations);
        let assessment = CapacityModel::default().assess(&flow, &stations);

        assert_eq!(assessment.iter().count(), 2);
        assert_eq!(assessment.profile(1).unwrap().final_occupancy, 5.0);
        assert_eq!(assessment.profile(2).unwrap().final_occupancy, 15.0);
        assert_eq!(assessment.intervals[&2][0].stress, 0.25);
    }
}
