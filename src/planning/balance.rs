use crate::analysis::FlowTable;
use crate::data::{StationId, StationIndex};
use serde::{Deserialize, Serialize};

/// How a station behaves over the whole period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationRole {
    /// Fills up: more arrivals than departures
    Accumulator,
    /// Empties out: more departures than arrivals
    Generator,
    Balanced,
}

impl StationRole {
    pub fn from_net_flow(net_flow: i64) -> Self {
        match net_flow.signum() {
            1 => StationRole::Accumulator,
            -1 => StationRole::Generator,
            _ => StationRole::Balanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationBalance {
    pub station_id: StationId,
    pub name: String,
    pub capacity: u32,
    pub outflows: u64,
    pub inflows: u64,
    pub net_flow: i64,
    /// Net flow as a percentage of dock count
    pub imbalance_pct: f64,
    pub role: StationRole,
}

/// Network-wide balance over the analysed period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemBalance {
    /// Active stations, largest absolute net flow first
    pub stations: Vec<StationBalance>,
    /// Bikes needing a move: sum of |net flow| / 2
    pub total_imbalance: f64,
    pub total_trips: u64,
    pub imbalance_pct_of_trips: f64,
    pub bikes_per_interval: f64,
    pub network_net_flow: i64,
    pub conservation_tolerance: u64,
    pub conserved: bool,
    pub min_significant_net_flow: u64,
}

impl SystemBalance {
    /// Summarise period flows; stations with no activity are skipped
    pub fn from_flow(flow: &FlowTable, stations: &StationIndex, min_significant_net_flow: u64) -> Self {
        let mut balances: Vec<StationBalance> = flow
            .intervals
            .keys()
            .filter_map(|&id| {
                let station = stations.get(id)?;
                let (outflows, inflows) = flow.period_totals(id);
                if outflows == 0 && inflows == 0 {
                    return None;
                }
                let net_flow = inflows as i64 - outflows as i64;
                Some(StationBalance {
                    station_id: id,
                    name: station.name.clone(),
                    capacity: station.capacity,
                    outflows,
                    inflows,
                    net_flow,
                    imbalance_pct: net_flow as f64 / f64::from(station.capacity) * 100.0,
                    role: StationRole::from_net_flow(net_flow),
                })
            })
            .collect();

        balances.sort_by(|a, b| {
            b.net_flow
                .unsigned_abs()
                .cmp(&a.net_flow.unsigned_abs())
                .then(a.station_id.cmp(&b.station_id))
        });

        let total_imbalance = balances.iter().map(|b| b.net_flow.unsigned_abs()).sum::<u64>() as f64 / 2.0;
        let total_trips: u64 = balances.iter().map(|b| b.outflows).sum();

        Self {
            total_imbalance,
            total_trips,
            imbalance_pct_of_trips: if total_trips > 0 {
                total_imbalance / total_trips as f64 * 100.0
            } else {
                0.0
            },
            bikes_per_interval: total_imbalance / flow.window_count().max(1) as f64,
            network_net_flow: flow.network_net_flow(),
            conservation_tolerance: flow.conservation_tolerance(),
            conserved: flow.is_conserved(),
            min_significant_net_flow,
            stations: balances,
        }
    }

    /// Stations whose absolute net flow exceeds the significance floor
    pub fn significant(&self) -> impl Iterator<Item = &StationBalance> {
        self.stations
            .iter()
            .filter(move |b| b.net_flow.unsigned_abs() > self.min_significant_net_flow)
    }

    /// Stations losing the most bikes
    pub fn top_generators(&self, n: usize) -> Vec<&StationBalance> {
        self.stations
            .iter()
            .filter(|b| b.role == StationRole::Generator)
            .take(n)
            .collect()
    }

    /// Stations gaining the most bikes
    pub fn top_accumulators(&self, n: usize) -> Vec<&StationBalance> {
        self.stations
            .iter()
            .filter(|b| b.role == StationRole::Accumulator)
            .take(n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FlowAggregator;
    use crate::data::{DateRange, Granularity, HireEvent, Station};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn flow_with(trips: &[(StationId, StationId, u32)]) -> (FlowTable, StationIndex) {
        let stations = StationIndex::build(&[
            Station::new(1, "Clapham", 20),
            Station::new(2, "Bank", 40),
            Station::new(3, "Camden", 25),
            Station::new(4, "Idle", 10),
        ]);
        let start = Utc.with_ymd_and_hms(2016, 6, 1, 8, 0, 0).unwrap();
        let mut events = Vec::new();
        for &(from, to, count) in trips {
            for _ in 0..count {
                let id = events.len() as u64;
                events.push(HireEvent::new(id, 1, from, to, start, start + Duration::minutes(20)));
            }
        }
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2016, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2016, 6, 8).unwrap(),
        );
        let flow = FlowAggregator::new(Granularity::Daily, range).aggregate(&events, &stations);
        (flow, stations)
    }

    #[test]
    fn test_roles_and_totals() {
        let (flow, stations) = flow_with(&[(1, 2, 30), (3, 2, 4), (2, 3, 10)]);
        let balance = SystemBalance::from_flow(&flow, &stations, 20);

        assert_eq!(balance.stations.len(), 3);
        assert_eq!(balance.stations[0].station_id, 1);
        assert_eq!(balance.stations[0].role, StationRole::Generator);

        let bank = &balance.stations[1];
        assert_eq!(bank.station_id, 2);
        assert_eq!(bank.net_flow, 24);
        assert_eq!(bank.role, StationRole::Accumulator);
        assert!((bank.imbalance_pct - 60.0).abs() < 1e-9);

        // |-30| + |24| + |6| = 60
        assert_eq!(balance.total_imbalance, 30.0);
        assert_eq!(balance.total_trips, 44);
        assert_eq!(balance.bikes_per_interval, 30.0 / 7.0);
        assert!(balance.conserved);
        assert_eq!(balance.network_net_flow, 0);
    }

    #[test]
    fn test_significant_and_top_lists() {
        let (flow, stations) = flow_with(&[(1, 2, 30), (3, 2, 4), (2, 3, 10)]);
        let balance = SystemBalance::from_flow(&flow, &stations, 20);

        let significant: Vec<_> = balance.significant().map(|b| b.station_id).collect();
        assert_eq!(significant, vec![1, 2]);
        assert_eq!(balance.top_generators(5)[0].station_id, 1);
        assert_eq!(balance.top_accumulators(5).len(), 2);
    }
}
