use crate::analysis::FlowTable;
use crate::data::{
    haversine_km, Direction, ImbalanceEvent, RedistributionMove, StationId, StationIndex,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Which imbalance picture the plan is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    /// Flagged stations of the final window only
    LatestInterval,
    /// Net flow over the whole period for every flagged station
    #[default]
    Period,
}

/// Bikes a station needs to shed (surplus) or receive (deficit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationNeed {
    pub station_id: StationId,
    pub direction: Direction,
    pub bikes: u32,
    pub location: Option<(f64, f64)>,
}

impl StationNeed {
    /// Build the planner input from detected imbalance
    ///
    /// Each station appears at most once; stations whose need nets to
    /// zero are left out.
    pub fn from_imbalance(
        events: &[ImbalanceEvent],
        flow: &FlowTable,
        stations: &StationIndex,
        mode: SnapshotMode,
    ) -> Vec<StationNeed> {
        let mut signed: BTreeMap<StationId, i64> = BTreeMap::new();

        match mode {
            SnapshotMode::LatestInterval => {
                let Some(last) = flow.windows.last() else {
                    return Vec::new();
                };
                for event in events.iter().filter(|e| e.window == *last) {
                    let bikes = i64::from(event.magnitude);
                    let delta = match event.direction {
                        Direction::Surplus => bikes,
                        Direction::Deficit => -bikes,
                    };
                    *signed.entry(event.station_id).or_insert(0) += delta;
                }
            }
            SnapshotMode::Period => {
                for event in events {
                    signed.entry(event.station_id).or_insert_with(|| {
                        let (departures, arrivals) = flow.period_totals(event.station_id);
                        arrivals as i64 - departures as i64
                    });
                }
            }
        }

        signed
            .into_iter()
            .filter_map(|(station_id, net)| {
                let direction = Direction::from_net_flow(net)?;
                Some(StationNeed {
                    station_id,
                    direction,
                    bikes: u32::try_from(net.unsigned_abs()).unwrap_or(u32::MAX),
                    location: stations.get(station_id).and_then(|s| s.location()),
                })
            })
            .collect()
    }
}

/// Bikes left over after planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Residual {
    pub station_id: StationId,
    pub bikes: u32,
}

/// Ordered transfer plan with its accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedistributionPlan {
    pub moves: Vec<RedistributionMove>,
    pub total_surplus: u64,
    pub total_deficit: u64,
    pub total_moved: u64,
    pub unmatched_surplus: Vec<Residual>,
    pub unmatched_deficit: Vec<Residual>,
}

impl RedistributionPlan {
    /// Everything movable was moved: min(total surplus, total deficit)
    pub fn is_exhaustive(&self) -> bool {
        self.total_moved == self.total_surplus.min(self.total_deficit)
    }

    pub fn total_distance_km(&self) -> f64 {
        self.moves.iter().filter_map(|m| m.distance_km).sum()
    }
}

/// Greedy redistribution planner
///
/// Repeatedly pairs the largest remaining surplus with the largest
/// remaining deficit and moves min(surplus, deficit) bikes. Each step
/// exhausts at least one side, so the plan has at most
/// surplus stations + deficit stations moves.
///
/// Ties between equal surpluses go to the lowest station id. Ties between
/// equal deficits go to the station nearest the chosen surplus when both
/// have coordinates, otherwise the lowest station id.
#[derive(Debug, Clone, Default)]
pub struct RedistributionPlanner;

impl RedistributionPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, needs: &[StationNeed]) -> RedistributionPlan {
        let mut surplus: Vec<Slot> = Vec::new();
        let mut deficit: Vec<Slot> = Vec::new();
        for need in needs.iter().filter(|n| n.bikes > 0) {
            let slot = Slot {
                station_id: need.station_id,
                remaining: need.bikes,
                location: need.location,
            };
            match need.direction {
                Direction::Surplus => surplus.push(slot),
                Direction::Deficit => deficit.push(slot),
            }
        }

        let total_surplus: u64 = surplus.iter().map(|s| u64::from(s.remaining)).sum();
        let total_deficit: u64 = deficit.iter().map(|s| u64::from(s.remaining)).sum();

        let mut moves = Vec::new();
        let mut total_moved = 0u64;

        while let Some(si) = pick_largest(&surplus, None) {
            let Some(di) = pick_largest(&deficit, surplus[si].location) else {
                break;
            };

            let bikes = surplus[si].remaining.min(deficit[di].remaining);
            surplus[si].remaining -= bikes;
            deficit[di].remaining -= bikes;
            total_moved += u64::from(bikes);

            let distance_km = match (surplus[si].location, deficit[di].location) {
                (Some(a), Some(b)) => haversine_km(a, b),
                _ => None,
            };

            debug!(
                from = surplus[si].station_id,
                to = deficit[di].station_id,
                bikes,
                "Planned transfer"
            );

            moves.push(RedistributionMove {
                from_station_id: surplus[si].station_id,
                to_station_id: deficit[di].station_id,
                bike_count: bikes,
                priority: moves.len() as u32 + 1,
                distance_km,
            });
        }

        let plan = RedistributionPlan {
            moves,
            total_surplus,
            total_deficit,
            total_moved,
            unmatched_surplus: residuals(&surplus),
            unmatched_deficit: residuals(&deficit),
        };

        info!(
            moves = plan.moves.len(),
            bikes = plan.total_moved,
            unmatched_surplus = plan.total_surplus - plan.total_moved,
            unmatched_deficit = plan.total_deficit - plan.total_moved,
            "Redistribution plan ready"
        );

        plan
    }
}

struct Slot {
    station_id: StationId,
    remaining: u32,
    location: Option<(f64, f64)>,
}

/// Index of the slot with the most bikes remaining
fn pick_largest(slots: &[Slot], anchor: Option<(f64, f64)>) -> Option<usize> {
    let mut best: Option<usize> = None;

    for (i, slot) in slots.iter().enumerate() {
        if slot.remaining == 0 {
            continue;
        }
        let wins = match best {
            None => true,
            Some(b) => match slot.remaining.cmp(&slots[b].remaining) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => tie_break(slot, &slots[b], anchor) == Ordering::Less,
            },
        };
        if wins {
            best = Some(i);
        }
    }

    best
}

fn tie_break(a: &Slot, b: &Slot, anchor: Option<(f64, f64)>) -> Ordering {
    let distance = |slot: &Slot| haversine_km(anchor?, slot.location?);

    match (distance(a), distance(b)) {
        (Some(da), Some(db)) if da != db => da.total_cmp(&db),
        _ => a.station_id.cmp(&b.station_id),
    }
}

fn residuals(slots: &[Slot]) -> Vec<Residual> {
    let mut left: Vec<Residual> = slots
        .iter()
        .filter(|s| s.remaining > 0)
        .map(|s| Residual {
            station_id: s.station_id,
            bikes: s.remaining,
        })
        .collect();
    left.sort_by_key(|r| r.station_id);
    left
}

#[cfg(test)]
mod tests {
    use super::*;

    fn need(station_id: StationId, direction: Direction, bikes: u32) -> StationNeed {
        StationNeed {
            station_id,
            direction,
            bikes,
            location: None,
        }
    }

    fn located(station_id: StationId, direction: Direction, bikes: u32, lat: f64, lon: f64) -> StationNeed {
        StationNeed {
            location: Some((lat, lon)),
            ..need(station_id, direction, bikes)
        }
    }

    #[test]
    fn test_single_matching_pair() {
        let plan = RedistributionPlanner::new().plan(&[
            need(1, Direction::Deficit, 13),
            need(2, Direction::Surplus, 13),
        ]);

        assert_eq!(plan.moves.len(), 1);
        let m = &plan.moves[0];
        assert_eq!((m.from_station_id, m.to_station_id, m.bike_count), (2, 1, 13));
        assert_eq!(m.priority, 1);
        assert!(plan.unmatched_surplus.is_empty());
        assert!(plan.unmatched_deficit.is_empty());
    }

    #[test]
    fn test_largest_pairs_first_and_residual_reported() {
        let plan = RedistributionPlanner::new().plan(&[
            need(1, Direction::Surplus, 10),
            need(2, Direction::Surplus, 4),
            need(3, Direction::Deficit, 7),
            need(4, Direction::Deficit, 2),
        ]);

        let moves: Vec<_> = plan
            .moves
            .iter()
            .map(|m| (m.from_station_id, m.to_station_id, m.bike_count))
            .collect();
        assert_eq!(moves, vec![(1, 3, 7), (2, 4, 2)]);
        assert_eq!(plan.total_moved, 9);
        assert_eq!(plan.total_surplus, 14);
        assert_eq!(plan.total_deficit, 9);
        assert!(plan.is_exhaustive());
        assert_eq!(
            plan.unmatched_surplus,
            vec![Residual { station_id: 1, bikes: 3 }, Residual { station_id: 2, bikes: 2 }]
        );
    }

    #[test]
    fn test_move_bounded_by_both_sides() {
        let needs = vec![
            need(1, Direction::Surplus, 5),
            need(2, Direction::Deficit, 3),
            need(3, Direction::Deficit, 3),
            need(4, Direction::Deficit, 3),
        ];
        let plan = RedistributionPlanner::new().plan(&needs);

        assert!(plan.moves.len() <= needs.len());
        for m in &plan.moves {
            assert!(m.bike_count <= 5);
            assert!(m.bike_count <= 3);
        }
        assert_eq!(plan.total_moved, 5);
        assert_eq!(plan.unmatched_deficit.iter().map(|r| r.bikes).sum::<u32>(), 4);
    }

    #[test]
    fn test_equal_deficits_prefer_nearest() {
        let plan = RedistributionPlanner::new().plan(&[
            located(1, Direction::Surplus, 5, 51.50, -0.12),
            located(2, Direction::Deficit, 5, 51.53, -0.20),
            located(3, Direction::Deficit, 5, 51.505, -0.125),
        ]);

        assert_eq!(plan.moves[0].to_station_id, 3);
        assert!(plan.moves[0].distance_km.unwrap() < 1.0);
    }

    #[test]
    fn test_equal_deficits_without_coordinates_prefer_lowest_id() {
        let plan = RedistributionPlanner::new().plan(&[
            need(9, Direction::Surplus, 5),
            need(7, Direction::Deficit, 5),
            need(4, Direction::Deficit, 5),
        ]);

        assert_eq!(plan.moves[0].to_station_id, 4);
        assert_eq!(plan.unmatched_deficit, vec![Residual { station_id: 7, bikes: 5 }]);
    }

    #[test]
    fn test_one_sided_needs_produce_no_moves() {
        let plan = RedistributionPlanner::new().plan(&[need(1, Direction::Deficit, 4)]);

        assert!(plan.moves.is_empty());
        assert_eq!(plan.total_moved, 0);
        assert_eq!(plan.unmatched_deficit.len(), 1);
    }
}
