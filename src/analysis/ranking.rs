use super::capacity::CapacityAssessment;
use crate::data::{Direction, ImbalanceEvent, StationId, StationIndex};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Weights of the severity score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub interval_count: f64,
    pub average_magnitude: f64,
    pub clamp_frequency: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            interval_count: 1.0,
            average_magnitude: 0.25,
            clamp_frequency: 10.0,
        }
    }
}

/// A problem station with its severity breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStation {
    /// 1 is the most severe
    pub rank: usize,
    pub station_id: StationId,
    pub name: String,
    pub severity: f64,
    pub imbalance_count: usize,
    pub surplus_count: usize,
    pub deficit_count: usize,
    pub average_magnitude: f64,
    pub clamp_frequency: f64,
    pub dominant_direction: Direction,
}

/// Problem station ranker
///
/// Combines imbalance counts, magnitudes and clamp frequency into one
/// severity score per station:
///
/// severity = w_count * imbalance_count
///          + w_magnitude * average_magnitude
///          + w_clamp * clamp_frequency
///
/// Ordered by severity descending, ties by ascending station id.
pub struct ProblemRanker {
    weights: SeverityWeights,
    top_n: usize,
}

impl ProblemRanker {
    /// # Arguments
    /// * `weights` - Severity component weights
    /// * `top_n` - Number of stations returned to the caller
    pub fn new(weights: SeverityWeights, top_n: usize) -> Self {
        Self { weights, top_n }
    }

    /// Rank stations that produced at least one imbalance event
    pub fn rank(
        &self,
        events: &[ImbalanceEvent],
        assessment: &CapacityAssessment,
        stations: &StationIndex,
    ) -> Vec<RankedStation> {
        let mut by_station: BTreeMap<StationId, Vec<&ImbalanceEvent>> = BTreeMap::new();
        for event in events {
            by_station.entry(event.station_id).or_default().push(event);
        }

        let mut ranked: Vec<RankedStation> = by_station
            .into_iter()
            .map(|(id, station_events)| {
                let clamp_frequency = assessment
                    .profile(id)
                    .map(|p| p.clamp_frequency())
                    .unwrap_or(0.0);
                self.score(id, stations.name(id), &station_events, clamp_frequency)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.severity
                .total_cmp(&a.severity)
                .then(a.station_id.cmp(&b.station_id))
        });
        ranked.truncate(self.top_n);

        for (i, station) in ranked.iter_mut().enumerate() {
            station.rank = i + 1;
        }

        ranked
    }

    fn score(
        &self,
        station_id: StationId,
        name: &str,
        events: &[&ImbalanceEvent],
        clamp_frequency: f64,
    ) -> RankedStation {
        let magnitudes: Vec<f64> = events.iter().map(|e| f64::from(e.magnitude)).collect();
        let average_magnitude = if magnitudes.is_empty() {
            0.0
        } else {
            magnitudes.iter().mean()
        };

        let surplus_count = events
            .iter()
            .filter(|e| e.direction == Direction::Surplus)
            .count();
        let deficit_count = events.len() - surplus_count;

        let severity = self.weights.interval_count * events.len() as f64
            + self.weights.average_magnitude * average_magnitude
            + self.weights.clamp_frequency * clamp_frequency;

        RankedStation {
            rank: 0,
            station_id,
            name: name.to_string(),
            severity,
            imbalance_count: events.len(),
            surplus_count,
            deficit_count,
            average_magnitude,
            clamp_frequency,
            dominant_direction: dominant_direction(events, surplus_count, deficit_count),
        }
    }
}

/// Direction with more flagged windows; equal counts fall back to net
/// bikes moved, then to deficit
fn dominant_direction(events: &[&ImbalanceEvent], surplus: usize, deficit: usize) -> Direction {
    match surplus.cmp(&deficit) {
        std::cmp::Ordering::Greater => Direction::Surplus,
        std::cmp::Ordering::Less => Direction::Deficit,
        std::cmp::Ordering::Equal => {
            let net: i64 = events
                .iter()
                .map(|e| match e.direction {
                    Direction::Surplus => i64::from(e.magnitude),
                    Direction::Deficit => -i64::from(e.magnitude),
                })
                .sum();
            Direction::from_net_flow(net).unwrap_or(Direction::Deficit)
        }
    }
}
