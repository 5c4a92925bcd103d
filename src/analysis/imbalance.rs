use super::capacity::{AssessedInterval, CapacityAssessment};
use crate::data::{Clamp, Direction, ImbalanceEvent};
use tracing::debug;

/// Station imbalance detector
///
/// Flags station-intervals whose stress breaks the threshold or whose
/// occupancy estimate hits a hard bound.
///
/// Rules:
/// 1. stress > +threshold, or clamped full  => surplus
/// 2. stress < -threshold, or clamped empty => deficit
/// 3. clamps only count for stations whose clamp frequency over the
///    period reaches `clamp_frequency_threshold`
pub struct ImbalanceDetector {
    /// Absolute stress above which an interval is flagged (> 0)
    stress_threshold: f64,

    /// Minimum share of clamped windows before clamps are flagged (0.0-1.0)
    clamp_frequency_threshold: f64,
}

impl ImbalanceDetector {
    /// Create new imbalance detector
    ///
    /// Thresholds are validated by the analysis configuration before
    /// a detector is built.
    pub fn new(stress_threshold: f64, clamp_frequency_threshold: f64) -> Self {
        Self {
            stress_threshold,
            clamp_frequency_threshold,
        }
    }

    /// Detect imbalance across the whole assessment
    ///
    /// Events come out ordered by station id, then window start.
    pub fn detect(&self, assessment: &CapacityAssessment) -> Vec<ImbalanceEvent> {
        let mut events = Vec::new();

        for (id, rows) in &assessment.intervals {
            let clamps_count = assessment
                .profile(*id)
                .map(|p| p.clamp_frequency() >= self.clamp_frequency_threshold)
                .unwrap_or(false);

            events.extend(rows.iter().filter_map(|row| self.classify(row, clamps_count)));
        }

        debug!(
            flagged = events.len(),
            threshold = self.stress_threshold,
            "Imbalance detection complete"
        );

        events
    }

    /// Classify a single assessed interval
    ///
    /// Returns Some(ImbalanceEvent) if the interval is out of balance
    pub fn classify(&self, row: &AssessedInterval, clamps_count: bool) -> Option<ImbalanceEvent> {
        let clamp = row.clamp.filter(|_| clamps_count);

        let direction = if row.stress > self.stress_threshold || clamp == Some(Clamp::Full) {
            Direction::Surplus
        } else if row.stress < -self.stress_threshold || clamp == Some(Clamp::Empty) {
            Direction::Deficit
        } else {
            return None;
        };

        Some(ImbalanceEvent {
            station_id: row.station_id(),
            window: row.interval.window,
            direction,
            magnitude: u32::try_from(row.net_flow().unsigned_abs()).unwrap_or(u32::MAX),
            stress: row.stress,
            clamp,
        })
    }
}
