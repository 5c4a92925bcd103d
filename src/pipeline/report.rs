use crate::analysis::{CapacityHotspot, FlowStats, FlowTable, PeakTimes, RankedStation};
use crate::data::{DateRange, Granularity, ImbalanceEvent};
use crate::planning::{RedistributionPlan, SystemBalance};
use crate::utils::config::ConfigError;
use serde::Serialize;
use thiserror::Error;

/// Typed reason a run produced no report
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AnalysisFailure {
    #[error("configuration rejected: {0}")]
    Configuration(#[from] ConfigError),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

/// Computed output of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub period: Option<DateRange>,
    pub granularity: Option<Granularity>,
    pub ranked_stations: Vec<RankedStation>,
    pub imbalance_events: Vec<ImbalanceEvent>,
    pub redistribution_plan: RedistributionPlan,
    pub hotspots: Vec<CapacityHotspot>,
    pub peak_times: PeakTimes,
    pub system_balance: SystemBalance,
}

impl AnalysisReport {
    pub fn is_empty(&self) -> bool {
        self.ranked_stations.is_empty()
            && self.imbalance_events.is_empty()
            && self.redistribution_plan.moves.is_empty()
            && self.hotspots.is_empty()
            && self.system_balance.stations.is_empty()
    }
}

/// Record-level accounting of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub flow: FlowStats,
    pub interval_count: usize,
    pub station_count: usize,
    pub network_net_flow: i64,
    pub conservation_tolerance: u64,
    pub conserved: bool,
    pub notes: Vec<String>,
}

impl Diagnostics {
    pub fn from_flow(flow: &FlowTable) -> Self {
        Self {
            flow: flow.stats.clone(),
            interval_count: flow.window_count(),
            station_count: flow.station_count(),
            network_net_flow: flow.network_net_flow(),
            conservation_tolerance: flow.conservation_tolerance(),
            conserved: flow.is_conserved(),
            notes: Vec::new(),
        }
    }

    pub fn malformed_records(&self) -> usize {
        self.flow.malformed_records()
    }

    pub(crate) fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// Result of `analyze`: either a report or a typed failure, always with diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub failure: Option<AnalysisFailure>,
    pub diagnostics: Diagnostics,
}

impl AnalysisOutcome {
    pub fn completed(report: AnalysisReport, diagnostics: Diagnostics) -> Self {
        Self {
            report,
            failure: None,
            diagnostics,
        }
    }

    /// Empty report carrying the failure
    pub fn failed(failure: AnalysisFailure, mut diagnostics: Diagnostics) -> Self {
        diagnostics.note(failure.to_string());
        Self {
            report: AnalysisReport::default(),
            failure: Some(failure),
            diagnostics,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Print results summary
    pub fn print_summary(&self) {
        let d = &self.diagnostics;
        let r = &self.report;

        println!("\n╔════════════════════════════════════════════════╗");
        println!("║         DOCK BALANCE ANALYSIS SUMMARY          ║");
        println!("╠════════════════════════════════════════════════╣");
        if let Some(failure) = &self.failure {
            println!("║ FAILED: {:<38} ║", truncate(&failure.to_string(), 38));
        }
        if let (Some(period), Some(granularity)) = (&r.period, &r.granularity) {
            println!("║ Period: {:<38} ║", period.to_string());
            println!("║ Interval: {:<36} ║", granularity.label());
        }
        println!("║ Intervals: {:<35} ║", d.interval_count);
        println!("║ Stations: {:<36} ║", d.station_count);
        println!("╠════════════════════════════════════════════════╣");
        println!("║ Events Received: {:<29} ║", d.flow.events_received);
        println!("║ Events Accepted: {:<29} ║", d.flow.events_accepted);
        println!("║ Malformed Records: {:<27} ║", d.malformed_records());
        println!("║ Network Net Flow: {:<28} ║", d.network_net_flow);
        println!("║ Conserved: {:<35} ║", d.conserved);
        println!("╠════════════════════════════════════════════════╣");
        println!("║ Imbalance Events: {:<28} ║", r.imbalance_events.len());
        println!("║ Problem Stations: {:<28} ║", r.ranked_stations.len());
        println!("║ Planned Moves: {:<31} ║", r.redistribution_plan.moves.len());
        println!("║ Bikes Moved: {:<33} ║", r.redistribution_plan.total_moved);
        println!("║ Transfer Distance: {:<27} ║", format!("{:.1} km", r.redistribution_plan.total_distance_km()));
        println!("║ Capacity Hotspots: {:<27} ║", r.hotspots.len());
        println!("║ Significant Stations: {:<24} ║", r.system_balance.significant().count());
        println!("║ Weekday Peaks: {:<31} ║", truncate(&hour_list(&r.peak_times.top_weekday_hours(3)), 31));
        println!("║ Weekend Peaks: {:<31} ║", truncate(&hour_list(&r.peak_times.top_weekend_hours(3)), 31));
        println!("╠════════════════════════════════════════════════╣");
        for b in r.system_balance.top_generators(3) {
            let line = format!("Empties: {} ({})", b.name, b.net_flow);
            println!("║ {:<46} ║", truncate(&line, 46));
        }
        for b in r.system_balance.top_accumulators(3) {
            let line = format!("Fills: {} (+{})", b.name, b.net_flow);
            println!("║ {:<46} ║", truncate(&line, 46));
        }
        for station in r.ranked_stations.iter().take(5) {
            let line = format!(
                "#{} {} ({}, {:.2})",
                station.rank, station.name, station.dominant_direction, station.severity
            );
            println!("║ {:<46} ║", truncate(&line, 46));
        }
        for m in r.redistribution_plan.moves.iter().take(5) {
            let line = format!("{} -> {}: {} bikes", m.from_station_id, m.to_station_id, m.bike_count);
            println!("║ {:<46} ║", line);
        }
        for note in &d.notes {
            println!("║ {:<46} ║", truncate(note, 46));
        }
        println!("╚════════════════════════════════════════════════╝\n");
    }
}

/// "8h (120), 17h (98)"
fn hour_list(hours: &[(u32, u64)]) -> String {
    if hours.is_empty() {
        return "-".to_string();
    }
    hours
        .iter()
        .map(|(hour, arrivals)| format!("{hour}h ({arrivals})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_list() {
        assert_eq!(hour_list(&[]), "-");
        assert_eq!(hour_list(&[(8, 120), (17, 98)]), "8h (120), 17h (98)");
    }

    #[test]
    fn test_failed_outcome_is_empty_with_note() {
        let outcome = AnalysisOutcome::failed(
            AnalysisFailure::InsufficientData("no intervals".to_string()),
            Diagnostics::default(),
        );
        assert!(!outcome.is_success());
        assert!(outcome.report.is_empty());
        assert_eq!(outcome.diagnostics.notes, vec!["insufficient data: no intervals".to_string()]);
        outcome.print_summary();
    }
}
