use super::report::{AnalysisFailure, AnalysisOutcome, AnalysisReport, Diagnostics};
use crate::analysis::{
    CapacityModel, FlowAggregator, HotspotAnalyzer, ImbalanceDetector, PeakTimes, ProblemRanker,
};
use crate::data::{HireEvent, Station, StationIndex};
use crate::ingest::HireDataSource;
use crate::planning::{RedistributionPlanner, StationNeed, SystemBalance};
use crate::utils::config::AnalysisConfig;
use tracing::{info, warn};

/// Run the full analysis over an already fetched data set
///
/// Stages run in order: flow aggregation, capacity assessment, imbalance
/// detection, ranking and redistribution planning, followed by the
/// hotspot, peak-time and balance summaries. The function is pure and
/// never panics on bad input; every problem is reported in the outcome.
pub fn analyze(events: &[HireEvent], stations: &[Station], config: &AnalysisConfig) -> AnalysisOutcome {
    if let Some(rejected) = preflight(config) {
        return rejected;
    }

    if stations.is_empty() {
        return AnalysisOutcome::failed(
            AnalysisFailure::DataUnavailable("no stations returned".to_string()),
            Diagnostics::default(),
        );
    }
    if events.is_empty() {
        return AnalysisOutcome::failed(
            AnalysisFailure::DataUnavailable(format!("no hire events for {}", config.date_range)),
            Diagnostics::default(),
        );
    }

    let index = StationIndex::build(stations);
    let flow = FlowAggregator::new(config.interval, config.date_range).aggregate(events, &index);
    let mut diagnostics = Diagnostics::from_flow(&flow);

    if index.is_empty() {
        return AnalysisOutcome::failed(
            AnalysisFailure::InsufficientData(format!(
                "none of {} stations has a positive dock count",
                stations.len()
            )),
            diagnostics,
        );
    }

    let malformed = diagnostics.malformed_records();
    if malformed > 0 {
        diagnostics.note(format!("{} malformed records skipped", malformed));
    }
    if flow.stats.events_accepted == 0 {
        diagnostics.note(format!("no valid hires fall within {}", config.date_range));
    }
    if !diagnostics.conserved {
        warn!(
            net_flow = diagnostics.network_net_flow,
            tolerance = diagnostics.conservation_tolerance,
            "Network flow not conserved"
        );
        let note = format!(
            "network net flow {} exceeds tolerance {}",
            diagnostics.network_net_flow, diagnostics.conservation_tolerance
        );
        diagnostics.note(note);
    }

    let assessment = CapacityModel::new(config.capacity.initial_fill_ratio, config.capacity.stress_limit)
        .assess(&flow, &index);

    let imbalance_events = ImbalanceDetector::new(config.stress_threshold, config.clamp_frequency_threshold)
        .detect(&assessment);

    let ranked_stations = ProblemRanker::new(config.ranking, config.top_n)
        .rank(&imbalance_events, &assessment, &index);

    let needs = StationNeed::from_imbalance(&imbalance_events, &flow, &index, config.planner.snapshot);
    let redistribution_plan = RedistributionPlanner::new().plan(&needs);

    let hotspots = HotspotAnalyzer::new(config.hotspots.clone(), config.top_n)
        .analyze(events, &index, &config.date_range, flow.window_count());
    let peak_times = PeakTimes::from_events(events, &index, &config.date_range);
    let system_balance = SystemBalance::from_flow(&flow, &index, config.planner.min_significant_net_flow);

    info!(
        range = %config.date_range,
        interval = %config.interval,
        intervals = diagnostics.interval_count,
        stations = diagnostics.station_count,
        imbalance_events = imbalance_events.len(),
        moves = redistribution_plan.moves.len(),
        "Analysis complete"
    );

    let report = AnalysisReport {
        period: Some(config.date_range),
        granularity: Some(config.interval),
        ranked_stations,
        imbalance_events,
        redistribution_plan,
        hotspots,
        peak_times,
        system_balance,
    };

    AnalysisOutcome::completed(report, diagnostics)
}

/// Fetch from `source` and analyze; source failures become `DataUnavailable`
pub fn analyze_source<S: HireDataSource + ?Sized>(source: &S, config: &AnalysisConfig) -> AnalysisOutcome {
    if let Some(rejected) = preflight(config) {
        return rejected;
    }

    let stations = match source.fetch_stations() {
        Ok(stations) => stations,
        Err(e) => {
            warn!(error = %e, "Station fetch failed");
            return AnalysisOutcome::failed(
                AnalysisFailure::DataUnavailable(e.to_string()),
                Diagnostics::default(),
            );
        }
    };
    let events = match source.fetch_events(&config.date_range) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "Event fetch failed");
            return AnalysisOutcome::failed(
                AnalysisFailure::DataUnavailable(e.to_string()),
                Diagnostics::default(),
            );
        }
    };

    analyze(&events, &stations, config)
}

/// Failures decided by the configuration alone, before any data is looked at
fn preflight(config: &AnalysisConfig) -> Option<AnalysisOutcome> {
    if let Err(e) = config.validate() {
        warn!(error = %e, "Rejected analysis configuration");
        return Some(AnalysisOutcome::failed(e.into(), Diagnostics::default()));
    }
    if config.interval.partition(&config.date_range).is_empty() {
        return Some(AnalysisOutcome::failed(
            AnalysisFailure::InsufficientData(format!(
                "{} yields no {} intervals",
                config.date_range, config.interval
            )),
            Diagnostics::default(),
        ));
    }
    None
}
