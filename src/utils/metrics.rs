use crate::pipeline::{AnalysisFailure, AnalysisOutcome};
use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Pipeline counters, owned by the caller of `analyze`
pub struct PipelineMetrics {
    registry: Registry,
    runs: IntCounterVec,
    malformed_records: IntCounter,
    imbalance_events: IntCounter,
    bikes_planned: IntCounter,
    run_duration: Histogram,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("dock_balance".to_string()), None)?;

        let runs = IntCounterVec::new(
            Opts::new("runs_total", "Analysis runs by outcome"),
            &["outcome"],
        )?;
        let malformed_records = IntCounter::new("malformed_records_total", "Hire events skipped as malformed")?;
        let imbalance_events = IntCounter::new("imbalance_events_total", "Imbalance events detected")?;
        let bikes_planned = IntCounter::new("bikes_planned_total", "Bikes moved by redistribution plans")?;
        let run_duration = Histogram::with_opts(
            HistogramOpts::new("run_duration_seconds", "Wall time of one analysis run")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        )?;

        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(malformed_records.clone()))?;
        registry.register(Box::new(imbalance_events.clone()))?;
        registry.register(Box::new(bikes_planned.clone()))?;
        registry.register(Box::new(run_duration.clone()))?;

        Ok(Self {
            registry,
            runs,
            malformed_records,
            imbalance_events,
            bikes_planned,
            run_duration,
        })
    }

    /// Record one finished run
    pub fn observe(&self, outcome: &AnalysisOutcome, elapsed: Duration) {
        let label = match &outcome.failure {
            None => "success",
            Some(AnalysisFailure::Configuration(_)) => "configuration",
            Some(AnalysisFailure::DataUnavailable(_)) => "data_unavailable",
            Some(AnalysisFailure::InsufficientData(_)) => "insufficient_data",
        };
        self.runs.with_label_values(&[label]).inc();
        self.malformed_records.inc_by(outcome.diagnostics.malformed_records() as u64);
        self.imbalance_events.inc_by(outcome.report.imbalance_events.len() as u64);
        self.bikes_planned.inc_by(outcome.report.redistribution_plan.total_moved);
        self.run_duration.observe(elapsed.as_secs_f64());
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AnalysisReport, Diagnostics};

    #[test]
    fn test_observe_and_render() {
        let metrics = PipelineMetrics::new().unwrap();
        let mut diagnostics = Diagnostics::default();
        diagnostics.flow.unknown_end_station = 3;

        let mut report = AnalysisReport::default();
        report.redistribution_plan.total_moved = 13;

        metrics.observe(&AnalysisOutcome::completed(report, diagnostics), Duration::from_millis(20));
        metrics.observe(
            &AnalysisOutcome::failed(
                AnalysisFailure::DataUnavailable("no stations returned".into()),
                Diagnostics::default(),
            ),
            Duration::from_millis(1),
        );

        let text = metrics.render().unwrap();
        assert!(text.contains("dock_balance_runs_total{outcome=\"success\"} 1"));
        assert!(text.contains("dock_balance_runs_total{outcome=\"data_unavailable\"} 1"));
        assert!(text.contains("dock_balance_malformed_records_total 3"));
        assert!(text.contains("dock_balance_bikes_planned_total 13"));
        assert!(text.contains("dock_balance_run_duration_seconds_count 2"));
    }
}
