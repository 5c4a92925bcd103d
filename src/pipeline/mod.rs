pub mod engine;
pub mod report;

pub use engine::{analyze, analyze_source};
pub use report::{AnalysisFailure, AnalysisOutcome, AnalysisReport, Diagnostics};
