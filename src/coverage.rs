//! Static coverage summary for a classification run.
//!
//! The percentage is the share of analyzed methods classified as tested.
//! It says nothing about which lines a test run executes.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// Summary of a run, with an optional pass threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub tested: usize,
    pub untested: usize,
    pub total: usize,
    /// Tested share in percent, rounded down to one decimal
    pub percent: f64,
    /// Minimum percent required to pass, if any
    pub threshold: Option<f64>,
    pub passed: bool,
}

/// Compute the summary and check it against `threshold`.
pub fn calculate_with_threshold(result: &AnalysisResult, threshold: Option<f64>) -> CoverageSummary {
    let tested = result.tested.len();
    let untested = result.untested.len();
    let total = tested + untested;

    let percent = if total == 0 {
        100.0
    } else {
        ((tested as f64 / total as f64) * 1000.0).floor() / 10.0
    };

    let passed = threshold.map_or(true, |t| percent >= t);

    CoverageSummary {
        tested,
        untested,
        total,
        percent,
        threshold,
        passed,
    }
}
