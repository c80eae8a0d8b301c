// sentinel-core-rs/src/severity.rs
// Severity classification for detected anomalies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Baseline failure rate (%) a healthy entity is expected to stay under.
pub const BASELINE_FAILURE_RATE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// Classify an anomaly by failure-rate magnitude and degradation versus
/// baseline. Pure and total for any finite inputs.
///
/// HIGH: >=30% failure, or >=6x baseline with a significant sample.
/// MEDIUM: >=15% failure, or >=3x baseline with a moderate sample.
/// Everything reaching this function below those bands is LOW; callers
/// gate on the detection threshold before classifying.
pub fn classify(failure_rate: f64, sample_size: u64, baseline: f64) -> Severity {
    let degradation = if baseline > 0.0 {
        failure_rate / baseline
    } else {
        failure_rate
    };

    if failure_rate >= 30.0 || (degradation >= 6.0 && sample_size >= 50) {
        return Severity::High;
    }

    if failure_rate >= 15.0 || (degradation >= 3.0 && sample_size >= 30) {
        return Severity::Medium;
    }

    Severity::Low
}
