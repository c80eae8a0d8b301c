// sentinel-core-rs/src/detect.rs
// Anomaly and error-pattern detection over aggregated traffic.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{EntityStats, TrafficSnapshot};
use crate::severity::{classify, Severity, BASELINE_FAILURE_RATE};

/// Alert when an entity's failure rate exceeds this percentage.
pub const FAILURE_RATE_THRESHOLD: f64 = 5.0;
/// Entities with fewer transactions than this are skipped entirely.
pub const MIN_SAMPLE_SIZE: u64 = 10;
/// An error code repeating at least this often becomes a pattern.
pub const MIN_PATTERN_OCCURRENCES: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Bank,
    Method,
    Error,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Bank => write!(f, "bank"),
            EntityKind::Method => write!(f, "method"),
            EntityKind::Error => write!(f, "error"),
        }
    }
}

/// An above-threshold failure-rate condition for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub entity: String,
    pub severity: Severity,
    pub failure_rate: f64,
    pub threshold: f64,
    pub sample_size: u64,
    pub failure_count: u64,
}

/// A repeating error code observed in the recent-failure window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub error_code: String,
    pub occurrences: u64,
    pub total_failures: u64,
}

impl ErrorPattern {
    /// Error patterns carry a fixed severity; occurrence count does not
    /// escalate the tier the way entity anomalies do.
    pub fn severity(&self) -> Severity {
        Severity::Medium
    }
}

/// Closed set of detector outputs feeding decision synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    BankAnomaly(Anomaly),
    MethodAnomaly(Anomaly),
    ErrorPattern(ErrorPattern),
}

impl Finding {
    pub fn entity(&self) -> &str {
        match self {
            Finding::BankAnomaly(a) | Finding::MethodAnomaly(a) => &a.entity,
            Finding::ErrorPattern(p) => &p.error_code,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Finding::BankAnomaly(_) => EntityKind::Bank,
            Finding::MethodAnomaly(_) => EntityKind::Method,
            Finding::ErrorPattern(_) => EntityKind::Error,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Finding::BankAnomaly(a) | Finding::MethodAnomaly(a) => a.severity,
            Finding::ErrorPattern(p) => p.severity(),
        }
    }

    /// Stable key used to track this issue across cycles.
    pub fn issue_key(&self) -> String {
        match self {
            Finding::BankAnomaly(a) => format!("{}_failure_spike", a.entity),
            Finding::MethodAnomaly(a) => format!("{}_method_failures", a.entity),
            Finding::ErrorPattern(p) => format!("{}_repeated_error", p.error_code),
        }
    }
}

/// Run every detector over one snapshot. Bank and method aggregates are
/// scanned identically and independently; no cross-entity comparison.
pub fn detect_all(snapshot: &TrafficSnapshot) -> Vec<Finding> {
    let mut findings: Vec<Finding> = Vec::new();

    findings.extend(
        detect_entity_anomalies(&snapshot.by_bank)
            .into_iter()
            .map(Finding::BankAnomaly),
    );
    findings.extend(
        detect_entity_anomalies(&snapshot.by_method)
            .into_iter()
            .map(Finding::MethodAnomaly),
    );
    findings.extend(
        detect_error_patterns(snapshot)
            .into_iter()
            .map(Finding::ErrorPattern),
    );

    findings
}

/// Scan one entity map for above-threshold failure rates.
pub fn detect_entity_anomalies(stats: &HashMap<String, EntityStats>) -> Vec<Anomaly> {
    let mut anomalies: Vec<Anomaly> = Vec::new();

    for (entity, entry) in stats {
        // Minimum-sample gate; also keeps the rate division well-defined.
        if entry.total < MIN_SAMPLE_SIZE {
            continue;
        }

        let failure_rate = entry.failures as f64 / entry.total as f64 * 100.0;
        if failure_rate > FAILURE_RATE_THRESHOLD {
            anomalies.push(Anomaly {
                entity: entity.clone(),
                severity: classify(failure_rate, entry.total, BASELINE_FAILURE_RATE),
                failure_rate: (failure_rate * 100.0).round() / 100.0,
                threshold: FAILURE_RATE_THRESHOLD,
                sample_size: entry.total,
                failure_count: entry.failures,
            });
        }
    }

    // Map iteration order is arbitrary; sort for stable reporting.
    anomalies.sort_by(|a, b| a.entity.cmp(&b.entity));
    anomalies
}

/// Group the recent-failure window by error code and emit a pattern for
/// any code recurring at or above the occurrence floor.
pub fn detect_error_patterns(snapshot: &TrafficSnapshot) -> Vec<ErrorPattern> {
    if snapshot.recent_failures.is_empty() {
        return Vec::new();
    }

    let mut counts: HashMap<&str, u64> = HashMap::new();
    for failure in &snapshot.recent_failures {
        let code = failure.error_code.as_deref().unwrap_or("UNKNOWN");
        *counts.entry(code).or_insert(0) += 1;
    }

    let total_failures = snapshot.recent_failures.len() as u64;
    let mut patterns: Vec<ErrorPattern> = counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_PATTERN_OCCURRENCES)
        .map(|(code, occurrences)| ErrorPattern {
            error_code: code.to_string(),
            occurrences,
            total_failures,
        })
        .collect();

    patterns.sort_by(|a, b| a.error_code.cmp(&b.error_code));
    patterns
}
