// sentinel-core-rs/src/tracker.rs
// Cross-cycle issue persistence tracking.
//
// The backing map is owned by AgentMemory; the transition functions here
// take it by reference together with an explicit `now` so the state
// machine stays clock-independent and directly testable.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Most recent severity observations kept per issue.
pub const SEVERITY_HISTORY_LIMIT: usize = 10;
/// Hours a resolved issue is retained before the sweep drops it.
pub const DEFAULT_RESOLVED_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueStatus {
    New,
    Recurring,
    Ongoing,
}

impl IssueStatus {
    fn from_count(occurrence_count: u64) -> Self {
        match occurrence_count {
            0 | 1 => IssueStatus::New,
            2 => IssueStatus::Recurring,
            _ => IssueStatus::Ongoing,
        }
    }
}

/// Tracked history for one issue key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub first_detected: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrence_count: u64,
    pub severity_history: Vec<Severity>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Read view of an issue's tracked history at decision time. The
/// duration is recomputed from `first_detected` on every call and never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSnapshot {
    pub status: IssueStatus,
    pub first_detected: DateTime<Utc>,
    pub occurrence_count: u64,
    pub duration_minutes: i64,
}

pub(crate) fn duration_minutes(first_detected: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - first_detected).num_seconds().max(0) / 60
}

/// Record one observation of `key` and derive its persistence status.
///
/// Absent keys are created NEW with count 1; existing keys bump the
/// count, append the severity to the bounded history, and derive
/// RECURRING at count 2, ONGOING from count 3 onward.
pub(crate) fn track(
    issues: &mut HashMap<String, IssueRecord>,
    key: &str,
    severity: Severity,
    now: DateTime<Utc>,
) -> PersistenceSnapshot {
    let record = issues.entry(key.to_string()).or_insert_with(|| IssueRecord {
        first_detected: now,
        last_seen: now,
        occurrence_count: 0,
        severity_history: Vec::new(),
        resolved: false,
        resolved_at: None,
    });

    record.last_seen = now;
    record.occurrence_count += 1;
    record.severity_history.push(severity);
    if record.severity_history.len() > SEVERITY_HISTORY_LIMIT {
        let excess = record.severity_history.len() - SEVERITY_HISTORY_LIMIT;
        record.severity_history.drain(..excess);
    }

    PersistenceSnapshot {
        status: IssueStatus::from_count(record.occurrence_count),
        first_detected: record.first_detected,
        occurrence_count: record.occurrence_count,
        duration_minutes: duration_minutes(record.first_detected, now),
    }
}

/// Mark an issue resolved out of band. Returns false for unknown keys.
pub(crate) fn mark_resolved(
    issues: &mut HashMap<String, IssueRecord>,
    key: &str,
    now: DateTime<Utc>,
) -> bool {
    match issues.get_mut(key) {
        Some(record) => {
            record.resolved = true;
            record.resolved_at = Some(now);
            true
        }
        None => false,
    }
}

/// Drop resolved records whose age since resolution exceeds `max_age`.
/// Unresolved records are never pruned regardless of age. Returns the
/// number of records removed.
pub(crate) fn cleanup(
    issues: &mut HashMap<String, IssueRecord>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> usize {
    let before = issues.len();
    issues.retain(|_, record| {
        if !record.resolved {
            return true;
        }
        let resolved_at = record.resolved_at.unwrap_or(now);
        now - resolved_at <= max_age
    });
    before - issues.len()
}
