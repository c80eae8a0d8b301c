// sentinel-core-rs/src/model.rs
// Input contract: raw payment events and the aggregated traffic snapshot
// the reasoning pipeline consumes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILURE: &str = "failure";

/// Raw payment-transaction outcome as produced by the ingestion feed.
///
/// Every field is optional on the wire; missing values are mapped to
/// neutral labels during aggregation instead of failing the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Per-entity rollup of transaction counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStats {
    pub total: u64,
    pub failures: u64,
    pub successes: u64,
}

/// One failed transaction retained for error-pattern detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub transaction_id: Option<String>,
    pub bank: String,
    pub method: String,
    pub error_code: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Aggregated view of one observation window. Immutable input to the
/// detectors; produced by `from_events` or an external ingestion step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub total: u64,
    pub by_status: HashMap<String, u64>,
    pub by_bank: HashMap<String, EntityStats>,
    pub by_method: HashMap<String, EntityStats>,
    pub recent_failures: Vec<FailureRecord>,
}

impl TrafficSnapshot {
    /// Aggregate raw events into per-bank and per-method rollups.
    ///
    /// Missing bank/method labels land under "unknown" so a malformed
    /// event can never fail the cycle.
    pub fn from_events(events: &[PaymentEvent]) -> Self {
        let mut snapshot = TrafficSnapshot {
            total: events.len() as u64,
            ..Default::default()
        };

        for event in events {
            let status = event.status.as_deref().unwrap_or("unknown");
            *snapshot.by_status.entry(status.to_string()).or_insert(0) += 1;

            let bank = event.bank.as_deref().unwrap_or("unknown");
            let method = event.method.as_deref().unwrap_or("unknown");

            let bank_stats = snapshot.by_bank.entry(bank.to_string()).or_default();
            bank_stats.total += 1;
            match status {
                STATUS_FAILURE => bank_stats.failures += 1,
                STATUS_SUCCESS => bank_stats.successes += 1,
                _ => {}
            }

            let method_stats = snapshot.by_method.entry(method.to_string()).or_default();
            method_stats.total += 1;
            match status {
                STATUS_FAILURE => method_stats.failures += 1,
                STATUS_SUCCESS => method_stats.successes += 1,
                _ => {}
            }

            if status == STATUS_FAILURE {
                snapshot.recent_failures.push(FailureRecord {
                    transaction_id: event.transaction_id.clone(),
                    bank: bank.to_string(),
                    method: method.to_string(),
                    error_code: event.error_code.clone(),
                    timestamp: event.timestamp,
                });
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: &str, bank: Option<&str>, method: Option<&str>) -> PaymentEvent {
        PaymentEvent {
            transaction_id: Some("txn-1".to_string()),
            status: Some(status.to_string()),
            bank: bank.map(str::to_string),
            method: method.map(str::to_string),
            error_code: None,
            timestamp: None,
        }
    }

    #[test]
    fn aggregates_per_bank_and_method() {
        let events = vec![
            event("success", Some("HDFC"), Some("upi")),
            event("failure", Some("HDFC"), Some("upi")),
            event("success", Some("ICICI"), Some("card")),
        ];

        let snapshot = TrafficSnapshot::from_events(&events);

        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.by_status.get("success"), Some(&2));
        assert_eq!(snapshot.by_status.get("failure"), Some(&1));

        let hdfc = snapshot.by_bank.get("HDFC").unwrap();
        assert_eq!(hdfc.total, 2);
        assert_eq!(hdfc.failures, 1);
        assert_eq!(hdfc.successes, 1);

        let upi = snapshot.by_method.get("upi").unwrap();
        assert_eq!(upi.total, 2);
        assert_eq!(upi.failures, 1);

        assert_eq!(snapshot.recent_failures.len(), 1);
        assert_eq!(snapshot.recent_failures[0].bank, "HDFC");
    }

    #[test]
    fn missing_fields_default_to_unknown() {
        let events = vec![PaymentEvent {
            transaction_id: None,
            status: Some("failure".to_string()),
            bank: None,
            method: None,
            error_code: None,
            timestamp: None,
        }];

        let snapshot = TrafficSnapshot::from_events(&events);

        assert!(snapshot.by_bank.contains_key("unknown"));
        assert!(snapshot.by_method.contains_key("unknown"));
        assert_eq!(snapshot.recent_failures[0].bank, "unknown");
    }

    #[test]
    fn unrecognized_status_counts_toward_total_only() {
        let events = vec![event("timeout", Some("HDFC"), Some("upi"))];

        let snapshot = TrafficSnapshot::from_events(&events);
        let hdfc = snapshot.by_bank.get("HDFC").unwrap();

        assert_eq!(hdfc.total, 1);
        assert_eq!(hdfc.failures, 0);
        assert_eq!(hdfc.successes, 0);
        assert!(snapshot.recent_failures.is_empty());
    }
}
