// sentinel-core-rs/src/decide.rs
// Decision synthesis: maps each finding plus its persistence snapshot to
// a remediation recommendation.
//
// Action, confidence, and risk are threshold-driven on the finding's own
// severity and rate; persistence status only shapes the narrative. The
// measured evidence is carried structurally on the decision so no
// downstream consumer ever has to re-parse the reasoning text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detect::{Anomaly, EntityKind, ErrorPattern, Finding};
use crate::severity::Severity;
use crate::tracker::{IssueStatus, PersistenceSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Outcome of a decision as reported by the feedback collaborator.
/// Decisions start pending; anything else counts as completed for
/// success-rate accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// Structured measurements backing a decision, populated at synthesis
/// time. Entity anomalies fill the rate fields; error patterns fill the
/// occurrence fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub failure_rate: Option<f64>,
    pub baseline: Option<f64>,
    pub sample_size: Option<u64>,
    pub failure_count: Option<u64>,
    pub occurrences: Option<u64>,
}

/// A synthesized, human-readable remediation recommendation tied to one
/// finding. Never deleted individually; evicted only by log capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub issue: String,
    pub action: String,
    pub confidence: u8,
    pub risk: RiskLevel,
    pub reasoning: String,
    pub entity: String,
    pub entity_kind: EntityKind,
    pub severity: Severity,
    pub persistence: PersistenceSnapshot,
    pub evidence: Evidence,
    pub outcome: DecisionOutcome,
    pub reward: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn decision_id(now: DateTime<Utc>, entity: &str) -> String {
    format!("DEC_{}_{}", now.timestamp(), entity)
}

/// Synthesize one decision from a finding and its persistence snapshot.
/// Total over the closed finding set.
pub fn synthesize(
    finding: &Finding,
    persistence: &PersistenceSnapshot,
    now: DateTime<Utc>,
) -> Decision {
    match finding {
        Finding::BankAnomaly(anomaly) => bank_decision(anomaly, persistence, now),
        Finding::MethodAnomaly(anomaly) => method_decision(anomaly, persistence, now),
        Finding::ErrorPattern(pattern) => pattern_decision(pattern, persistence, now),
    }
}

fn bank_decision(
    anomaly: &Anomaly,
    persistence: &PersistenceSnapshot,
    now: DateTime<Utc>,
) -> Decision {
    let bank = &anomaly.entity;
    let (action, confidence, risk) =
        if anomaly.severity == Severity::High || anomaly.failure_rate > 30.0 {
            (
                format!("CRITICAL: Temporarily route {bank} traffic to backup banks"),
                95,
                RiskLevel::High,
            )
        } else if anomaly.severity == Severity::Medium || anomaly.failure_rate > 15.0 {
            (
                format!("Reduce {bank} traffic allocation by 40%"),
                85,
                RiskLevel::Medium,
            )
        } else {
            (
                format!("Monitor {bank} closely - increase logging"),
                70,
                RiskLevel::Low,
            )
        };

    let mut reasoning = format!(
        "Based on {} transactions, {} showing {}% failure rate (baseline: {}%). {} transactions failed.",
        anomaly.sample_size, bank, anomaly.failure_rate, anomaly.threshold, anomaly.failure_count
    );
    reasoning.push_str(&match persistence.status {
        IssueStatus::Ongoing => format!(
            " This degradation has persisted across {} observation windows ({} minutes).",
            persistence.occurrence_count, persistence.duration_minutes
        ),
        IssueStatus::Recurring => format!(
            " This issue has occurred {} times in the past {} minutes.",
            persistence.occurrence_count, persistence.duration_minutes
        ),
        IssueStatus::New => " This is a newly detected issue.".to_string(),
    });
    reasoning.push_str(&format!(" Severity: {}.", anomaly.severity));

    Decision {
        id: decision_id(now, bank),
        timestamp: now,
        issue: format!("Detected {} failure spike ({}%)", bank, anomaly.failure_rate),
        action,
        confidence,
        risk,
        reasoning,
        entity: bank.clone(),
        entity_kind: EntityKind::Bank,
        severity: anomaly.severity,
        persistence: persistence.clone(),
        evidence: anomaly_evidence(anomaly),
        outcome: DecisionOutcome::Pending,
        reward: None,
        updated_at: None,
    }
}

fn method_decision(
    anomaly: &Anomaly,
    persistence: &PersistenceSnapshot,
    now: DateTime<Utc>,
) -> Decision {
    let method = &anomaly.entity;
    let (action, confidence, risk) =
        if anomaly.severity == Severity::High || anomaly.failure_rate > 30.0 {
            (
                format!("CRITICAL: Disable {method} temporarily and investigate"),
                95,
                RiskLevel::High,
            )
        } else if anomaly.severity == Severity::Medium || anomaly.failure_rate > 15.0 {
            (
                format!("Add retry logic and circuit breaker for {method}"),
                85,
                RiskLevel::Medium,
            )
        } else {
            (
                format!("Monitor {method} performance - increase timeout thresholds"),
                75,
                RiskLevel::Low,
            )
        };

    let mut reasoning = format!(
        "{} showing elevated failure rate of {}% across {} transactions. {} transactions failed.",
        method, anomaly.failure_rate, anomaly.sample_size, anomaly.failure_count
    );
    reasoning.push_str(&recurrence_clause(persistence));
    reasoning.push_str(&format!(" Severity: {}.", anomaly.severity));

    Decision {
        id: decision_id(now, method),
        timestamp: now,
        issue: format!(
            "Detected {} payment failures ({}%)",
            method, anomaly.failure_rate
        ),
        action,
        confidence,
        risk,
        reasoning,
        entity: method.clone(),
        entity_kind: EntityKind::Method,
        severity: anomaly.severity,
        persistence: persistence.clone(),
        evidence: anomaly_evidence(anomaly),
        outcome: DecisionOutcome::Pending,
        reward: None,
        updated_at: None,
    }
}

fn pattern_decision(
    pattern: &ErrorPattern,
    persistence: &PersistenceSnapshot,
    now: DateTime<Utc>,
) -> Decision {
    let code = &pattern.error_code;
    let (action, confidence) = match code.as_str() {
        "BANK_TIMEOUT" => (
            "Increase timeout threshold and add circuit breaker".to_string(),
            85,
        ),
        "INSUFFICIENT_FUNDS" => (
            "Enhanced pre-validation before payment attempt".to_string(),
            80,
        ),
        _ => (format!("Investigate root cause of {code}"), 70),
    };

    let mut reasoning = format!(
        "Error {} occurred {} times, suggesting systemic issue",
        code, pattern.occurrences
    );
    reasoning.push_str(&recurrence_clause(persistence));

    Decision {
        id: decision_id(now, code),
        timestamp: now,
        issue: format!("Repeated {code} errors detected"),
        action,
        confidence,
        risk: RiskLevel::Medium,
        reasoning,
        entity: code.clone(),
        entity_kind: EntityKind::Error,
        severity: pattern.severity(),
        persistence: persistence.clone(),
        evidence: Evidence {
            occurrences: Some(pattern.occurrences),
            failure_count: Some(pattern.total_failures),
            ..Default::default()
        },
        outcome: DecisionOutcome::Pending,
        reward: None,
        updated_at: None,
    }
}

fn anomaly_evidence(anomaly: &Anomaly) -> Evidence {
    Evidence {
        failure_rate: Some(anomaly.failure_rate),
        baseline: Some(anomaly.threshold),
        sample_size: Some(anomaly.sample_size),
        failure_count: Some(anomaly.failure_count),
        occurrences: None,
    }
}

fn recurrence_clause(persistence: &PersistenceSnapshot) -> String {
    match persistence.status {
        IssueStatus::Ongoing => format!(
            " Pattern persisting across {} cycles ({} minutes).",
            persistence.occurrence_count, persistence.duration_minutes
        ),
        IssueStatus::Recurring => format!(
            " Recurring issue - {} occurrences in {} minutes.",
            persistence.occurrence_count, persistence.duration_minutes
        ),
        IssueStatus::New => " Newly identified pattern.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::FAILURE_RATE_THRESHOLD;

    fn anomaly(entity: &str, rate: f64, severity: Severity) -> Anomaly {
        Anomaly {
            entity: entity.to_string(),
            severity,
            failure_rate: rate,
            threshold: FAILURE_RATE_THRESHOLD,
            sample_size: 50,
            failure_count: 20,
        }
    }

    fn snapshot(status: IssueStatus, count: u64, minutes: i64) -> PersistenceSnapshot {
        PersistenceSnapshot {
            status,
            first_detected: Utc::now(),
            occurrence_count: count,
            duration_minutes: minutes,
        }
    }

    #[test]
    fn high_bank_anomaly_reroutes_traffic() {
        let finding = Finding::BankAnomaly(anomaly("HDFC", 40.0, Severity::High));
        let decision = synthesize(&finding, &snapshot(IssueStatus::New, 1, 0), Utc::now());

        assert!(decision.action.contains("route HDFC traffic to backup banks"));
        assert_eq!(decision.confidence, 95);
        assert_eq!(decision.risk, RiskLevel::High);
        assert_eq!(decision.entity_kind, EntityKind::Bank);
        assert_eq!(decision.outcome, DecisionOutcome::Pending);
        assert!(decision.reasoning.contains("newly detected"));
        assert!(decision.reasoning.ends_with("Severity: HIGH."));
    }

    #[test]
    fn medium_bank_anomaly_reduces_allocation() {
        let finding = Finding::BankAnomaly(anomaly("AXIS", 18.0, Severity::Medium));
        let decision = synthesize(&finding, &snapshot(IssueStatus::New, 1, 0), Utc::now());

        assert!(decision.action.contains("Reduce AXIS traffic allocation"));
        assert_eq!(decision.confidence, 85);
        assert_eq!(decision.risk, RiskLevel::Medium);
    }

    #[test]
    fn low_method_anomaly_monitors() {
        let finding = Finding::MethodAnomaly(anomaly("upi", 7.0, Severity::Low));
        let decision = synthesize(&finding, &snapshot(IssueStatus::New, 1, 0), Utc::now());

        assert!(decision.action.starts_with("Monitor upi performance"));
        assert_eq!(decision.confidence, 75);
        assert_eq!(decision.risk, RiskLevel::Low);
        assert_eq!(decision.entity_kind, EntityKind::Method);
    }

    #[test]
    fn ongoing_persistence_shapes_the_narrative() {
        let finding = Finding::BankAnomaly(anomaly("HDFC", 40.0, Severity::High));
        let decision = synthesize(&finding, &snapshot(IssueStatus::Ongoing, 4, 120), Utc::now());

        assert!(decision
            .reasoning
            .contains("persisted across 4 observation windows (120 minutes)"));
    }

    #[test]
    fn recurring_persistence_shapes_the_narrative() {
        let finding = Finding::MethodAnomaly(anomaly("upi", 18.0, Severity::Medium));
        let decision = synthesize(&finding, &snapshot(IssueStatus::Recurring, 2, 35), Utc::now());

        assert!(decision.reasoning.contains("Recurring issue - 2 occurrences in 35 minutes"));
    }

    #[test]
    fn known_error_codes_get_specific_actions() {
        let timeout = Finding::ErrorPattern(ErrorPattern {
            error_code: "BANK_TIMEOUT".to_string(),
            occurrences: 4,
            total_failures: 9,
        });
        let decision = synthesize(&timeout, &snapshot(IssueStatus::New, 1, 0), Utc::now());
        assert!(decision.action.contains("circuit breaker"));
        assert_eq!(decision.confidence, 85);

        let funds = Finding::ErrorPattern(ErrorPattern {
            error_code: "INSUFFICIENT_FUNDS".to_string(),
            occurrences: 3,
            total_failures: 9,
        });
        let decision = synthesize(&funds, &snapshot(IssueStatus::New, 1, 0), Utc::now());
        assert!(decision.action.contains("pre-validation"));
        assert_eq!(decision.confidence, 80);

        let other = Finding::ErrorPattern(ErrorPattern {
            error_code: "CARD_DECLINED".to_string(),
            occurrences: 3,
            total_failures: 9,
        });
        let decision = synthesize(&other, &snapshot(IssueStatus::New, 1, 0), Utc::now());
        assert!(decision.action.contains("Investigate root cause of CARD_DECLINED"));
        assert_eq!(decision.confidence, 70);
        assert_eq!(decision.risk, RiskLevel::Medium);
        assert_eq!(decision.severity, Severity::Medium);
    }

    #[test]
    fn decision_id_is_deterministic_from_time_and_entity() {
        let now: DateTime<Utc> = "2026-08-01T00:00:00Z".parse().unwrap();
        let finding = Finding::BankAnomaly(anomaly("HDFC", 40.0, Severity::High));

        let a = synthesize(&finding, &snapshot(IssueStatus::New, 1, 0), now);
        let b = synthesize(&finding, &snapshot(IssueStatus::New, 1, 0), now);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, format!("DEC_{}_HDFC", now.timestamp()));
    }

    #[test]
    fn evidence_is_carried_structurally() {
        let finding = Finding::BankAnomaly(anomaly("HDFC", 40.0, Severity::High));
        let decision = synthesize(&finding, &snapshot(IssueStatus::New, 1, 0), Utc::now());

        assert_eq!(decision.evidence.failure_rate, Some(40.0));
        assert_eq!(decision.evidence.baseline, Some(FAILURE_RATE_THRESHOLD));
        assert_eq!(decision.evidence.sample_size, Some(50));
        assert_eq!(decision.evidence.failure_count, Some(20));
        assert_eq!(decision.evidence.occurrences, None);
    }
}
