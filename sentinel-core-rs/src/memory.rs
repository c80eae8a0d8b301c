// sentinel-core-rs/src/memory.rs
// Decision log and issue history, backed by the persistence boundary.
//
// Single-writer by design: the cycle runs sequentially and callers that
// expose concurrent reads are expected to snapshot state themselves.
// Save failures are logged and swallowed; in-memory state is
// authoritative until the next successful save.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::decide::{Decision, DecisionOutcome};
use crate::severity::Severity;
use crate::store::{MemoryDocument, StateStore};
use crate::tracker::{self, IssueRecord, PersistenceSnapshot};

/// Maximum retained decisions; the oldest are evicted first.
pub const DECISION_LOG_CAPACITY: usize = 100;

pub struct AgentMemory {
    decisions: VecDeque<Decision>,
    issues: HashMap<String, IssueRecord>,
    store: Arc<dyn StateStore + Send + Sync>,
}

/// Aggregate view of the memory state for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub total_decisions: usize,
    pub pending_decisions: usize,
    pub success_rate: f64,
    pub active_issues: usize,
    pub tracked_issues: usize,
}

impl AgentMemory {
    /// Load prior state through the store; a load failure starts from
    /// empty state rather than failing construction.
    pub async fn load(store: Arc<dyn StateStore + Send + Sync>) -> Self {
        let doc = match store.load().await {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load agent memory; starting from empty state");
                MemoryDocument::default()
            }
        };

        Self {
            decisions: doc.decisions.into(),
            issues: doc.issue_history,
            store,
        }
    }

    /// Append a decision, evicting from the front once the log exceeds
    /// capacity.
    pub async fn record_decision(&mut self, decision: Decision) {
        self.decisions.push_back(decision);
        while self.decisions.len() > DECISION_LOG_CAPACITY {
            self.decisions.pop_front();
        }
        self.save().await;
    }

    /// Record the outcome reported for a decision. First match wins;
    /// unknown ids are a no-op.
    pub async fn update_outcome(&mut self, decision_id: &str, outcome: DecisionOutcome, reward: f64) {
        if let Some(decision) = self.decisions.iter_mut().find(|d| d.id == decision_id) {
            decision.outcome = outcome;
            decision.reward = Some(reward);
            decision.updated_at = Some(Utc::now());
            self.save().await;
        }
    }

    /// Fraction of completed decisions with a positive reward, as a
    /// percentage. 0.0 when nothing has completed yet.
    pub fn get_success_rate(&self) -> f64 {
        let completed: Vec<&Decision> = self
            .decisions
            .iter()
            .filter(|d| d.outcome != DecisionOutcome::Pending)
            .collect();
        if completed.is_empty() {
            return 0.0;
        }

        let successful = completed
            .iter()
            .filter(|d| d.reward.unwrap_or(0.0) > 0.0)
            .count();
        successful as f64 / completed.len() as f64 * 100.0
    }

    /// Most recent decisions, oldest first.
    pub fn recent_decisions(&self, limit: usize) -> Vec<&Decision> {
        let skip = self.decisions.len().saturating_sub(limit);
        self.decisions.iter().skip(skip).collect()
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter()
    }

    pub fn issue(&self, key: &str) -> Option<&IssueRecord> {
        self.issues.get(key)
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            total_decisions: self.decisions.len(),
            pending_decisions: self
                .decisions
                .iter()
                .filter(|d| d.outcome == DecisionOutcome::Pending)
                .count(),
            success_rate: self.get_success_rate(),
            active_issues: self.issues.values().filter(|i| !i.resolved).count(),
            tracked_issues: self.issues.len(),
        }
    }

    /// Record one observation of an issue and return its persistence
    /// snapshot for decision synthesis.
    pub async fn track_issue(&mut self, key: &str, severity: Severity) -> PersistenceSnapshot {
        let snapshot = tracker::track(&mut self.issues, key, severity, Utc::now());
        self.save().await;
        snapshot
    }

    /// Mark an issue resolved out of band.
    pub async fn mark_resolved(&mut self, key: &str) {
        if tracker::mark_resolved(&mut self.issues, key, Utc::now()) {
            self.save().await;
        }
    }

    /// Sweep resolved issues older than `max_age` since resolution.
    pub async fn cleanup_old_issues(&mut self, max_age: Duration) {
        let removed = tracker::cleanup(&mut self.issues, max_age, Utc::now());
        if removed > 0 {
            tracing::debug!(removed, "pruned stale resolved issues");
            self.save().await;
        }
    }

    async fn save(&self) {
        let doc = MemoryDocument {
            decisions: self.decisions.iter().cloned().collect(),
            issue_history: self.issues.clone(),
        };

        if let Err(err) = self.store.save(&doc).await {
            tracing::warn!(error = %err, "failed to save agent memory; keeping in-memory state");
        }
    }
}
