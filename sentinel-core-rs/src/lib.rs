// sentinel-core-rs/src/lib.rs
// Library interface for the Payment Sentinel reasoning core.
//
// Pipeline per observation cycle:
//   TrafficSnapshot -> detectors -> issue tracking -> decision synthesis
//   -> bounded decision log (persisted through the StateStore boundary).
//
// Design notes:
// - This crate is a pure library crate; the loop driver and event feed
//   live in the sentinel-agent-rs service crate.
// - The core only recommends: no decision is ever executed here.
// - State is carried in an explicit engine object passed through the
//   pipeline; there is no module-level mutable state and no internal
//   locking (single-writer access is assumed).

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::instrument;

pub mod decide;
pub mod detect;
pub mod memory;
pub mod model;
pub mod severity;
pub mod store;
pub mod tracker;


use crate::decide::{synthesize, Decision};
use crate::detect::detect_all;
use crate::memory::AgentMemory;
use crate::model::TrafficSnapshot;
use crate::store::{FileStateStore, StateStore, StoreError};
use crate::tracker::DEFAULT_RESOLVED_RETENTION_HOURS;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Top-level error type for this crate.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for the reasoning core.
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Hours a resolved issue is retained before the cleanup sweep
    /// drops it.
    pub resolved_retention_hours: i64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            resolved_retention_hours: DEFAULT_RESOLVED_RETENTION_HOURS,
        }
    }
}

impl SentinelConfig {
    /// Construct configuration from environment variables. Never panics;
    /// unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let resolved_retention_hours = std::env::var("SENTINEL_RESOLVED_RETENTION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RESOLVED_RETENTION_HOURS);

        Self {
            resolved_retention_hours,
        }
    }
}

/// The reasoning engine: detectors plus the memory store, run as one
/// sequential pass per cycle.
pub struct SentinelEngine {
    cfg: SentinelConfig,
    memory: AgentMemory,
}

impl SentinelEngine {
    /// Construct an engine with the default file-backed store, loading
    /// any previously persisted state.
    pub async fn new(cfg: SentinelConfig) -> Result<Self> {
        let store: Arc<dyn StateStore + Send + Sync> = Arc::new(FileStateStore::new_default()?);
        Ok(Self::with_store(cfg, store).await)
    }

    /// Construct an engine over an explicit store (used by embedders and
    /// tests).
    pub async fn with_store(cfg: SentinelConfig, store: Arc<dyn StateStore + Send + Sync>) -> Self {
        Self {
            cfg,
            memory: AgentMemory::load(store).await,
        }
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut AgentMemory {
        &mut self.memory
    }

    /// Run one observation cycle over an aggregated snapshot: detect
    /// findings, fold each through issue tracking and decision
    /// synthesis, record the decisions, then sweep stale resolved
    /// issues. Returns the decisions produced this cycle.
    #[instrument(name = "sentinel_cycle", skip(self, snapshot), fields(total_events = snapshot.total))]
    pub async fn run_cycle(&mut self, snapshot: &TrafficSnapshot) -> Result<Vec<Decision>> {
        let findings = detect_all(snapshot);
        metrics::increment_counter!("sentinel_cycles_total");
        tracing::info!(findings = findings.len(), "detection pass complete");

        let mut decisions = Vec::with_capacity(findings.len());
        for finding in &findings {
            let persistence = self
                .memory
                .track_issue(&finding.issue_key(), finding.severity())
                .await;
            let decision = synthesize(finding, &persistence, Utc::now());

            tracing::info!(
                decision.id = %decision.id,
                decision.entity = %decision.entity,
                decision.severity = %decision.severity,
                decision.confidence = decision.confidence,
                "decision synthesized"
            );
            metrics::increment_counter!(
                "sentinel_decisions_total",
                "entity_kind" => finding.entity_kind().to_string()
            );

            self.memory.record_decision(decision.clone()).await;
            decisions.push(decision);
        }

        self.memory
            .cleanup_old_issues(Duration::hours(self.cfg.resolved_retention_hours))
            .await;

        Ok(decisions)
    }
}
