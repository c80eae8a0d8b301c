// sentinel-agent-rs/src/main.rs
// Payment Sentinel agent loop: observe -> detect -> decide -> remember.
//
// The loop drives the sentinel_core reasoning pipeline on a fixed
// interval. A failed cycle is logged and isolated at the loop boundary;
// the next tick proceeds with state carried over unchanged.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sentinel_core::model::TrafficSnapshot;
use sentinel_core::{SentinelConfig, SentinelEngine};

mod feed;

use feed::EventFeed;

const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 30;
const DEFAULT_EVENT_WINDOW: usize = 100;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let interval_secs = env_or("SENTINEL_CYCLE_INTERVAL_SECS", DEFAULT_CYCLE_INTERVAL_SECS);
    let window = env_or("SENTINEL_EVENT_WINDOW", DEFAULT_EVENT_WINDOW);
    let events_path = std::env::var("SENTINEL_EVENTS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/sentinel/payment_events.ndjson"));

    let mut engine = SentinelEngine::new(SentinelConfig::from_env()).await?;
    let feed = EventFeed::new(events_path, window);

    info!(interval_secs, window, "payment sentinel starting");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    // Keep ticking on schedule even when a cycle overruns or fails.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = run_once(&mut engine, &feed).await {
            error!(error = %err, "cycle failed; continuing on next tick");
        }
    }
}

async fn run_once(engine: &mut SentinelEngine, feed: &EventFeed) -> Result<()> {
    let events = feed.read_recent().await?;
    let snapshot = TrafficSnapshot::from_events(&events);
    let decisions = engine.run_cycle(&snapshot).await?;

    let stats = engine.memory().stats();
    info!(
        total_events = snapshot.total,
        banks = snapshot.by_bank.len(),
        methods = snapshot.by_method.len(),
        decisions = decisions.len(),
        active_issues = stats.active_issues,
        success_rate = stats.success_rate,
        "cycle complete"
    );

    for decision in &decisions {
        info!(
            id = %decision.id,
            severity = %decision.severity,
            risk = %decision.risk,
            confidence = decision.confidence,
            action = %decision.action,
            "proposed action"
        );
    }

    Ok(())
}
