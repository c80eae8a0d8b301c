// sentinel-agent-rs/src/feed.rs
// NDJSON payment-event feed for the agent loop.

use std::path::PathBuf;

use sentinel_core::model::PaymentEvent;
use tokio::fs;

/// Reads the most recent events from an NDJSON file (one event per
/// line). The feed is produced by an external collector; unparseable
/// lines are skipped so a single bad record never fails a cycle.
pub struct EventFeed {
    path: PathBuf,
    window: usize,
}

impl EventFeed {
    pub fn new(path: impl Into<PathBuf>, window: usize) -> Self {
        Self {
            path: path.into(),
            window,
        }
    }

    /// Read the last `window` events; a missing feed file is an empty
    /// observation window, not an error.
    pub async fn read_recent(&self) -> std::io::Result<Vec<PaymentEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path).await?;
        let mut events = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PaymentEvent>(line) {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unparseable event line");
                }
            }
        }

        let start = events.len().saturating_sub(self.window);
        Ok(events.split_off(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let feed = EventFeed::new(dir.path().join("events.ndjson"), 100);

        let events = feed.read_recent().await.expect("read should succeed");
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn keeps_only_the_most_recent_window_and_skips_bad_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.ndjson");
        std::fs::write(
            &path,
            concat!(
                "{\"transaction_id\":\"t1\",\"status\":\"success\",\"bank\":\"HDFC\"}\n",
                "not json at all\n",
                "{\"transaction_id\":\"t2\",\"status\":\"failure\",\"bank\":\"HDFC\"}\n",
                "{\"transaction_id\":\"t3\",\"status\":\"success\",\"bank\":\"ICICI\"}\n",
            ),
        )
        .expect("write");

        let feed = EventFeed::new(&path, 2);
        let events = feed.read_recent().await.expect("read should succeed");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].transaction_id.as_deref(), Some("t2"));
        assert_eq!(events[1].transaction_id.as_deref(), Some("t3"));
    }
}
