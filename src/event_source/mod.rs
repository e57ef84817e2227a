//! FrigateClient - NVR Event Source Adapter
//!
//! ## Responsibilities
//!
//! - Fetch detection events from the Frigate HTTP API
//! - Fetch in-progress events for the streaming notification task
//! - Response parsing
//! - Connection management

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Detection event from the NVR
///
/// Only `id` carries semantics for the delivery engine; everything else is
/// formatting input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrigateEvent {
    pub id: String,
    pub camera: String,
    pub label: String,
    pub start_time: f64,

    #[serde(default)]
    pub end_time: Option<f64>,

    #[serde(default)]
    pub zones: Vec<String>,

    #[serde(default)]
    pub top_score: Option<f64>,

    #[serde(default)]
    pub has_clip: bool,

    #[serde(default)]
    pub has_snapshot: bool,
}

impl FrigateEvent {
    /// Render the full notification text for this event
    ///
    /// Pure formatting policy: swap this method out to change message shape.
    pub fn to_message(&self) -> String {
        let mut text = format!(
            "\u{1F6A8} {} detected\nCamera: {}\nStarted: {}",
            self.label,
            self.camera,
            format_ts(self.start_time),
        );

        match self.end_time {
            Some(end) => text.push_str(&format!("\nEnded: {}", format_ts(end))),
            None => text.push_str("\nStatus: in progress"),
        }

        if let Some(score) = self.top_score {
            text.push_str(&format!("\nScore: {:.0}%", score * 100.0));
        }
        if !self.zones.is_empty() {
            text.push_str(&format!("\nZones: {}", self.zones.join(", ")));
        }
        text
    }

    /// Compact one-line text for the streaming notification task
    pub fn to_short_message(&self) -> String {
        format!(
            "{} on {} at {}",
            self.label,
            self.camera,
            format_ts(self.start_time)
        )
    }
}

fn format_ts(unix_secs: f64) -> String {
    DateTime::<Utc>::from_timestamp(unix_secs as i64, 0)
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

/// Frigate NVR client
pub struct FrigateClient {
    client: reqwest::Client,
    base_url: String,
}

impl FrigateClient {
    /// Create new Frigate client
    pub fn new(base_url: String) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create new Frigate client with custom timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Check Frigate reachability
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Fetch the latest detection events
    pub async fn fetch_events(&self) -> Result<Vec<FrigateEvent>> {
        self.fetch(&format!("{}/api/events", self.base_url)).await
    }

    /// Fetch events still in progress (no end time yet)
    pub async fn fetch_ongoing_events(&self) -> Result<Vec<FrigateEvent>> {
        self.fetch(&format!("{}/api/events?in_progress=1", self.base_url))
            .await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<FrigateEvent>> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::EventSource(format!(
                "event fetch failed: {}",
                resp.status()
            )));
        }

        let events: Vec<FrigateEvent> = resp.json().await?;
        Ok(events)
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> FrigateEvent {
        FrigateEvent {
            id: id.to_string(),
            camera: "front_door".to_string(),
            label: "person".to_string(),
            start_time: 1_700_000_000.0,
            end_time: None,
            zones: vec!["porch".to_string()],
            top_score: Some(0.87),
            has_clip: true,
            has_snapshot: true,
        }
    }

    #[test]
    fn test_event_deserializes_with_missing_optionals() {
        let json = r#"{"id":"abc","camera":"yard","label":"dog","start_time":1700000000.5}"#;
        let ev: FrigateEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.id, "abc");
        assert!(ev.end_time.is_none());
        assert!(ev.zones.is_empty());
        assert!(!ev.has_clip);
    }

    #[test]
    fn test_to_message_in_progress() {
        let text = event("abc").to_message();
        assert!(text.contains("person detected"));
        assert!(text.contains("front_door"));
        assert!(text.contains("in progress"));
        assert!(text.contains("87%"));
        assert!(text.contains("porch"));
    }

    #[test]
    fn test_to_message_ended() {
        let mut ev = event("abc");
        ev.end_time = Some(1_700_000_060.0);
        let text = ev.to_message();
        assert!(text.contains("Ended:"));
        assert!(!text.contains("in progress"));
    }

    #[test]
    fn test_short_message() {
        let text = event("abc").to_short_message();
        assert!(text.contains("person on front_door"));
    }
}
