//! EventPoller - Deduplicated Event Fetching
//!
//! ## Responsibilities
//!
//! - Fetch events from the NVR once per poll cycle
//! - Filter out already-seen event ids (bounded window)
//! - Log-and-continue on fetch failure; the poll loop is the retry mechanism
//!
//! Seen ids are retained in a capacity-evicted window rather than relying on
//! the upstream API never repeating events. Marking happens only after the
//! delivery batch was dispatched, so a crash mid-batch re-surfaces the events
//! on the next cycle.

use std::collections::{HashSet, VecDeque};
use tokio::sync::RwLock;

use crate::event_source::{FrigateClient, FrigateEvent};

/// Default seen-id window capacity
pub const DEFAULT_SEEN_CAPACITY: usize = 4096;

/// Capacity-evicted set of recently seen event ids
struct SeenWindow {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SeenWindow {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: String) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
    }
}

/// EventPoller instance
pub struct EventPoller {
    seen: RwLock<SeenWindow>,
    consecutive_failures: RwLock<u32>,
}

impl EventPoller {
    /// Create new EventPoller with the default window capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SEEN_CAPACITY)
    }

    /// Create new EventPoller with custom window capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: RwLock::new(SeenWindow::new(capacity)),
            consecutive_failures: RwLock::new(0),
        }
    }

    /// Fetch the latest events and return the not-yet-seen ones in source order
    ///
    /// A fetch failure yields an empty batch; the next scheduled tick retries.
    /// Repeated failures escalate from warn to error so a dead upstream is
    /// distinguishable from a quiet one.
    pub async fn fetch_new(&self, client: &FrigateClient) -> Vec<FrigateEvent> {
        match client.fetch_events().await {
            Ok(events) => {
                let mut failures = self.consecutive_failures.write().await;
                if *failures > 0 {
                    tracing::info!(after_failures = *failures, "Event fetch recovered");
                }
                *failures = 0;
                drop(failures);

                self.filter_new(events).await
            }
            Err(e) => {
                let mut failures = self.consecutive_failures.write().await;
                *failures += 1;
                if *failures > 1 {
                    tracing::error!(
                        error = %e,
                        consecutive_failures = *failures,
                        "Event fetch failing repeatedly"
                    );
                } else {
                    tracing::warn!(error = %e, "Event fetch failed, will retry next cycle");
                }
                Vec::new()
            }
        }
    }

    /// Filter a fetched batch down to unseen events, preserving source order
    ///
    /// Duplicate ids within one batch are also collapsed to the first
    /// occurrence.
    pub async fn filter_new(&self, events: Vec<FrigateEvent>) -> Vec<FrigateEvent> {
        let seen = self.seen.read().await;
        let mut batch_ids: HashSet<&str> = HashSet::new();
        let mut fresh = Vec::new();

        for event in &events {
            if seen.contains(&event.id) || !batch_ids.insert(event.id.as_str()) {
                continue;
            }
            fresh.push(event.clone());
        }

        if !fresh.is_empty() {
            tracing::debug!(
                fetched = events.len(),
                new = fresh.len(),
                "Poll cycle produced new events"
            );
        }
        fresh
    }

    /// Mark event ids as delivered; call only after dispatching the batch
    pub async fn mark_seen<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = self.seen.write().await;
        for id in ids {
            seen.insert(id);
        }
    }
}

impl Default for EventPoller {
    fn default() -> Self {
        Self::new()
    }
}
