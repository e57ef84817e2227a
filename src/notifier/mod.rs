//! Notifier - Event Delivery Fan-Out
//!
//! ## Responsibilities
//!
//! - Deliver each new event to every enabled chat
//! - Honor per-chat silent delivery
//! - Isolate per-chat send failures from the rest of the batch
//! - Streaming task for in-progress events (separate from the poll loop)

use std::sync::Arc;
use std::time::Duration;

use crate::chat_state::StateStore;
use crate::error::Result;
use crate::event_poller::EventPoller;
use crate::event_source::{FrigateClient, FrigateEvent};
use crate::telegram::TelegramClient;

/// Outbound message port, kept narrow so tests can record sends
pub trait MessageSender: Send + Sync {
    fn send(
        &self,
        chat_id: i64,
        text: &str,
        silent: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl MessageSender for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str, silent: bool) -> Result<()> {
        self.send_message(chat_id, text, silent, None).await
    }
}

/// Notifier instance
pub struct Notifier {
    store: Arc<StateStore>,
}

impl Notifier {
    /// Create new Notifier
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Deliver an event batch to the given chats
    ///
    /// A failed send is logged and does not block the remaining chats or
    /// events. Returns the number of successful sends.
    pub async fn deliver<S: MessageSender>(
        &self,
        sender: &S,
        events: &[FrigateEvent],
        chat_ids: &[i64],
    ) -> usize {
        let mut sent = 0;

        for &chat_id in chat_ids {
            let prefs = self.store.get(chat_id).await;
            if !prefs.enabled {
                tracing::debug!(chat_id = chat_id, "Notifications disabled, skipping chat");
                continue;
            }

            for event in events {
                match sender.send(chat_id, &event.to_message(), prefs.silent).await {
                    Ok(()) => {
                        sent += 1;
                        tracing::info!(
                            chat_id = chat_id,
                            event_id = %event.id,
                            camera = %event.camera,
                            silent = prefs.silent,
                            "Notification sent"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            chat_id = chat_id,
                            event_id = %event.id,
                            error = %e,
                            "Notification send failed"
                        );
                    }
                }
            }
        }

        sent
    }

    /// Streaming notification loop for in-progress events
    ///
    /// Runs forever on its own interval and seen-id window, sending compact
    /// text lines as soon as an event starts rather than waiting for the poll
    /// cycle.
    pub async fn run_ongoing_stream<S: MessageSender>(
        &self,
        frigate: &FrigateClient,
        sender: &S,
        interval_secs: u64,
    ) {
        let poller = EventPoller::new();
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        tracing::info!(interval_secs = interval_secs, "Streaming notification task started");

        loop {
            interval.tick().await;

            let events = match frigate.fetch_ongoing_events().await {
                Ok(events) => poller.filter_new(events).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Ongoing-event fetch failed, will retry");
                    continue;
                }
            };

            if events.is_empty() {
                continue;
            }

            let chat_ids = self.store.known_chats().await;
            for &chat_id in &chat_ids {
                let prefs = self.store.get(chat_id).await;
                if !prefs.enabled {
                    continue;
                }
                for event in &events {
                    if let Err(e) = sender
                        .send(chat_id, &event.to_short_message(), prefs.silent)
                        .await
                    {
                        tracing::error!(
                            chat_id = chat_id,
                            event_id = %event.id,
                            error = %e,
                            "Streaming notification failed"
                        );
                    }
                }
            }

            poller.mark_seen(events.into_iter().map(|e| e.id)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio::sync::Mutex;

    /// Records sends; optionally fails for one chat id
    pub(crate) struct RecordingSender {
        pub sent: Mutex<Vec<(i64, String, bool)>>,
        pub fail_for: Option<i64>,
    }

    impl RecordingSender {
        pub(crate) fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: None,
            }
        }

        pub(crate) fn failing_for(chat_id: i64) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: Some(chat_id),
            }
        }
    }

    impl MessageSender for RecordingSender {
        async fn send(&self, chat_id: i64, text: &str, silent: bool) -> Result<()> {
            if self.fail_for == Some(chat_id) {
                return Err(Error::Telegram("simulated send failure".to_string()));
            }
            self.sent
                .lock()
                .await
                .push((chat_id, text.to_string(), silent));
            Ok(())
        }
    }

    fn event(id: &str) -> FrigateEvent {
        FrigateEvent {
            id: id.to_string(),
            camera: "cam1".to_string(),
            label: "person".to_string(),
            start_time: 0.0,
            end_time: None,
            zones: Vec::new(),
            top_score: None,
            has_clip: false,
            has_snapshot: false,
        }
    }

    fn fresh_store(dir: &tempfile::TempDir) -> Arc<StateStore> {
        Arc::new(StateStore::load(dir.path().join("state.json")))
    }

    #[tokio::test]
    async fn test_disabled_chat_gets_zero_sends() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);
        store.update(42, |p| p.enabled = false).await.unwrap();

        let notifier = Notifier::new(store);
        let sender = RecordingSender::new();
        let sent = notifier
            .deliver(&sender, &[event("a"), event("b"), event("c")], &[42])
            .await;

        assert_eq!(sent, 0);
        assert!(sender.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_silent_flag_carried_on_every_send() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);
        store.update(7, |p| p.silent = true).await.unwrap();

        let notifier = Notifier::new(store);
        let sender = RecordingSender::new();
        notifier.deliver(&sender, &[event("a"), event("b")], &[7]).await;

        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, _, silent)| *silent));
    }

    #[tokio::test]
    async fn test_loud_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Notifier::new(fresh_store(&dir));
        let sender = RecordingSender::new();
        notifier.deliver(&sender, &[event("a")], &[7]).await;

        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].2);
    }

    #[tokio::test]
    async fn test_one_chat_failure_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Notifier::new(fresh_store(&dir));
        let sender = RecordingSender::failing_for(1);

        let sent = notifier.deliver(&sender, &[event("a")], &[1, 2, 3]).await;
        assert_eq!(sent, 2);

        let recorded = sender.sent.lock().await;
        let chats: Vec<i64> = recorded.iter().map(|(c, _, _)| *c).collect();
        assert_eq!(chats, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_events_delivered_in_fetch_order() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = Notifier::new(fresh_store(&dir));
        let sender = RecordingSender::new();

        let mut first = event("a");
        first.camera = "front".to_string();
        let mut second = event("b");
        second.camera = "back".to_string();

        notifier.deliver(&sender, &[first, second], &[9]).await;

        let sent = sender.sent.lock().await;
        assert!(sent[0].1.contains("front"));
        assert!(sent[1].1.contains("back"));
    }
}
