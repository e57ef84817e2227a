//! StateStore - Per-Chat Notification Preferences
//!
//! ## Responsibilities
//!
//! - Track enabled/silent flags per chat
//! - Lazy default creation on first sight of a chat
//! - Persist every mutation to a JSON snapshot on disk
//!
//! ## Design Principles
//!
//! - Single lock over the whole map (mutation volume is low)
//! - Load never fails: absent or corrupt snapshot degrades to empty
//! - Atomic replace on save (temp file + rename) so a concurrent load
//!   never observes a half-written snapshot

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::Result;

/// Notification preferences for one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPrefs {
    pub enabled: bool,
    pub silent: bool,
}

impl Default for ChatPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            silent: false,
        }
    }
}

/// On-disk snapshot shape
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateSnapshot {
    chat_states: HashMap<i64, ChatPrefs>,
}

/// StateStore instance
pub struct StateStore {
    path: PathBuf,
    chats: RwLock<HashMap<i64, ChatPrefs>>,
}

impl StateStore {
    /// Load persisted state, degrading to an empty store on any failure
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let chats = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<StateSnapshot>(&bytes) {
                Ok(snapshot) => snapshot.chat_states,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "State file unreadable, starting with empty state"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "State file unreadable, starting with empty state"
                );
                HashMap::new()
            }
        };

        Self {
            path,
            chats: RwLock::new(chats),
        }
    }

    /// Get preferences for a chat, creating the default record on first sight
    ///
    /// Creation persists best-effort so a crash right after first contact
    /// does not forget the chat.
    pub async fn get(&self, chat_id: i64) -> ChatPrefs {
        {
            let chats = self.chats.read().await;
            if let Some(prefs) = chats.get(&chat_id) {
                return *prefs;
            }
        }

        let prefs = {
            let mut chats = self.chats.write().await;
            *chats.entry(chat_id).or_default()
        };

        if let Err(e) = self.save().await {
            tracing::warn!(chat_id = chat_id, error = %e, "Failed to persist new chat record");
        }
        prefs
    }

    /// Mutate a chat's preferences under the lock, then persist
    pub async fn update<F>(&self, chat_id: i64, f: F) -> Result<ChatPrefs>
    where
        F: FnOnce(&mut ChatPrefs),
    {
        let prefs = {
            let mut chats = self.chats.write().await;
            let entry = chats.entry(chat_id).or_default();
            f(entry);
            *entry
        };

        self.save().await?;
        Ok(prefs)
    }

    /// Persist the full map atomically (write temp file, rename into place)
    pub async fn save(&self) -> Result<()> {
        let snapshot = {
            let chats = self.chats.read().await;
            StateSnapshot {
                chat_states: chats.clone(),
            }
        };

        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            chats = snapshot.chat_states.len(),
            "State saved"
        );
        Ok(())
    }

    /// All chat ids the store has seen
    pub async fn known_chats(&self) -> Vec<i64> {
        self.chats.read().await.keys().copied().collect()
    }

    /// Number of tracked chats
    pub async fn count(&self) -> usize {
        self.chats.read().await.len()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::load(dir.path().join("bot_state.json"))
    }

    #[tokio::test]
    async fn test_first_sight_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let prefs = store.get(42).await;
        assert!(prefs.enabled);
        assert!(!prefs.silent);
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = store.get(42).await;
        let second = store.get(42).await;
        assert_eq!(first, second);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");

        let store = StateStore::load(&path);
        store.update(7, |p| p.enabled = false).await.unwrap();
        store.update(7, |p| p.silent = true).await.unwrap();

        // Simulated restart
        let reloaded = StateStore::load(&path);
        let prefs = reloaded.get(7).await;
        assert!(!prefs.enabled);
        assert!(prefs.silent);
    }

    #[tokio::test]
    async fn test_last_command_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");

        let store = StateStore::load(&path);
        store.update(1, |p| p.enabled = false).await.unwrap();
        store.update(1, |p| p.enabled = true).await.unwrap();
        store.update(1, |p| p.enabled = false).await.unwrap();

        assert!(!store.get(1).await.enabled);
        let reloaded = StateStore::load(&path);
        assert!(!reloaded.get(1).await.enabled);
    }

    #[tokio::test]
    async fn test_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_state.json");
        std::fs::write(&path, b"{not json at all").unwrap();

        let store = StateStore::load(&path);
        assert_eq!(store.count().await, 0);
        assert!(store.get(5).await.enabled);
    }

    #[tokio::test]
    async fn test_absent_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_known_chats() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.get(1).await;
        store.get(2).await;
        let mut chats = store.known_chats().await;
        chats.sort();
        assert_eq!(chats, vec![1, 2]);
    }
}
