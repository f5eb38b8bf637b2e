//! # Session Store
//!
//! Transient per-user conversation state. Entries are removed when a
//! conversation finishes and expire after a period of inactivity, so nothing
//! here outlives the conversation it belongs to.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::dialogue::DialogueState;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionEntry {
    state: DialogueState,
    touched: Instant,
}

/// Conversation states keyed by user id
#[derive(Debug)]
pub struct SessionStore {
    entries: Mutex<HashMap<u64, SessionEntry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Current state for the user; [`DialogueState::Idle`] when absent or expired
    pub async fn get(&self, user_id: u64) -> DialogueState {
        let mut entries = self.entries.lock().await;
        self.purge_expired(&mut entries);
        entries
            .get(&user_id)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Store the state; storing [`DialogueState::Idle`] removes the entry
    pub async fn set(&self, user_id: u64, state: DialogueState) {
        let mut entries = self.entries.lock().await;
        if state == DialogueState::Idle {
            entries.remove(&user_id);
        } else {
            entries.insert(
                user_id,
                SessionEntry {
                    state,
                    touched: Instant::now(),
                },
            );
        }
    }

    pub async fn clear(&self, user_id: u64) {
        self.entries.lock().await.remove(&user_id);
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        self.purge_expired(&mut entries);
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn purge_expired(&self, entries: &mut HashMap<u64, SessionEntry>) {
        let ttl = self.ttl;
        entries.retain(|user_id, entry| {
            let alive = entry.touched.elapsed() < ttl;
            if !alive {
                debug!(user_id, "Session expired");
            }
            alive
        });
    }
}
