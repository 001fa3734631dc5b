//! Conversation session store
//!
//! One active multi-step conversation per (chat, thread, actor). Starting a
//! new flow overwrites whatever was there.

use crate::state_machine::ConversationState;
use dashmap::DashMap;
use std::fmt;
use tracing::debug;

/// Session key: chat, sub-thread (0 when absent) and actor id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chat_id: i64,
    pub thread_id: i32,
    pub actor_id: i64,
}

impl SessionKey {
    pub fn new(chat_id: i64, thread_id: Option<i32>, actor_id: i64) -> Self {
        Self {
            chat_id,
            thread_id: thread_id.unwrap_or(0),
            actor_id,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.chat_id, self.thread_id, self.actor_id)
    }
}

/// Process-wide session mapping
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite
    fn put(&self, key: SessionKey, state: ConversationState);

    fn get(&self, key: &SessionKey) -> Option<ConversationState>;

    fn remove(&self, key: &SessionKey) -> Option<ConversationState>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store with per-shard locking
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionKey, ConversationState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, key: SessionKey, state: ConversationState) {
        let kind = state.kind;
        if let Some(previous) = self.sessions.insert(key, state) {
            if previous.kind != kind {
                debug!(session = %key, previous = ?previous.kind, ?kind, "Replaced existing session");
            }
        }
    }

    fn get(&self, key: &SessionKey) -> Option<ConversationState> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    fn remove(&self, key: &SessionKey) -> Option<ConversationState> {
        self.sessions.remove(key).map(|(_, state)| state)
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
