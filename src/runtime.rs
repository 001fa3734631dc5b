//! Runtime for chat conversations
//!
//! Owns the transport, storage and session store shared by every inbound
//! update, and drives text input through the step engine.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use traits::*;

use crate::ledger::Actor;
use crate::render::OutgoingMessage;
use crate::session::{SessionKey, SessionStore};
use chrono_tz::Tz;
use std::sync::Arc;

/// Type alias for the production app with concrete implementations
pub type ProductionApp = App<crate::telegram::TelegramTransport, DatabaseStorage>;

/// Conversation plus optional sub-thread a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatTarget {
    pub chat_id: i64,
    pub thread_id: Option<i32>,
}

impl ChatTarget {
    pub fn new(chat_id: i64, thread_id: Option<i32>) -> Self {
        Self { chat_id, thread_id }
    }

    pub fn session_key(&self, actor_id: i64) -> SessionKey {
        SessionKey::new(self.chat_id, self.thread_id, actor_id)
    }
}

/// Text message from a user
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat: ChatTarget,
    pub message_id: i64,
    pub actor: Actor,
    pub text: String,
}

/// Button press on one of our inline keyboards
#[derive(Debug, Clone)]
pub struct IncomingCallback {
    pub id: String,
    /// Absent when the originating message is no longer accessible
    pub chat: Option<ChatTarget>,
    pub message_id: Option<i64>,
    pub actor: Actor,
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Username used in `/cmd@bot` suffixes and the send hint
    pub bot_name: String,
    /// Zone that defines "this month"
    pub timezone: Tz,
}

/// Shared handles for processing updates
pub struct App<T, S> {
    pub transport: T,
    pub storage: S,
    pub sessions: Arc<dyn SessionStore>,
    pub settings: Settings,
}

impl<T: Transport, S: Storage> App<T, S> {
    pub fn new(
        transport: T,
        storage: S,
        sessions: Arc<dyn SessionStore>,
        settings: Settings,
    ) -> Self {
        Self {
            transport,
            storage,
            sessions,
            settings,
        }
    }

    /// Send a message; transport failures are logged, never propagated
    pub async fn send(&self, target: ChatTarget, message: OutgoingMessage) -> Option<i64> {
        match self.transport.send_message(target, &message).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(chat_id = target.chat_id, error = %e, "Failed to send message");
                None
            }
        }
    }

    pub async fn reply(&self, target: ChatTarget, text: impl Into<String>) {
        self.send(target, OutgoingMessage::plain(text)).await;
    }

    pub async fn edit(&self, chat_id: i64, message_id: i64, message: OutgoingMessage) {
        if let Err(e) = self
            .transport
            .edit_message(chat_id, message_id, &message)
            .await
        {
            tracing::error!(chat_id, message_id, error = %e, "Failed to edit message");
        }
    }

    pub async fn answer(&self, callback_id: &str, notice: Option<Notice>) {
        if let Err(e) = self.transport.answer_callback(callback_id, notice).await {
            tracing::warn!(callback_id, error = %e, "Failed to answer callback");
        }
    }
}
