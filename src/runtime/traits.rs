//! Trait abstractions for runtime I/O
//!
//! These traits let the handlers run against mock transports and storage.

use super::ChatTarget;
use crate::db::{Activity, Database, DbError, Event, EventUpdate, VoteRecord};
use crate::ledger::{ActorIdentity, VoteEffect};
use crate::render::OutgoingMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Message {0} cannot be edited")]
    NotEditable(i64),
}

/// Short text shown when acknowledging a button press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    /// Modal alert instead of a toast
    pub alert: bool,
}

impl Notice {
    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: true,
        }
    }

    pub fn toast(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: false,
        }
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message, returning the platform message id
    async fn send_message(
        &self,
        target: ChatTarget,
        message: &OutgoingMessage,
    ) -> Result<i64, TransportError>;

    /// Replace the text and keyboard of an existing message
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError>;

    /// Acknowledge a button press; `None` clears the spinner silently
    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<Notice>,
    ) -> Result<(), TransportError>;
}

/// Storage for polls
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> Result<i64, String>;

    async fn update_event(&self, id: i64, update: &EventUpdate) -> Result<(), String>;

    async fn find_event(&self, id: i64) -> Result<Option<Event>, String>;

    /// Poll currently posted as `message_id` in `chat_id`
    async fn find_event_by_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<Event>, String>;

    async fn events_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, String>;
}

/// Storage for workplan activities
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert_activity(&self, activity: &Activity) -> Result<i64, String>;

    async fn update_activity(&self, activity: &Activity) -> Result<(), String>;

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>, String>;

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, String>;

    /// Returns the number of rows removed
    async fn delete_activity(&self, id: i64) -> Result<usize, String>;
}

/// Per-actor vote rows
#[async_trait]
pub trait VoteLedger: Send + Sync {
    async fn toggle(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
    ) -> Result<VoteEffect, String>;

    async fn set(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
        active: bool,
    ) -> Result<VoteEffect, String>;

    async fn active_votes(&self, event_id: i64) -> Result<Vec<VoteRecord>, String>;

    async fn votes_by_actor(&self, identity: &ActorIdentity) -> Result<Vec<VoteRecord>, String>;
}

/// Combined storage trait for convenience
pub trait Storage: EventStore + ActivityStore + VoteLedger {}
impl<T: EventStore + ActivityStore + VoteLedger> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_message(
        &self,
        target: ChatTarget,
        message: &OutgoingMessage,
    ) -> Result<i64, TransportError> {
        (**self).send_message(target, message).await
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        (**self).edit_message(chat_id, message_id, message).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<Notice>,
    ) -> Result<(), TransportError> {
        (**self).answer_callback(callback_id, notice).await
    }
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn insert_event(&self, event: &Event) -> Result<i64, String> {
        (**self).insert_event(event).await
    }

    async fn update_event(&self, id: i64, update: &EventUpdate) -> Result<(), String> {
        (**self).update_event(id, update).await
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>, String> {
        (**self).find_event(id).await
    }

    async fn find_event_by_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<Event>, String> {
        (**self).find_event_by_message(chat_id, message_id).await
    }

    async fn events_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, String> {
        (**self).events_by_ids(ids).await
    }
}

#[async_trait]
impl<T: ActivityStore + ?Sized> ActivityStore for Arc<T> {
    async fn insert_activity(&self, activity: &Activity) -> Result<i64, String> {
        (**self).insert_activity(activity).await
    }

    async fn update_activity(&self, activity: &Activity) -> Result<(), String> {
        (**self).update_activity(activity).await
    }

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>, String> {
        (**self).find_activity(id).await
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, String> {
        (**self).activities_between(start, end).await
    }

    async fn delete_activity(&self, id: i64) -> Result<usize, String> {
        (**self).delete_activity(id).await
    }
}

#[async_trait]
impl<T: VoteLedger + ?Sized> VoteLedger for Arc<T> {
    async fn toggle(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
    ) -> Result<VoteEffect, String> {
        (**self).toggle(event_id, option, identity).await
    }

    async fn set(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
        active: bool,
    ) -> Result<VoteEffect, String> {
        (**self).set(event_id, option, identity, active).await
    }

    async fn active_votes(&self, event_id: i64) -> Result<Vec<VoteRecord>, String> {
        (**self).active_votes(event_id).await
    }

    async fn votes_by_actor(&self, identity: &ActorIdentity) -> Result<Vec<VoteRecord>, String> {
        (**self).votes_by_actor(identity).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

/// Not-found errors become `None`, everything else a message
fn optional<T>(result: Result<T, DbError>) -> Result<Option<T>, String> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DbError::EventNotFound(_) | DbError::ActivityNotFound(_)) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

#[async_trait]
impl EventStore for DatabaseStorage {
    async fn insert_event(&self, event: &Event) -> Result<i64, String> {
        self.db.insert_event(event).map_err(|e| e.to_string())
    }

    async fn update_event(&self, id: i64, update: &EventUpdate) -> Result<(), String> {
        self.db.update_event(id, update).map_err(|e| e.to_string())
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>, String> {
        optional(self.db.get_event(id))
    }

    async fn find_event_by_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<Event>, String> {
        optional(self.db.get_event_by_message(chat_id, message_id))
    }

    async fn events_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, String> {
        self.db.get_events_by_ids(ids).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ActivityStore for DatabaseStorage {
    async fn insert_activity(&self, activity: &Activity) -> Result<i64, String> {
        self.db.insert_activity(activity).map_err(|e| e.to_string())
    }

    async fn update_activity(&self, activity: &Activity) -> Result<(), String> {
        self.db.update_activity(activity).map_err(|e| e.to_string())
    }

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>, String> {
        self.db.find_activity(id).map_err(|e| e.to_string())
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, String> {
        self.db
            .activities_between(start, end)
            .map_err(|e| e.to_string())
    }

    async fn delete_activity(&self, id: i64) -> Result<usize, String> {
        self.db.delete_activity(id).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl VoteLedger for DatabaseStorage {
    async fn toggle(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
    ) -> Result<VoteEffect, String> {
        self.db
            .toggle_vote(event_id, option, identity)
            .map_err(|e| e.to_string())
    }

    async fn set(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
        active: bool,
    ) -> Result<VoteEffect, String> {
        self.db
            .set_vote(event_id, option, identity, active)
            .map_err(|e| e.to_string())
    }

    async fn active_votes(&self, event_id: i64) -> Result<Vec<VoteRecord>, String> {
        self.db.active_votes(event_id).map_err(|e| e.to_string())
    }

    async fn votes_by_actor(&self, identity: &ActorIdentity) -> Result<Vec<VoteRecord>, String> {
        self.db
            .votes_by_actor(identity)
            .map_err(|e| e.to_string())
    }
}
