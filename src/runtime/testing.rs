//! Mock implementations for testing
//!
//! These mocks enable handler tests without a chat platform.

use super::traits::*;
use super::{App, ChatTarget, IncomingCallback, IncomingMessage, Settings};
use crate::db::{Activity, Database, Event, EventUpdate, VoteRecord};
use crate::ledger::{Actor, ActorIdentity, VoteEffect};
use crate::render::OutgoingMessage;
use crate::session::MemorySessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Recording Transport
// ============================================================================

/// Transport that records everything and hands out increasing message ids
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(ChatTarget, OutgoingMessage)>>,
    pub edited: Mutex<Vec<(i64, i64, OutgoingMessage)>>,
    pub answers: Mutex<Vec<(String, Option<Notice>)>>,
    next_id: AtomicI64,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            edited: Mutex::new(Vec::new()),
            answers: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
        }
    }
}

#[allow(dead_code)]
impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.text.clone())
            .collect()
    }

    pub fn last_sent(&self) -> Option<OutgoingMessage> {
        self.sent.lock().unwrap().last().map(|(_, m)| m.clone())
    }

    pub fn last_edit(&self) -> Option<(i64, i64, OutgoingMessage)> {
        self.edited.lock().unwrap().last().cloned()
    }

    pub fn last_answer(&self) -> Option<(String, Option<Notice>)> {
        self.answers.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.edited.lock().unwrap().clear();
        self.answers.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        target: ChatTarget,
        message: &OutgoingMessage,
    ) -> Result<i64, TransportError> {
        self.sent.lock().unwrap().push((target, message.clone()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        message: &OutgoingMessage,
    ) -> Result<(), TransportError> {
        self.edited
            .lock()
            .unwrap()
            .push((chat_id, message_id, message.clone()));
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        notice: Option<Notice>,
    ) -> Result<(), TransportError> {
        self.answers
            .lock()
            .unwrap()
            .push((callback_id.to_string(), notice));
        Ok(())
    }
}

// ============================================================================
// Flaky Storage
// ============================================================================

/// In-memory database storage whose writes can be made to fail
pub struct FlakyStorage {
    inner: DatabaseStorage,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStorage {
    pub fn new() -> Self {
        Self {
            inner: DatabaseStorage::new(Database::open_in_memory().unwrap()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn db(&self) -> &Database {
        self.inner.inner()
    }

    fn check(&self) -> Result<(), String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err("disk I/O error".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventStore for FlakyStorage {
    async fn insert_event(&self, event: &Event) -> Result<i64, String> {
        self.check()?;
        self.inner.insert_event(event).await
    }

    async fn update_event(&self, id: i64, update: &EventUpdate) -> Result<(), String> {
        self.check()?;
        self.inner.update_event(id, update).await
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>, String> {
        self.inner.find_event(id).await
    }

    async fn find_event_by_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<Option<Event>, String> {
        self.inner.find_event_by_message(chat_id, message_id).await
    }

    async fn events_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, String> {
        self.inner.events_by_ids(ids).await
    }
}

#[async_trait]
impl ActivityStore for FlakyStorage {
    async fn insert_activity(&self, activity: &Activity) -> Result<i64, String> {
        self.check()?;
        self.inner.insert_activity(activity).await
    }

    async fn update_activity(&self, activity: &Activity) -> Result<(), String> {
        self.check()?;
        self.inner.update_activity(activity).await
    }

    async fn find_activity(&self, id: i64) -> Result<Option<Activity>, String> {
        self.inner.find_activity(id).await
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Activity>, String> {
        self.inner.activities_between(start, end).await
    }

    async fn delete_activity(&self, id: i64) -> Result<usize, String> {
        self.check()?;
        self.inner.delete_activity(id).await
    }
}

#[async_trait]
impl VoteLedger for FlakyStorage {
    async fn toggle(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
    ) -> Result<VoteEffect, String> {
        self.check()?;
        self.inner.toggle(event_id, option, identity).await
    }

    async fn set(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
        active: bool,
    ) -> Result<VoteEffect, String> {
        self.check()?;
        self.inner.set(event_id, option, identity, active).await
    }

    async fn active_votes(&self, event_id: i64) -> Result<Vec<VoteRecord>, String> {
        self.inner.active_votes(event_id).await
    }

    async fn votes_by_actor(&self, identity: &ActorIdentity) -> Result<Vec<VoteRecord>, String> {
        self.inner.votes_by_actor(identity).await
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub type TestApp = App<Arc<RecordingTransport>, Arc<FlakyStorage>>;

pub const TEST_CHAT: i64 = -1001;
pub const TEST_BOT: &str = "pollbot";

/// App wired to mocks, plus handles to inspect them
pub fn test_app() -> (TestApp, Arc<RecordingTransport>, Arc<FlakyStorage>) {
    let transport = Arc::new(RecordingTransport::new());
    let storage = Arc::new(FlakyStorage::new());
    let app = App::new(
        transport.clone(),
        storage.clone(),
        Arc::new(MemorySessionStore::new()),
        Settings {
            bot_name: TEST_BOT.to_string(),
            timezone: Tz::UTC,
        },
    );
    (app, transport, storage)
}

pub fn actor(id: i64, first_name: &str) -> Actor {
    Actor::new(id, first_name, None)
}

pub fn chat() -> ChatTarget {
    ChatTarget::new(TEST_CHAT, None)
}

pub fn text(actor: &Actor, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat: chat(),
        message_id: 1,
        actor: actor.clone(),
        text: text.to_string(),
    }
}

pub fn press(actor: &Actor, message_id: i64, data: &str) -> IncomingCallback {
    IncomingCallback {
        id: format!("cb-{message_id}"),
        chat: Some(chat()),
        message_id: Some(message_id),
        actor: actor.clone(),
        data: data.to_string(),
    }
}
