//! Session executor
//!
//! Feeds text into the pure step machine and performs the effects it asks
//! for: prompt replies and terminal persistence.

use super::{App, ChatTarget, IncomingMessage, Storage, Transport};
use crate::db::{Activity, Event, EventUpdate};
use crate::ledger::Actor;
use crate::render::{self, OutgoingMessage};
use crate::session::SessionKey;
use crate::state_machine::{
    transition, ConversationState, Draft, Effect, Field, FlowKind, Step, Transition,
};

const ACTIVITY_NOT_FOUND: &str = "No activity found with the given ID! Please try again.";

impl<T: Transport, S: Storage> App<T, S> {
    /// Advance the sender's session with a text message.
    ///
    /// Returns false when the sender has no session.
    pub async fn advance_session(&self, msg: &IncomingMessage) -> bool {
        let key = msg.chat.session_key(msg.actor.id);
        let Some(state) = self.sessions.get(&key) else {
            return false;
        };

        let Transition { new_state, effects } = transition(&state, &msg.text);
        tracing::debug!(
            session = %key,
            message_id = msg.message_id,
            step = new_state.step.number(),
            "Session advanced"
        );
        self.sessions.put(key, new_state.clone());

        for effect in effects {
            match effect {
                Effect::Reply(text) => self.reply(msg.chat, text).await,
                Effect::Persist => self.persist(key, msg.chat, &msg.actor, &new_state).await,
            }
        }
        true
    }

    async fn persist(
        &self,
        key: SessionKey,
        chat: ChatTarget,
        actor: &Actor,
        state: &ConversationState,
    ) {
        match (&state.draft, state.kind) {
            (Draft::Event(event), FlowKind::CreateEvent) => {
                self.create_event(key, chat, event).await;
            }
            (Draft::Event(event), FlowKind::UpdateEvent) => {
                self.save_event(key, chat, state, event).await;
            }
            (Draft::Activity(activity), FlowKind::AddActivity) => {
                self.create_activity(key, chat, activity).await;
            }
            (Draft::Activity(activity), FlowKind::UpdateActivity) => {
                if state.last_edit.is_some() {
                    self.save_activity(key, chat, state, activity).await;
                } else {
                    self.select_activity(key, chat, actor, activity.id).await;
                }
            }
            (Draft::Activity(activity), FlowKind::DeleteActivity) => {
                self.remove_activity(key, chat, actor, activity.id).await;
            }
            (_, kind) => {
                tracing::warn!(session = %key, ?kind, "Draft does not match flow, dropping session");
                self.sessions.remove(&key);
            }
        }
    }

    async fn create_event(&self, key: SessionKey, chat: ChatTarget, event: &Event) {
        match self.storage.insert_event(event).await {
            Ok(id) => {
                self.sessions.remove(&key);
                tracing::info!(event_id = id, chat_id = chat.chat_id, "Event created");
                let mut saved = event.clone();
                saved.id = id;
                let bot_name = self.settings.bot_name.clone();
                self.send(chat, render::event_editor(&saved, &bot_name, true))
                    .await;
                self.send(chat, render::send_hint(&bot_name, id)).await;
            }
            Err(e) => {
                tracing::error!(session = %key, error = %e, "Failed to save event");
                self.reply(chat, "Failed to save event! Input anything to save again!")
                    .await;
            }
        }
    }

    async fn save_event(
        &self,
        key: SessionKey,
        chat: ChatTarget,
        state: &ConversationState,
        event: &Event,
    ) {
        let Some(update) = state.last_edit.and_then(|field| event_update(field, event)) else {
            tracing::warn!(event_id = event.id, field = ?state.last_edit, "No event column for edit");
            self.reply(chat, "Failed to update event! Input anything to save again!")
                .await;
            return;
        };
        match self.storage.update_event(event.id, &update).await {
            Ok(()) => {
                tracing::info!(event_id = event.id, field = ?state.last_edit, "Event updated");
                self.await_choice(key, state);
                let message = render::event_editor(event, &self.settings.bot_name, false);
                self.send(chat, message).await;
            }
            Err(e) => {
                tracing::error!(event_id = event.id, error = %e, "Failed to update event");
                self.reply(chat, "Failed to update event! Input anything to save again!")
                    .await;
            }
        }
    }

    async fn create_activity(&self, key: SessionKey, chat: ChatTarget, activity: &Activity) {
        match self.storage.insert_activity(activity).await {
            Ok(id) => {
                self.sessions.remove(&key);
                tracing::info!(activity_id = id, "Activity created");
                let mut saved = activity.clone();
                saved.id = id;
                let text = format!(
                    "Activity details collected successfully!\n{}",
                    render::activity_line(&saved)
                );
                self.send(chat, OutgoingMessage::html(text)).await;
            }
            Err(e) => {
                tracing::error!(session = %key, error = %e, "Failed to save activity");
                self.reply(chat, "Failed to save activity! Input anything to save again!")
                    .await;
            }
        }
    }

    /// Load the chosen activity and offer its field buttons
    async fn select_activity(&self, key: SessionKey, chat: ChatTarget, actor: &Actor, id: i64) {
        let activity = match self.storage.find_activity(id).await {
            Ok(Some(activity)) => activity,
            Ok(None) => {
                self.restart_id_prompt(key, chat, FlowKind::UpdateActivity)
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(activity_id = id, error = %e, "Failed to look up activity");
                self.reply(chat, "Failed to look up activity! Input anything to try again.")
                    .await;
                return;
            }
        };

        if !actor.owns(&activity.created_by, activity.created_by_id) {
            tracing::warn!(activity_id = id, actor_id = actor.id, "Update denied for non-creator");
            self.sessions.remove(&key);
            self.reply(chat, "You are not authorized to update this activity")
                .await;
            return;
        }

        let message = render::activity_editor(&activity);
        let mut state = ConversationState::start(FlowKind::UpdateActivity);
        state.draft = Draft::Activity(activity);
        self.await_choice(key, &state);
        self.send(chat, message).await;
    }

    async fn save_activity(
        &self,
        key: SessionKey,
        chat: ChatTarget,
        state: &ConversationState,
        activity: &Activity,
    ) {
        match self.storage.update_activity(activity).await {
            Ok(()) => {
                tracing::info!(activity_id = activity.id, field = ?state.last_edit, "Activity updated");
                self.await_choice(key, state);
                let mut message = render::activity_editor(activity);
                message.text = format!("Activity updated successfully!\n{}", message.text);
                self.send(chat, message).await;
            }
            Err(e) => {
                tracing::error!(activity_id = activity.id, error = %e, "Failed to update activity");
                self.reply(chat, "Failed to update activity! Input anything to save again!")
                    .await;
            }
        }
    }

    async fn remove_activity(&self, key: SessionKey, chat: ChatTarget, actor: &Actor, id: i64) {
        let activity = match self.storage.find_activity(id).await {
            Ok(Some(activity)) => activity,
            Ok(None) => {
                self.restart_id_prompt(key, chat, FlowKind::DeleteActivity)
                    .await;
                return;
            }
            Err(e) => {
                tracing::error!(activity_id = id, error = %e, "Failed to look up activity");
                self.reply(chat, "Failed to delete activity! Please try again.")
                    .await;
                return;
            }
        };

        if !actor.owns(&activity.created_by, activity.created_by_id) {
            tracing::warn!(activity_id = id, actor_id = actor.id, "Delete denied for non-creator");
            self.sessions.remove(&key);
            self.reply(chat, "You are not authorized to delete this activity")
                .await;
            return;
        }

        match self.storage.delete_activity(id).await {
            Ok(0) => {
                self.restart_id_prompt(key, chat, FlowKind::DeleteActivity)
                    .await;
            }
            Ok(_) => {
                self.sessions.remove(&key);
                tracing::info!(activity_id = id, "Activity deleted");
                self.reply(chat, "Activity deleted successfully!").await;
            }
            Err(e) => {
                tracing::error!(activity_id = id, error = %e, "Failed to delete activity");
                self.reply(chat, "Failed to delete activity! Please try again.")
                    .await;
            }
        }
    }

    /// Unknown id: ask for another one
    async fn restart_id_prompt(&self, key: SessionKey, chat: ChatTarget, kind: FlowKind) {
        let mut state = self
            .sessions
            .get(&key)
            .unwrap_or_else(|| ConversationState::start(kind));
        state.step = Step::Collect(1);
        self.sessions.put(key, state);
        self.reply(chat, ACTIVITY_NOT_FOUND).await;
    }

    /// Park an update flow until the next button press
    fn await_choice(&self, key: SessionKey, state: &ConversationState) {
        let mut next = state.clone();
        next.step = Step::AwaitingChoice;
        self.sessions.put(key, next);
    }
}
/// Column written by a single-field poll edit
fn event_update(field: Field, event: &Event) -> Option<EventUpdate> {
    match field {
        Field::Description => Some(EventUpdate::Description(event.description.clone())),
        Field::StartTime => Some(EventUpdate::StartedAt(event.started_at)),
        Field::Options | Field::NewOption => Some(EventUpdate::Options(event.options.clone())),
        _ => None,
    }
}

