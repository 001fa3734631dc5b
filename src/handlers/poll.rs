//! Poll editor buttons

use super::STALE_ALERT;
use crate::callback::PollField;
use crate::db::{Event, EventUpdate};
use crate::render;
use crate::runtime::{App, IncomingCallback, Notice, Storage, Transport};
use crate::state_machine::{ConversationState, Field};

impl PollField {
    /// Field edited by a text reply; `None` for the delete picker
    fn edit_field(self) -> Option<Field> {
        match self {
            PollField::Description => Some(Field::Description),
            PollField::StartedAt => Some(Field::StartTime),
            PollField::AddOption => Some(Field::NewOption),
            PollField::DeleteOption => None,
        }
    }
}

impl<T: Transport, S: Storage> App<T, S> {
    /// Load an event the presser created, alerting otherwise
    async fn owned_event(&self, cb: &IncomingCallback, event_id: i64) -> Option<Event> {
        let event = match self.storage.find_event(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.alert(cb, "Event not found.").await;
                return None;
            }
            Err(e) => {
                tracing::error!(event_id, error = %e, "Failed to load event");
                self.alert(cb, "Failed to load event. Please try again.").await;
                return None;
            }
        };
        if !cb.actor.owns(&event.created_by, event.created_by_id) {
            tracing::warn!(event_id, actor_id = cb.actor.id, "Update denied for non-creator");
            self.alert(cb, "You are not authorized to update this event")
                .await;
            return None;
        }
        Some(event)
    }

    pub(super) async fn handle_poll_edit(
        &self,
        cb: &IncomingCallback,
        field: PollField,
        event_id: i64,
    ) {
        let (Some(chat), Some(message_id)) = (cb.chat, cb.message_id) else {
            self.alert(cb, STALE_ALERT).await;
            return;
        };
        let Some(event) = self.owned_event(cb, event_id).await else {
            return;
        };

        match field.edit_field() {
            None => {
                self.answer(&cb.id, None).await;
                self.edit(chat.chat_id, message_id, render::delete_option_picker(&event))
                    .await;
            }
            Some(edit) => {
                let key = chat.session_key(cb.actor.id);
                self.sessions
                    .put(key, ConversationState::edit_event(event, edit));
                tracing::debug!(session = %key, event_id, ?edit, "Event edit started");
                self.answer(&cb.id, None).await;
                self.reply(chat, edit.edit_prompt()).await;
            }
        }
    }

    pub(super) async fn handle_delete_option(
        &self,
        cb: &IncomingCallback,
        event_id: i64,
        option: &str,
    ) {
        let Some(mut event) = self.owned_event(cb, event_id).await else {
            return;
        };
        if !event.remove_option(option) {
            self.alert(cb, "Option not found in event.").await;
            return;
        }
        let update = EventUpdate::Options(event.options.clone());
        if let Err(e) = self.storage.update_event(event_id, &update).await {
            tracing::error!(event_id, error = %e, "Failed to delete option");
            self.alert(cb, "Failed to update event.").await;
            return;
        }

        tracing::info!(event_id, option, "Option deleted");
        self.answer(&cb.id, Some(Notice::toast("Option deleted.")))
            .await;
        if let (Some(chat), Some(message_id)) = (cb.chat, cb.message_id) {
            let editor = render::event_editor(&event, &self.settings.bot_name, false);
            self.edit(chat.chat_id, message_id, editor).await;
        }
    }
}
