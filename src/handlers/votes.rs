//! Vote buttons on posted polls

use super::STALE_ALERT;
use crate::callback::VoteIntent;
use crate::ledger::ActorIdentity;
use crate::render;
use crate::runtime::{App, IncomingCallback, Notice, Storage, Transport};

impl<T: Transport, S: Storage> App<T, S> {
    pub(super) async fn handle_vote(&self, cb: &IncomingCallback, option: &str, intent: VoteIntent) {
        let (Some(chat), Some(message_id)) = (cb.chat, cb.message_id) else {
            self.alert(cb, STALE_ALERT).await;
            return;
        };

        let event = match self
            .storage
            .find_event_by_message(chat.chat_id, message_id)
            .await
        {
            Ok(Some(event)) if event.has_option(option) => event,
            Ok(_) => {
                tracing::warn!(chat_id = chat.chat_id, message_id, option, "Vote on stale poll");
                self.alert(cb, STALE_ALERT).await;
                return;
            }
            Err(e) => {
                tracing::error!(message_id, error = %e, "Failed to load poll");
                self.alert(cb, "Failed to record vote. Please try again.")
                    .await;
                return;
            }
        };

        let identity = ActorIdentity::resolve(&cb.actor);
        let outcome = match intent {
            VoteIntent::Toggle => self.storage.toggle(event.id, option, &identity).await,
            VoteIntent::In => self.storage.set(event.id, option, &identity, true).await,
            VoteIntent::Out => self.storage.set(event.id, option, &identity, false).await,
        };
        let effect = match outcome {
            Ok(effect) => effect,
            Err(e) => {
                tracing::error!(event_id = event.id, error = %e, "Failed to record vote");
                self.alert(cb, "Failed to record vote. Please try again.")
                    .await;
                return;
            }
        };

        tracing::info!(event_id = event.id, option, ?effect, user_id = identity.user_id, "Vote recorded");
        let notice = if effect.is_active() {
            format!("You voted for {option}")
        } else {
            format!("You removed your vote for {option}")
        };
        self.answer(&cb.id, Some(Notice::toast(notice))).await;

        match self.storage.active_votes(event.id).await {
            Ok(votes) => {
                self.edit(chat.chat_id, message_id, render::poll(&event, &votes))
                    .await;
            }
            Err(e) => tracing::error!(event_id = event.id, error = %e, "Failed to load votes"),
        }
    }
}
