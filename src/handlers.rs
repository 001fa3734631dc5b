//! Update handlers
//!
//! Entry points for every inbound message and button press. Commands start
//! flows or render views; other text is fed to the sender's session; button
//! presses are parsed into a [`Route`] and dispatched.

mod commands;
mod poll;
mod votes;
mod workplan;

use crate::callback::Route;
use crate::runtime::{App, IncomingCallback, IncomingMessage, Notice, Storage, Transport};
use commands::Command;

/// Alert for buttons on polls that are no longer current
pub const STALE_ALERT: &str = "Likely out-dated event. No more modification.";

impl<T: Transport, S: Storage> App<T, S> {
    pub async fn handle_message(&self, msg: IncomingMessage) {
        match Command::parse(&msg.text, &self.settings.bot_name) {
            Some((Command::Foreign, _)) => {
                tracing::debug!(chat_id = msg.chat.chat_id, "Ignoring command for another bot");
            }
            Some((command, args)) => self.handle_command(command, args, &msg).await,
            None => {
                if !self.advance_session(&msg).await {
                    tracing::debug!(
                        chat_id = msg.chat.chat_id,
                        actor_id = msg.actor.id,
                        "No session for message"
                    );
                }
            }
        }
    }

    pub async fn handle_callback(&self, cb: IncomingCallback) {
        let route = match Route::parse(&cb.data) {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(data = %cb.data, error = %e, "Malformed callback token");
                self.answer(&cb.id, None).await;
                return;
            }
        };

        tracing::debug!(?route, actor_id = cb.actor.id, "Callback");
        match route {
            Route::PollEdit { field, event_id } => self.handle_poll_edit(&cb, field, event_id).await,
            Route::DeleteOption { event_id, option } => {
                self.handle_delete_option(&cb, event_id, &option).await;
            }
            Route::Vote { option, intent } => self.handle_vote(&cb, &option, intent).await,
            Route::Workplan(action) => self.handle_workplan(&cb, action).await,
            Route::MonthPicker(choice) => self.handle_month_choice(&cb, choice).await,
            Route::ActivityEdit { field, activity_id } => {
                self.handle_activity_edit(&cb, field, activity_id).await;
            }
        }
    }

    /// Acknowledge with a modal alert
    async fn alert(&self, cb: &IncomingCallback, text: &str) {
        self.answer(&cb.id, Some(Notice::alert(text))).await;
    }
}
