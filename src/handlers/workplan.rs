//! Workplan menu, month picker and activity editor buttons

use crate::calendar::{picker_months, range, CalendarSelection};
use crate::callback::{ActivityField, MonthChoice, WorkplanAction};
use crate::render;
use crate::runtime::{App, ChatTarget, IncomingCallback, Storage, Transport};
use crate::state_machine::{ConversationState, Field, FlowKind};
use chrono::Utc;

impl ActivityField {
    fn edit_field(self) -> Field {
        match self {
            ActivityField::Name => Field::ActivityName,
            ActivityField::StartedAt => Field::ActivityStart,
            ActivityField::Org => Field::Org,
            ActivityField::Lead => Field::Lead,
            ActivityField::CoLeads => Field::CoLeads,
        }
    }
}

impl<T: Transport, S: Storage> App<T, S> {
    pub(super) async fn handle_workplan(&self, cb: &IncomingCallback, action: WorkplanAction) {
        self.answer(&cb.id, None).await;
        let Some(chat) = cb.chat else {
            return;
        };

        match action {
            WorkplanAction::ViewCurrentMonth => {
                self.show_activities(chat, CalendarSelection::CurrentMonth)
                    .await;
            }
            WorkplanAction::ViewCalendar => {
                self.show_activities(chat, CalendarSelection::All).await;
            }
            WorkplanAction::ViewByMonth => {
                let months = picker_months(Utc::now(), self.settings.timezone);
                let picker = render::month_picker(&months);
                match cb.message_id {
                    Some(message_id) => self.edit(chat.chat_id, message_id, picker).await,
                    None => {
                        self.send(chat, picker).await;
                    }
                }
            }
            WorkplanAction::AddEvent => self.start_activity_flow(cb, chat, FlowKind::AddActivity).await,
            WorkplanAction::UpdateEvent => {
                self.start_activity_flow(cb, chat, FlowKind::UpdateActivity)
                    .await;
            }
            WorkplanAction::DeleteEvent => {
                self.start_activity_flow(cb, chat, FlowKind::DeleteActivity)
                    .await;
            }
        }
    }

    pub(super) async fn handle_month_choice(&self, cb: &IncomingCallback, choice: MonthChoice) {
        self.answer(&cb.id, None).await;
        let Some(chat) = cb.chat else {
            return;
        };

        match choice {
            MonthChoice::Month { year, month } => {
                self.show_activities(chat, CalendarSelection::Month { year, month })
                    .await;
            }
            MonthChoice::All => self.show_activities(chat, CalendarSelection::All).await,
            MonthChoice::Back => match cb.message_id {
                Some(message_id) => {
                    self.edit(chat.chat_id, message_id, render::workplan_menu())
                        .await;
                }
                None => {
                    self.send(chat, render::workplan_menu()).await;
                }
            },
        }
    }

    pub(super) async fn handle_activity_edit(
        &self,
        cb: &IncomingCallback,
        field: ActivityField,
        activity_id: i64,
    ) {
        let Some(chat) = cb.chat else {
            self.alert(cb, super::STALE_ALERT).await;
            return;
        };

        let activity = match self.storage.find_activity(activity_id).await {
            Ok(Some(activity)) => activity,
            Ok(None) => {
                self.alert(cb, "Activity not found.").await;
                return;
            }
            Err(e) => {
                tracing::error!(activity_id, error = %e, "Failed to load activity");
                self.alert(cb, "Failed to load activity. Please try again.")
                    .await;
                return;
            }
        };
        if !cb.actor.owns(&activity.created_by, activity.created_by_id) {
            tracing::warn!(activity_id, actor_id = cb.actor.id, "Update denied for non-creator");
            self.alert(cb, "You are not authorized to update this activity")
                .await;
            return;
        }

        let edit = field.edit_field();
        let key = chat.session_key(cb.actor.id);
        self.sessions
            .put(key, ConversationState::edit_activity(activity, edit));
        tracing::debug!(session = %key, activity_id, ?edit, "Activity edit started");
        self.answer(&cb.id, None).await;
        self.reply(chat, edit.edit_prompt()).await;
    }

    async fn start_activity_flow(&self, cb: &IncomingCallback, chat: ChatTarget, kind: FlowKind) {
        let key = chat.session_key(cb.actor.id);
        let state = ConversationState::start_for(kind, chat.chat_id, &cb.actor);
        let prompt = state
            .current_field()
            .map(|field| field.prompt(kind))
            .unwrap_or_default();
        self.sessions.put(key, state);
        tracing::debug!(session = %key, ?kind, "Activity flow started");
        self.reply(chat, prompt).await;
    }

    async fn show_activities(&self, chat: ChatTarget, selection: CalendarSelection) {
        let Some(window) = range(selection, Utc::now(), self.settings.timezone) else {
            self.reply(chat, "Invalid month selected.").await;
            return;
        };
        match self
            .storage
            .activities_between(window.start, window.end)
            .await
        {
            Ok(activities) => {
                self.send(chat, render::activity_listing(&window, &activities))
                    .await;
            }
            Err(e) => {
                tracing::error!(?selection, error = %e, "Failed to load activities");
                self.reply(chat, "Failed to load activities! Please try again.")
                    .await;
            }
        }
    }
}
