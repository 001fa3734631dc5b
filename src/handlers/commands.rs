//! Slash commands

use crate::calendar::current_month_start;
use crate::db::{Event, EventUpdate};
use crate::ledger::ActorIdentity;
use crate::render;
use crate::runtime::{App, IncomingMessage, Storage, Transport};
use crate::state_machine::{ConversationState, Field, FlowKind};
use chrono::{Months, Utc};
use std::collections::HashMap;

/// How far back `/myvotes` looks, in months before the current one
const MY_VOTES_MONTHS_BACK: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Send,
    MyVotes,
    Workplan,
    /// Addressed to another bot via `@name`
    Foreign,
}

impl Command {
    /// Split `/name[@bot] args`; `None` when the text is not one of ours
    pub fn parse<'a>(text: &'a str, bot_name: &str) -> Option<(Self, &'a str)> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let (name, target) = match head.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (head, None),
        };

        let command = match name {
            "start" => Command::Start,
            "send" => Command::Send,
            "myvotes" => Command::MyVotes,
            "workplan" => Command::Workplan,
            _ => return None,
        };
        match target {
            Some(target) if !target.eq_ignore_ascii_case(bot_name) => {
                Some((Command::Foreign, args))
            }
            _ => Some((command, args.trim())),
        }
    }
}

impl<T: Transport, S: Storage> App<T, S> {
    pub(super) async fn handle_command(&self, command: Command, args: &str, msg: &IncomingMessage) {
        tracing::info!(?command, chat_id = msg.chat.chat_id, actor_id = msg.actor.id, "Command");
        match command {
            Command::Start => self.start_poll(msg).await,
            Command::Send => self.send_poll(args, msg).await,
            Command::MyVotes => self.my_votes(msg).await,
            Command::Workplan => {
                self.send(msg.chat, render::workplan_menu()).await;
            }
            Command::Foreign => {}
        }
    }

    async fn start_poll(&self, msg: &IncomingMessage) {
        let key = msg.chat.session_key(msg.actor.id);
        let state = ConversationState::start_for(FlowKind::CreateEvent, msg.chat.chat_id, &msg.actor);
        self.sessions.put(key, state);
        tracing::debug!(session = %key, "Create flow started");
        self.reply(msg.chat, Field::Description.prompt(FlowKind::CreateEvent))
            .await;
    }

    /// Post the poll for voting and remember where it lives
    async fn send_poll(&self, args: &str, msg: &IncomingMessage) {
        let Some(event_id) = args.parse::<i64>().ok().filter(|id| *id > 0) else {
            self.reply(msg.chat, "Usage: /send <EventID>").await;
            return;
        };

        let event = match self.storage.find_event(event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.reply(msg.chat, "Event not found.").await;
                return;
            }
            Err(e) => {
                tracing::error!(event_id, error = %e, "Failed to load event");
                self.reply(msg.chat, "Failed to load event! Please try again.")
                    .await;
                return;
            }
        };

        if !msg.actor.owns(&event.created_by, event.created_by_id) {
            tracing::warn!(event_id, actor_id = msg.actor.id, "Send denied for non-creator");
            self.reply(msg.chat, "You are not authorized to send this event")
                .await;
            return;
        }

        let votes = match self.storage.active_votes(event_id).await {
            Ok(votes) => votes,
            Err(e) => {
                tracing::error!(event_id, error = %e, "Failed to load votes");
                Vec::new()
            }
        };
        let Some(message_id) = self.send(msg.chat, render::poll(&event, &votes)).await else {
            return;
        };

        let posted = EventUpdate::Posted {
            chat_id: msg.chat.chat_id,
            message_id,
        };
        match self.storage.update_event(event_id, &posted).await {
            Ok(()) => tracing::info!(event_id, message_id, "Poll sent"),
            Err(e) => tracing::error!(event_id, error = %e, "Failed to record poll message"),
        }
    }

    /// Events the sender has active votes on, with the options picked
    async fn my_votes(&self, msg: &IncomingMessage) {
        let identity = ActorIdentity::resolve(&msg.actor);
        let result = async {
            let votes = self.storage.votes_by_actor(&identity).await?;
            let mut picked: HashMap<i64, Vec<String>> = HashMap::new();
            let mut ids = Vec::new();
            for vote in votes {
                let options = picked.entry(vote.event_id).or_insert_with(|| {
                    ids.push(vote.event_id);
                    Vec::new()
                });
                if !options.contains(&vote.option) {
                    options.push(vote.option);
                }
            }
            let events = self.storage.events_by_ids(&ids).await?;
            Ok::<_, String>((events, picked))
        }
        .await;

        let (events, mut picked) = match result {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(actor_id = msg.actor.id, error = %e, "Failed to load votes");
                self.reply(msg.chat, "Failed to load your votes! Please try again.")
                    .await;
                return;
            }
        };

        let cutoff = current_month_start(Utc::now(), self.settings.timezone)
            .checked_sub_months(Months::new(MY_VOTES_MONTHS_BACK))
            .map(|at| at.naive_utc());
        let mut entries: Vec<(Event, Vec<String>)> = events
            .into_iter()
            .filter(|event| match (event.started_at, cutoff) {
                (Some(started), Some(cutoff)) => started > cutoff,
                _ => true,
            })
            .map(|event| {
                let options = picked.remove(&event.id).unwrap_or_default();
                (event, options)
            })
            .collect();
        // unscheduled first, then by start time
        entries.sort_by_key(|(event, _)| (event.started_at.is_some(), event.started_at));

        self.send(msg.chat, render::my_votes(&entries)).await;
    }
}
