//! Conversation state types

use super::field::Field;
use crate::db::{Activity, Event};
use crate::ledger::Actor;
use serde::{Deserialize, Serialize};

/// Which entity a session is building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    CreateEvent,
    UpdateEvent,
    AddActivity,
    UpdateActivity,
    DeleteActivity,
}

impl FlowKind {
    /// Fields collected in order from `Collect(1)`
    pub fn fields(self) -> &'static [Field] {
        match self {
            FlowKind::CreateEvent => &[Field::Description, Field::StartTime, Field::Options],
            FlowKind::UpdateEvent => &[],
            FlowKind::AddActivity => &[
                Field::ActivityName,
                Field::ActivityStart,
                Field::Org,
                Field::Lead,
                Field::CoLeads,
            ],
            FlowKind::UpdateActivity | FlowKind::DeleteActivity => &[Field::ActivityId],
        }
    }

    fn empty_draft(self) -> Draft {
        match self {
            FlowKind::CreateEvent | FlowKind::UpdateEvent => Draft::Event(Event::draft()),
            FlowKind::AddActivity | FlowKind::UpdateActivity | FlowKind::DeleteActivity => {
                Draft::Activity(Activity::draft())
            }
        }
    }
}

/// Position of a session within its flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// 1-based index into `FlowKind::fields`
    Collect(usize),
    /// Single-field edit in an update flow
    Edit(Field),
    /// Update flow waiting for the next field button
    AwaitingChoice,
    /// All fields collected; persistence pending or being retried
    Complete,
}

impl Step {
    /// Integer view: `n` while collecting, -1 once complete, 0 otherwise
    pub fn number(self) -> i64 {
        match self {
            Step::Collect(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Step::Complete => -1,
            Step::Edit(_) | Step::AwaitingChoice => 0,
        }
    }
}

/// Entity under construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Draft {
    Event(Event),
    Activity(Activity),
}

impl Draft {
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Draft::Event(event) => Some(event),
            Draft::Activity(_) => None,
        }
    }

    #[allow(dead_code)] // Used by tests
    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            Draft::Activity(activity) => Some(activity),
            Draft::Event(_) => None,
        }
    }
}

/// One session's conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub kind: FlowKind,
    pub step: Step,
    pub draft: Draft,
    /// Field most recently edited in an update flow
    pub last_edit: Option<Field>,
}

impl ConversationState {
    /// Fresh flow at `Collect(1)` with a default draft
    pub fn start(kind: FlowKind) -> Self {
        Self {
            kind,
            step: Step::Collect(1),
            draft: kind.empty_draft(),
            last_edit: None,
        }
    }

    /// Fresh flow whose draft records the chat and creator
    pub fn start_for(kind: FlowKind, chat_id: i64, actor: &Actor) -> Self {
        let mut state = Self::start(kind);
        match &mut state.draft {
            Draft::Event(event) => {
                event.chat_id = chat_id;
                event.created_by = actor.display_name();
                event.created_by_id = actor.id;
            }
            Draft::Activity(activity) => {
                activity.created_by = actor.display_name();
                activity.created_by_id = actor.id;
            }
        }
        state
    }

    /// Single-field edit of a stored event
    pub fn edit_event(event: Event, field: Field) -> Self {
        Self {
            kind: FlowKind::UpdateEvent,
            step: Step::Edit(field),
            draft: Draft::Event(event),
            last_edit: None,
        }
    }

    /// Single-field edit of a stored activity
    pub fn edit_activity(activity: Activity, field: Field) -> Self {
        Self {
            kind: FlowKind::UpdateActivity,
            step: Step::Edit(field),
            draft: Draft::Activity(activity),
            last_edit: None,
        }
    }

    /// Field the next text input fills, if any
    pub fn current_field(&self) -> Option<Field> {
        match self.step {
            Step::Collect(n) => n
                .checked_sub(1)
                .and_then(|idx| self.kind.fields().get(idx))
                .copied(),
            Step::Edit(field) => Some(field),
            Step::AwaitingChoice | Step::Complete => None,
        }
    }
}
