//! Collectable fields: validation rules, prompts and draft application

use super::state::{Draft, FlowKind};
use crate::callback::{MAX_TOKEN_BYTES, SEPARATOR};
use crate::db::Org;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input format for timestamps, e.g. `2024-03-15 19:30`
pub const INPUT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Case-insensitive keyword accepted on optional fields
pub const SKIP_KEYWORD: &str = "skip";
/// Separator for list input
pub const LIST_SEPARATOR: char = ';';
/// Longest option label; the other half of the token carries `delOption|<event id>|`
pub const MAX_OPTION_BYTES: usize = MAX_TOKEN_BYTES / 2;

/// Validator family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Timestamp,
    Category,
    List,
    Id,
}

/// Validated input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Timestamp(NaiveDateTime),
    Category(Org),
    List(Vec<String>),
    Id(i64),
    /// `skip` on an optional field
    Skipped,
}

/// Rejected input. The message is the retry prompt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Empty input. Please enter {0}.")]
    Empty(&'static str),
    #[error(
        "Invalid input. Please enter a valid start time in the format YYYY-MM-DD HH:MM. For example, 2024-03-15 19:30"
    )]
    InvalidTimestamp,
    #[error("Invalid org. Please enter one of {0}")]
    InvalidCategory(String),
    #[error("Invalid activity ID! Please enter a valid number.")]
    InvalidId,
    #[error(
        "Option {0:?} is not allowed. Options must be at most {max} bytes and cannot contain '|'.",
        max = MAX_OPTION_BYTES
    )]
    InvalidOption(String),
    #[error("Option {0:?} already exists. Please enter a different option.")]
    DuplicateOption(String),
}

/// A named slot in a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Description,
    StartTime,
    Options,
    NewOption,
    ActivityId,
    ActivityName,
    ActivityStart,
    Org,
    Lead,
    CoLeads,
}

impl Field {
    pub fn kind(self) -> FieldKind {
        match self {
            Field::Description
            | Field::NewOption
            | Field::ActivityName
            | Field::Lead => FieldKind::Text,
            Field::StartTime | Field::ActivityStart => FieldKind::Timestamp,
            Field::Org => FieldKind::Category,
            Field::Options | Field::CoLeads => FieldKind::List,
            Field::ActivityId => FieldKind::Id,
        }
    }

    pub fn is_optional(self) -> bool {
        matches!(self, Field::StartTime | Field::Options | Field::CoLeads)
    }

    fn label(self) -> &'static str {
        match self {
            Field::Description => "the description",
            Field::StartTime | Field::ActivityStart => "the start time",
            Field::Options => "the options",
            Field::NewOption => "the option to add",
            Field::ActivityId => "the activity ID",
            Field::ActivityName => "the activity name",
            Field::Org => "the organizing committee",
            Field::Lead => "the lead",
            Field::CoLeads => "the co-leads",
        }
    }

    /// Prompt sent when the flow reaches this field
    pub fn prompt(self, kind: FlowKind) -> String {
        match self {
            Field::Description => {
                "Let's start creating the event. First, please enter the description.".to_string()
            }
            Field::StartTime => {
                "Got it! Now please enter the start time (YYYY-MM-DD HH:MM), or 'skip' to leave it unset."
                    .to_string()
            }
            Field::Options => format!(
                "Finally, please enter the poll options separated by semicolon (e.g. Option A; Option B), or 'skip' to keep \"{}\".",
                crate::db::Event::DEFAULT_OPTION
            ),
            Field::NewOption => self.edit_prompt(),
            Field::ActivityId => match kind {
                FlowKind::DeleteActivity => {
                    "Please provide the ID of the activity you want to delete.".to_string()
                }
                _ => "Please provide the ID of the activity you want to update.".to_string(),
            },
            Field::ActivityName => "Please provide the name for the new activity.".to_string(),
            Field::ActivityStart => {
                "Got it! Now please enter the start time (e.g., YYYY-MM-DD HH:MM).".to_string()
            }
            Field::Org => format!(
                "Next, please enter the name of the organizing committee. One of {}",
                Org::listing()
            ),
            Field::Lead => "Now, please enter the name of the lead.".to_string(),
            Field::CoLeads => {
                "Finally, please enter the name of the co-lead, separated by semicolon (e.g. Person A; Person B), or 'skip'."
                    .to_string()
            }
        }
    }

    /// Prompt sent when an edit button selects this field
    pub fn edit_prompt(self) -> String {
        match self {
            Field::Description => "Please enter the new description for the event.".to_string(),
            Field::StartTime | Field::ActivityStart => {
                "Please enter the new start time in the format YYYY-MM-DD HH:MM.".to_string()
            }
            Field::NewOption => "Please enter the new option to add.".to_string(),
            Field::Org => format!(
                "Please enter the new organizing committee. One of {}",
                Org::listing()
            ),
            Field::CoLeads => {
                "Please enter the new co-leads, separated by semicolon (e.g. Person A; Person B)."
                    .to_string()
            }
            other => format!("Please enter the new value for {}.", other.label()),
        }
    }

    /// Validate raw input for this field.
    ///
    /// The draft is consulted only for duplicate option labels.
    pub fn validate(self, input: &str, draft: &Draft) -> Result<FieldValue, FieldError> {
        let trimmed = input.trim();
        if self.is_optional() && trimmed.eq_ignore_ascii_case(SKIP_KEYWORD) {
            return Ok(FieldValue::Skipped);
        }

        match self.kind() {
            FieldKind::Text => {
                if trimmed.is_empty() {
                    return Err(FieldError::Empty(self.label()));
                }
                if self == Field::NewOption {
                    validate_option_label(trimmed)?;
                    if draft.as_event().is_some_and(|e| e.has_option(trimmed)) {
                        return Err(FieldError::DuplicateOption(trimmed.to_string()));
                    }
                }
                Ok(FieldValue::Text(trimmed.to_string()))
            }
            FieldKind::Timestamp => NaiveDateTime::parse_from_str(trimmed, INPUT_TIME_FORMAT)
                .map(FieldValue::Timestamp)
                .map_err(|_| FieldError::InvalidTimestamp),
            FieldKind::Category => Org::parse(trimmed)
                .map(FieldValue::Category)
                .ok_or_else(|| FieldError::InvalidCategory(Org::listing())),
            FieldKind::List => {
                let mut items: Vec<String> = Vec::new();
                for item in trimmed
                    .split(LIST_SEPARATOR)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                {
                    if self == Field::Options {
                        validate_option_label(item)?;
                        if items.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
                            continue;
                        }
                    }
                    items.push(item.to_string());
                }
                Ok(FieldValue::List(items))
            }
            FieldKind::Id => trimmed
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .map(FieldValue::Id)
                .ok_or(FieldError::InvalidId),
        }
    }

    /// Write a validated value into the draft.
    ///
    /// `Skipped` and an empty option list leave the draft untouched.
    pub fn apply(self, draft: &mut Draft, value: FieldValue) {
        match (draft, self, value) {
            (_, _, FieldValue::Skipped) => {}
            (Draft::Event(event), Field::Description, FieldValue::Text(text)) => {
                event.description = text;
            }
            (Draft::Event(event), Field::StartTime, FieldValue::Timestamp(at)) => {
                event.started_at = Some(at);
            }
            (Draft::Event(event), Field::Options, FieldValue::List(options)) => {
                if !options.is_empty() {
                    event.options = options;
                }
            }
            (Draft::Event(event), Field::NewOption, FieldValue::Text(option)) => {
                event.options.push(option);
            }
            (Draft::Activity(activity), Field::ActivityId, FieldValue::Id(id)) => {
                activity.id = id;
            }
            (Draft::Activity(activity), Field::ActivityName, FieldValue::Text(name)) => {
                activity.name = name;
            }
            (Draft::Activity(activity), Field::ActivityStart, FieldValue::Timestamp(at)) => {
                activity.started_at = at;
            }
            (Draft::Activity(activity), Field::Org, FieldValue::Category(org)) => {
                activity.org = org;
            }
            (Draft::Activity(activity), Field::Lead, FieldValue::Text(lead)) => {
                activity.lead = lead;
            }
            (Draft::Activity(activity), Field::CoLeads, FieldValue::List(co_leads)) => {
                activity.co_leads = co_leads;
            }
            (_, field, value) => {
                tracing::warn!(?field, ?value, "Field does not match draft, ignoring");
            }
        }
    }
}

fn validate_option_label(label: &str) -> Result<(), FieldError> {
    if label.len() > MAX_OPTION_BYTES || label.contains(SEPARATOR) {
        return Err(FieldError::InvalidOption(label.to_string()));
    }
    Ok(())
}
