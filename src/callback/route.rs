//! Typed callback routes

use super::{decode, encode, CallbackError, CallbackToken};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

wire_enum!(
    /// Poll editor buttons
    PollField {
        Description => "desc",
        StartedAt => "startedAt",
        AddOption => "addOption",
        DeleteOption => "deleteOption",
    }
);

wire_enum!(
    /// Vote button behaviour. `In`/`Out` come from older poll messages.
    VoteIntent {
        Toggle => "toggle",
        In => "in",
        Out => "out",
    }
);

wire_enum!(
    /// Workplan menu buttons
    WorkplanAction {
        ViewCurrentMonth => "viewCurrentMonth",
        ViewByMonth => "viewByMonth",
        ViewCalendar => "viewCalendar",
        AddEvent => "addEvent",
        UpdateEvent => "updateEvent",
        DeleteEvent => "deleteEvent",
    }
);

wire_enum!(
    /// Activity editor buttons
    ActivityField {
        Name => "name",
        StartedAt => "startedAt",
        Org => "org",
        Lead => "lead",
        CoLeads => "coLeads",
    }
);

/// Month selector choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthChoice {
    Month { year: i32, month: u32 },
    All,
    Back,
}

impl MonthChoice {
    fn encode(self) -> String {
        match self {
            MonthChoice::Month { year, month } => format!("{year:04}-{month:02}"),
            MonthChoice::All => "all".to_string(),
            MonthChoice::Back => "back".to_string(),
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(MonthChoice::All),
            "back" => Some(MonthChoice::Back),
            _ => {
                let (year, month) = value.split_once('-')?;
                let year: i32 = year.parse().ok()?;
                let month: u32 = month.parse().ok()?;
                (1..=12)
                    .contains(&month)
                    .then_some(MonthChoice::Month { year, month })
            }
        }
    }
}

/// Every button payload the bot emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    PollEdit { field: PollField, event_id: i64 },
    DeleteOption { event_id: i64, option: String },
    Vote { option: String, intent: VoteIntent },
    Workplan(WorkplanAction),
    MonthPicker(MonthChoice),
    ActivityEdit { field: ActivityField, activity_id: i64 },
}

impl Route {
    pub const POLL_EDIT: &'static str = "updatePoll";
    pub const DELETE_OPTION: &'static str = "delOption";
    pub const VOTE: &'static str = "event";
    pub const WORKPLAN: &'static str = "workplan";
    pub const MONTH_PICKER: &'static str = "wpViewByMonth";
    pub const ACTIVITY_EDIT: &'static str = "wpUpdate";

    pub fn encode(&self) -> String {
        match self {
            Route::PollEdit { field, event_id } => {
                encode(Self::POLL_EDIT, &[field.as_str(), event_id.to_string().as_str()])
            }
            Route::DeleteOption { event_id, option } => {
                encode(Self::DELETE_OPTION, &[event_id.to_string().as_str(), option.as_str()])
            }
            Route::Vote { option, intent } => encode(Self::VOTE, &[option.as_str(), intent.as_str()]),
            Route::Workplan(action) => encode(Self::WORKPLAN, &[action.as_str()]),
            Route::MonthPicker(choice) => encode(Self::MONTH_PICKER, &[choice.encode()]),
            Route::ActivityEdit { field, activity_id } => {
                encode(Self::ACTIVITY_EDIT, &[field.as_str(), activity_id.to_string().as_str()])
            }
        }
    }

    pub fn parse(data: &str) -> Result<Self, CallbackError> {
        let token = decode(data);
        match token.prefix.as_str() {
            Self::POLL_EDIT => {
                let args = token.expect_args(2)?;
                Ok(Route::PollEdit {
                    field: parse_arg(&token, &args[0], PollField::parse)?,
                    event_id: parse_id(&token, &args[1])?,
                })
            }
            Self::DELETE_OPTION => {
                let args = token.expect_args(2)?;
                Ok(Route::DeleteOption {
                    event_id: parse_id(&token, &args[0])?,
                    option: args[1].clone(),
                })
            }
            Self::VOTE => {
                let args = token.expect_args(2)?;
                Ok(Route::Vote {
                    option: args[0].clone(),
                    intent: parse_arg(&token, &args[1], VoteIntent::parse)?,
                })
            }
            Self::WORKPLAN => {
                let args = token.expect_args(1)?;
                Ok(Route::Workplan(parse_arg(
                    &token,
                    &args[0],
                    WorkplanAction::parse,
                )?))
            }
            Self::MONTH_PICKER => {
                let args = token.expect_args(1)?;
                Ok(Route::MonthPicker(parse_arg(
                    &token,
                    &args[0],
                    MonthChoice::parse,
                )?))
            }
            Self::ACTIVITY_EDIT => {
                let args = token.expect_args(2)?;
                Ok(Route::ActivityEdit {
                    field: parse_arg(&token, &args[0], ActivityField::parse)?,
                    activity_id: parse_id(&token, &args[1])?,
                })
            }
            other => Err(CallbackError::UnknownPrefix(other.to_string())),
        }
    }
}

fn parse_arg<T>(
    token: &CallbackToken,
    value: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, CallbackError> {
    parse(value).ok_or_else(|| CallbackError::InvalidArg {
        prefix: token.prefix.clone(),
        value: value.to_string(),
    })
}

fn parse_id(token: &CallbackToken, value: &str) -> Result<i64, CallbackError> {
    parse_arg(token, value, |v| v.parse::<i64>().ok().filter(|id| *id > 0))
}
