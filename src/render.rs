//! Message rendering
//!
//! Builds transport-neutral messages: HTML text plus an optional inline
//! keyboard whose buttons carry typed routes.

use crate::calendar::CalendarRange;
use crate::callback::{ActivityField, MonthChoice, PollField, Route, VoteIntent, WorkplanAction};
use crate::db::{Activity, Event, VoteRecord};
use chrono::NaiveDateTime;
use std::fmt::Write as _;

/// Display format for stored timestamps
pub const DISPLAY_TIME_FORMAT: &str = "%d %b %Y %H:%M";
const MONTH_PICKER_ROW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub route: Route,
}

impl Button {
    pub fn new(text: impl Into<String>, route: Route) -> Self {
        Self {
            text: text.into(),
            route,
        }
    }
}

/// Rows of inline buttons
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    #[allow(dead_code)] // Used by tests
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub format: TextFormat,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn display_time(at: &NaiveDateTime) -> String {
    at.format(DISPLAY_TIME_FORMAT).to_string()
}

// ==================== Polls ====================

/// Event details block
pub fn event_summary(event: &Event) -> String {
    let started = event
        .started_at
        .as_ref()
        .map_or_else(|| "Not set".to_string(), display_time);
    let options = event
        .options
        .iter()
        .map(|o| escape_html(o))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "<b>Event ID:</b> {}\n<b>Description:</b> {}\n<b>Starts at:</b> {}\n<b>Options:</b> {}",
        event.id,
        escape_html(&event.description),
        started,
        options
    )
}

/// Creator-facing editor with update buttons
pub fn event_editor(event: &Event, bot_name: &str, is_new: bool) -> OutgoingMessage {
    let mut text = event_summary(event);
    text.push_str("\n\nYou can update the poll by clicking the buttons below.");
    if is_new {
        let _ = write!(
            text,
            "\nYou can now send it to the group by copy pasting the following command sent as a separate message, in the format: /send@{} &lt;EventID&gt;",
            escape_html(bot_name)
        );
    }
    let button = |label: &str, field: PollField| {
        Button::new(
            label,
            Route::PollEdit {
                field,
                event_id: event.id,
            },
        )
    };
    OutgoingMessage::html(text).with_keyboard(Keyboard::new(vec![
        vec![
            button("Description", PollField::Description),
            button("Start Time", PollField::StartedAt),
        ],
        vec![
            button("Add Option", PollField::AddOption),
            button("Delete Option", PollField::DeleteOption),
        ],
    ]))
}

/// Copy-paste command that sends the poll
pub fn send_hint(bot_name: &str, event_id: i64) -> OutgoingMessage {
    OutgoingMessage::plain(format!("/send@{bot_name} {event_id}"))
}

/// Picker for removing an option
pub fn delete_option_picker(event: &Event) -> OutgoingMessage {
    let rows = event
        .options
        .iter()
        .map(|option| {
            vec![Button::new(
                option.clone(),
                Route::DeleteOption {
                    event_id: event.id,
                    option: option.clone(),
                },
            )]
        })
        .collect();
    OutgoingMessage::plain("Select the option to delete").with_keyboard(Keyboard::new(rows))
}

/// Poll message with voter lists and one toggle button per option
pub fn poll(event: &Event, votes: &[VoteRecord]) -> OutgoingMessage {
    let mut text = format!("<b>{}</b>\n", escape_html(&event.description));
    if let Some(at) = &event.started_at {
        let _ = writeln!(text, "<b>Starts at:</b> {}", display_time(at));
    }
    text.push('\n');
    for option in &event.options {
        let voters: Vec<&VoteRecord> = votes
            .iter()
            .filter(|v| v.active && v.option == *option)
            .collect();
        let _ = writeln!(text, "<b>{}</b> ({})", escape_html(option), voters.len());
        for voter in voters {
            let _ = writeln!(text, "• {}", escape_html(&voter.user));
        }
    }
    if votes.iter().all(|v| !v.active) {
        text.push_str("\nNo votes yet!");
    }
    let rows = event
        .options
        .iter()
        .map(|option| {
            vec![Button::new(
                option.clone(),
                Route::Vote {
                    option: option.clone(),
                    intent: VoteIntent::Toggle,
                },
            )]
        })
        .collect();
    OutgoingMessage::html(text.trim_end().to_string()).with_keyboard(Keyboard::new(rows))
}

/// `/myvotes` listing: events paired with the options the actor picked
pub fn my_votes(entries: &[(Event, Vec<String>)]) -> OutgoingMessage {
    let mut text = format!("<b>You Voted Events: {}</b>\n", entries.len());
    for (idx, (event, options)) in entries.iter().enumerate() {
        let _ = write!(
            text,
            "\n<b>{}. Description:</b> {}\n<b>Starts at:</b> {}\n<b>Voted Option(s):</b>\n",
            idx + 1,
            escape_html(&event.description),
            event
                .started_at
                .as_ref()
                .map_or_else(|| "Not set".to_string(), display_time)
        );
        if options.is_empty() {
            text.push_str("None\n");
        }
        for option in options {
            let _ = writeln!(text, "• {}", escape_html(option));
        }
    }
    OutgoingMessage::html(text.trim_end().to_string())
}

// ==================== Workplan ====================

pub fn workplan_menu() -> OutgoingMessage {
    let button = |label: &str, action: WorkplanAction| Button::new(label, Route::Workplan(action));
    OutgoingMessage::plain("Please choose an option:").with_keyboard(Keyboard::new(vec![
        vec![
            button("View This Mo", WorkplanAction::ViewCurrentMonth),
            button("View By Mo", WorkplanAction::ViewByMonth),
            button("View All", WorkplanAction::ViewCalendar),
        ],
        vec![
            button("Add Event", WorkplanAction::AddEvent),
            button("Update Event", WorkplanAction::UpdateEvent),
            button("Delete Event", WorkplanAction::DeleteEvent),
        ],
    ]))
}

/// Month buttons in rows of four, with "All" and "<< back" on the last row
pub fn month_picker(months: &[(i32, u32)]) -> OutgoingMessage {
    let mut rows: Vec<Vec<Button>> = months
        .chunks(MONTH_PICKER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|&(year, month)| {
                    Button::new(
                        format!("{year:04}-{month:02}"),
                        Route::MonthPicker(MonthChoice::Month { year, month }),
                    )
                })
                .collect()
        })
        .collect();
    let extras = [
        Button::new("All", Route::MonthPicker(MonthChoice::All)),
        Button::new("<< back", Route::MonthPicker(MonthChoice::Back)),
    ];
    match rows.last_mut() {
        Some(last) => last.extend(extras),
        None => rows.push(extras.to_vec()),
    }
    OutgoingMessage::plain("Select a month to view activities:").with_keyboard(Keyboard::new(rows))
}

/// `<b>time name - (Org: X) - (ID:n):</b> lead(L), a(CoL), b(CoL)`
pub fn activity_line(activity: &Activity) -> String {
    let mut line = format!(
        "<b>{} {} - (Org: {}) - (ID:{}):</b> {}(L)",
        display_time(&activity.started_at),
        escape_html(&activity.name),
        activity.org,
        activity.id,
        escape_html(&activity.lead)
    );
    for co_lead in &activity.co_leads {
        let _ = write!(line, ", {}(CoL)", escape_html(co_lead));
    }
    line
}

/// Activities grouped under month headers
pub fn activity_listing(range: &CalendarRange, activities: &[Activity]) -> OutgoingMessage {
    let mut text = format!("Activities ({}):\n", range.label());
    if activities.is_empty() {
        text.push_str("no activities found.");
        return OutgoingMessage::html(text);
    }
    let mut current: Option<String> = None;
    for activity in activities {
        let header = activity.started_at.format("%B %Y").to_string();
        if current.as_deref() != Some(header.as_str()) {
            let _ = write!(text, "<b><u>{header}</u></b>\n\n");
            current = Some(header);
        }
        let _ = write!(text, "{}\n\n", activity_line(activity));
    }
    OutgoingMessage::html(text.trim_end().to_string())
}

/// Activity details with one button per editable field
pub fn activity_editor(activity: &Activity) -> OutgoingMessage {
    let button = |label: &str, field: ActivityField| {
        Button::new(
            label,
            Route::ActivityEdit {
                field,
                activity_id: activity.id,
            },
        )
    };
    OutgoingMessage::html(format!(
        "{}\n\nChoose a field to update:",
        activity_line(activity)
    ))
    .with_keyboard(Keyboard::new(vec![
        vec![
            button("Name", ActivityField::Name),
            button("Start Time", ActivityField::StartedAt),
            button("Org", ActivityField::Org),
        ],
        vec![
            button("Lead", ActivityField::Lead),
            button("Co-Leads", ActivityField::CoLeads),
        ],
    ]))
}
