//! Database schema, migrations and record types

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage format for naive local timestamps (`started_at`)
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One schema change applied by a migration
#[derive(Debug, Clone, Copy)]
pub enum MigrationStep {
    /// Batch of SQL statements
    Sql(&'static str),
    /// Add a column unless it already exists (older databases may carry it)
    AddColumn {
        table: &'static str,
        column: &'static str,
        decl: &'static str,
    },
}

/// Forward-only migrations. Index `i` upgrades `user_version` from `i` to `i + 1`.
pub const MIGRATIONS: &[&[MigrationStep]] = &[
    // v1: base tables, as first shipped
    &[
        MigrationStep::Sql(
            r"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT,
    options TEXT,
    chat_id INTEGER,
    message_id INTEGER,
    created_by TEXT,
    created_by_id INTEGER,
    started_at DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS event_users (
    event_id INTEGER,
    user TEXT,
    user_id INTEGER,
    option TEXT,
    deleted BOOLEAN DEFAULT FALSE,
    FOREIGN KEY(event_id) REFERENCES events(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_event_users_name ON event_users (event_id, user, option);

CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    org TEXT NOT NULL,
    lead TEXT NOT NULL,
    co_leads TEXT,
    started_at DATETIME NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
",
        ),
        MigrationStep::AddColumn {
            table: "activities",
            column: "created_by",
            decl: "TEXT DEFAULT 'S'",
        },
    ],
    // v2: vote identity widened to (event_id, user_id, user, option)
    &[MigrationStep::Sql(
        r"
UPDATE event_users SET user_id = 0 WHERE user_id IS NULL;
UPDATE event_users SET deleted = 0 WHERE deleted IS NULL;
DELETE FROM event_users WHERE rowid NOT IN (
    SELECT MAX(rowid) FROM event_users GROUP BY event_id, user_id, user, option
);
DROP INDEX IF EXISTS idx_event_users_name;
DROP INDEX IF EXISTS idx_event_users;
CREATE UNIQUE INDEX idx_event_users ON event_users (event_id, user_id, user, option);
",
    )],
    // v3: numeric creator id on activities, lookup indexes
    &[
        MigrationStep::AddColumn {
            table: "activities",
            column: "created_by_id",
            decl: "INTEGER DEFAULT 0",
        },
        MigrationStep::Sql(
            r"
CREATE INDEX IF NOT EXISTS idx_activities_started_at ON activities (started_at);
CREATE INDEX IF NOT EXISTS idx_events_message ON events (chat_id, message_id);
",
        ),
    ],
];

/// Schema version the binary expects
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const TARGET_VERSION: i32 = MIGRATIONS.len() as i32;

/// Poll record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub description: String,
    pub options: Vec<String>,
    pub chat_id: i64,
    pub message_id: i64,
    pub created_by: String,
    pub created_by_id: i64,
    /// Naive local time, as typed by the creator
    pub started_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Event {
    pub const DEFAULT_OPTION: &'static str = "Available";

    /// Fresh draft for the create flow, seeded with the default option
    pub fn draft() -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: 0,
            description: String::new(),
            options: vec![Self::DEFAULT_OPTION.to_string()],
            chat_id: 0,
            message_id: 0,
            created_by: String::new(),
            created_by_id: 0,
            started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remove the first option equal to `option`, ignoring case
    pub fn remove_option(&mut self, option: &str) -> bool {
        match self
            .options
            .iter()
            .position(|o| o.to_lowercase() == option.to_lowercase())
        {
            Some(idx) => {
                self.options.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options
            .iter()
            .any(|o| o.to_lowercase() == option.to_lowercase())
    }
}

/// Change to one column group of a stored event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventUpdate {
    Description(String),
    StartedAt(Option<NaiveDateTime>),
    Options(Vec<String>),
    /// Where the poll is currently posted
    Posted { chat_id: i64, message_id: i64 },
}

/// Organizing committee of a workplan activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Org {
    #[default]
    Cc,
    Peak,
}

impl Org {
    pub const ALL: [Org; 2] = [Org::Cc, Org::Peak];

    pub fn as_str(self) -> &'static str {
        match self {
            Org::Cc => "CC",
            Org::Peak => "PEAK",
        }
    }

    /// Exact match against the upper-cased input
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_uppercase();
        Self::ALL.into_iter().find(|org| org.as_str() == normalized)
    }

    /// `CC, PEAK`
    pub fn listing() -> String {
        Self::ALL
            .iter()
            .map(|org| org.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Org {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workplan entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub org: Org,
    pub lead: String,
    pub co_leads: Vec<String>,
    pub started_at: NaiveDateTime,
    pub created_by: String,
    pub created_by_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Activity {
    pub fn draft() -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: 0,
            name: String::new(),
            org: Org::default(),
            lead: String::new(),
            co_leads: Vec::new(),
            started_at: now,
            created_by: String::new(),
            created_by_id: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One ledger row as read back for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteRecord {
    pub event_id: i64,
    pub user: String,
    pub user_id: i64,
    pub option: String,
    pub active: bool,
}

/// Format a naive timestamp for storage
pub fn format_sql_datetime(value: &NaiveDateTime) -> String {
    value.format(SQL_DATETIME_FORMAT).to_string()
}

/// Format a range bound so it compares correctly against stored text.
///
/// Fractional seconds are appended only when present, since
/// `"... 00:00:00" < "... 00:00:00.000000000"` lexicographically.
pub fn format_range_bound(value: &NaiveDateTime) -> String {
    if value.and_utc().timestamp_subsec_nanos() == 0 {
        format_sql_datetime(value)
    } else {
        value.format("%Y-%m-%d %H:%M:%S%.9f").to_string()
    }
}

/// Parse a stored timestamp.
///
/// Older rows may carry a `T` separator, fractional seconds or a zone suffix;
/// only the leading `YYYY-MM-DD HH:MM:SS` is significant.
pub fn parse_sql_datetime(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.trim().replacen('T', " ", 1);
    let head = normalized.get(..19).unwrap_or(&normalized);
    NaiveDateTime::parse_from_str(head, SQL_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M"))
        .ok()
}

/// Split a joined list column, dropping empty parts
pub fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}
