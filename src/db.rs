//! Database module for pollplan
//!
//! Provides persistence for polls, votes and workplan activities.

mod schema;

pub use schema::*;

use crate::ledger::{ActorIdentity, VoteEffect};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Event not found: {0}")]
    EventNotFound(String),
    #[error("Activity not found: {0}")]
    ActivityNotFound(i64),
}

pub type DbResult<T> = Result<T, DbError>;

const EVENT_COLUMNS: &str = "id, description, options, chat_id, message_id, created_by, created_by_id, started_at, created_at, updated_at";
const ACTIVITY_COLUMNS: &str = "id, name, org, lead, co_leads, started_at, created_by, created_by_id, created_at, updated_at";

/// Options column separator
const OPTION_SEPARATOR: char = ';';
/// Co-leads column separator
const CO_LEAD_SEPARATOR: char = ',';

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Apply pending migrations in one transaction, gated by `PRAGMA user_version`
    fn run_migrations(&self) -> DbResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current >= TARGET_VERSION {
            if current > TARGET_VERSION {
                tracing::warn!(
                    current,
                    expected = TARGET_VERSION,
                    "Database schema is newer than this binary"
                );
            }
            return Ok(());
        }

        let tx = conn.transaction()?;
        let skip = usize::try_from(current).unwrap_or(0);
        for (idx, steps) in MIGRATIONS.iter().enumerate().skip(skip) {
            for step in *steps {
                apply_step(&tx, *step)?;
            }
            tracing::info!(version = idx + 1, "Applied schema migration");
        }
        tx.execute_batch(&format!("PRAGMA user_version = {TARGET_VERSION}"))?;
        tx.commit()?;
        Ok(())
    }

    /// Current `PRAGMA user_version`
    #[allow(dead_code)] // Used in tests
    pub fn schema_version(&self) -> DbResult<i32> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    // ==================== Event Operations ====================

    /// Insert a new event, returning its id
    pub fn insert_event(&self, event: &Event) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO events (description, options, chat_id, message_id, created_by, created_by_id,
                                 started_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            params![
                event.description,
                event.options.join(&OPTION_SEPARATOR.to_string()),
                event.chat_id,
                event.message_id,
                event.created_by,
                event.created_by_id,
                event.started_at.as_ref().map(format_sql_datetime),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Write only the columns named by `update`
    pub fn update_event(&self, id: i64, update: &EventUpdate) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = match update {
            EventUpdate::Description(description) => conn.execute(
                "UPDATE events SET description = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![description, id],
            )?,
            EventUpdate::StartedAt(started_at) => conn.execute(
                "UPDATE events SET started_at = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![started_at.as_ref().map(format_sql_datetime), id],
            )?,
            EventUpdate::Options(options) => conn.execute(
                "UPDATE events SET options = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![options.join(&OPTION_SEPARATOR.to_string()), id],
            )?,
            EventUpdate::Posted {
                chat_id,
                message_id,
            } => conn.execute(
                "UPDATE events SET chat_id = ?1, message_id = ?2, updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?3",
                params![chat_id, message_id, id],
            )?,
        };
        if updated == 0 {
            return Err(DbError::EventNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Get event by ID
    pub fn get_event(&self, id: i64) -> DbResult<Event> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
            params![id],
            event_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::EventNotFound(id.to_string()),
            other => DbError::Sqlite(other),
        })
    }

    /// Get the event whose poll is the given chat message
    pub fn get_event_by_message(&self, chat_id: i64, message_id: i64) -> DbResult<Event> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE chat_id = ?1 AND message_id = ?2
                 ORDER BY id DESC LIMIT 1"
            ),
            params![chat_id, message_id],
            event_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::EventNotFound(format!("{chat_id}/{message_id}"))
            }
            other => DbError::Sqlite(other),
        })
    }

    /// Fetch several events at once; missing ids are skipped
    pub fn get_events_by_ids(&self, ids: &[i64]) -> DbResult<Vec<Event>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; ids.len()].join(",");
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id IN ({placeholders}) ORDER BY id"
        ))?;
        let events = stmt
            .query_map(params_from_iter(ids.iter()), event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    // ==================== Vote Operations ====================

    /// Flip a vote in place, creating it active on first press
    pub fn toggle_vote(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
    ) -> DbResult<VoteEffect> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        reconcile_identity(&tx, event_id, identity)?;
        let deleted: bool = tx.query_row(
            "INSERT INTO event_users (event_id, user, user_id, option, deleted)
             VALUES (?1, ?2, ?3, ?4, 0)
             ON CONFLICT(event_id, user_id, user, option) DO UPDATE SET deleted = NOT deleted
             RETURNING deleted",
            params![event_id, identity.user, identity.user_id, option],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(VoteEffect::from_deleted(deleted))
    }

    /// Set a vote to an explicit state
    pub fn set_vote(
        &self,
        event_id: i64,
        option: &str,
        identity: &ActorIdentity,
        active: bool,
    ) -> DbResult<VoteEffect> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        reconcile_identity(&tx, event_id, identity)?;
        let deleted: bool = tx.query_row(
            "INSERT INTO event_users (event_id, user, user_id, option, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(event_id, user_id, user, option) DO UPDATE SET deleted = excluded.deleted
             RETURNING deleted",
            params![event_id, identity.user, identity.user_id, option, !active],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(VoteEffect::from_deleted(deleted))
    }

    /// Active votes for an event, in first-vote order
    pub fn active_votes(&self, event_id: i64) -> DbResult<Vec<VoteRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_id, user, user_id, option, deleted FROM event_users
             WHERE event_id = ?1 AND deleted = 0
             ORDER BY rowid",
        )?;
        let votes = stmt
            .query_map(params![event_id], vote_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(votes)
    }

    /// Active votes cast by an actor, including legacy name-only rows
    pub fn votes_by_actor(&self, identity: &ActorIdentity) -> DbResult<Vec<VoteRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_id, user, user_id, option, deleted FROM event_users
             WHERE deleted = 0
               AND ((?1 != 0 AND user_id = ?1) OR (user_id = 0 AND user = ?2))
             ORDER BY rowid",
        )?;
        let votes = stmt
            .query_map(params![identity.user_id, identity.user], vote_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(votes)
    }

    // ==================== Activity Operations ====================

    /// Insert a new activity, returning its id
    pub fn insert_activity(&self, activity: &Activity) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO activities (name, org, lead, co_leads, started_at, created_by, created_by_id,
                                     created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
            params![
                activity.name,
                activity.org.as_str(),
                activity.lead,
                activity.co_leads.join(&CO_LEAD_SEPARATOR.to_string()),
                format_sql_datetime(&activity.started_at),
                activity.created_by,
                activity.created_by_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite the editable columns of an activity
    pub fn update_activity(&self, activity: &Activity) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE activities
             SET name = ?1, org = ?2, lead = ?3, co_leads = ?4, started_at = ?5,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?6",
            params![
                activity.name,
                activity.org.as_str(),
                activity.lead,
                activity.co_leads.join(&CO_LEAD_SEPARATOR.to_string()),
                format_sql_datetime(&activity.started_at),
                activity.id,
            ],
        )?;
        if updated == 0 {
            return Err(DbError::ActivityNotFound(activity.id));
        }
        Ok(())
    }

    /// Get activity by ID
    pub fn get_activity(&self, id: i64) -> DbResult<Activity> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1"),
            params![id],
            activity_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::ActivityNotFound(id),
            other => DbError::Sqlite(other),
        })
    }

    /// Activities whose start falls in `[start, end]`, oldest first
    pub fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Activity>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities
             WHERE started_at BETWEEN ?1 AND ?2
             ORDER BY started_at ASC, id ASC"
        ))?;
        let activities = stmt
            .query_map(
                params![
                    format_range_bound(&start.naive_utc()),
                    format_range_bound(&end.naive_utc())
                ],
                activity_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(activities)
    }

    /// Delete an activity, returning the number of rows removed
    pub fn delete_activity(&self, id: i64) -> DbResult<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute("DELETE FROM activities WHERE id = ?1", params![id])?)
    }

    /// Activity lookup that maps a missing row to `None`
    pub fn find_activity(&self, id: i64) -> DbResult<Option<Activity>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1"),
                params![id],
                activity_from_row,
            )
            .optional()?)
    }
}

fn apply_step(conn: &Connection, step: MigrationStep) -> DbResult<()> {
    match step {
        MigrationStep::Sql(sql) => conn.execute_batch(sql)?,
        MigrationStep::AddColumn {
            table,
            column,
            decl,
        } => {
            if column_exists(conn, table, column)? {
                tracing::debug!(table, column, "Column already present, skipping");
            } else {
                conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))?;
            }
        }
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}

/// Bind name-only rows to the actor's numeric id, then keep the stored
/// display name current so neither an upgrade nor a rename forks a second row
fn reconcile_identity(
    conn: &Connection,
    event_id: i64,
    identity: &ActorIdentity,
) -> DbResult<()> {
    if !identity.is_numeric() {
        return Ok(());
    }
    let claimed = conn.execute(
        "UPDATE OR IGNORE event_users SET user_id = ?1
         WHERE event_id = ?2 AND user_id = 0 AND user = ?3",
        params![identity.user_id, event_id, identity.user],
    )?;
    if claimed > 0 {
        tracing::debug!(event_id, user_id = identity.user_id, claimed, "Claimed name-only votes");
    }
    conn.execute(
        "UPDATE OR IGNORE event_users SET user = ?1
         WHERE event_id = ?2 AND user_id = ?3 AND user != ?1",
        params![identity.user, event_id, identity.user_id],
    )?;
    Ok(())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let options: Option<String> = row.get(2)?;
    let started_at: Option<String> = row.get(7)?;
    Ok(Event {
        id: row.get(0)?,
        description: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        options: options
            .map(|raw| split_list(&raw, OPTION_SEPARATOR))
            .unwrap_or_default(),
        chat_id: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
        message_id: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
        created_by: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        created_by_id: row.get::<_, Option<i64>>(6)?.unwrap_or_default(),
        started_at: started_at.as_deref().and_then(parse_sql_datetime),
        created_at: stored_datetime(row, 8)?,
        updated_at: stored_datetime(row, 9)?,
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    let org: String = row.get(2)?;
    let co_leads: Option<String> = row.get(4)?;
    Ok(Activity {
        id: row.get(0)?,
        name: row.get(1)?,
        org: Org::parse(&org).unwrap_or_default(),
        lead: row.get(3)?,
        co_leads: co_leads
            .map(|raw| split_list(&raw, CO_LEAD_SEPARATOR))
            .unwrap_or_default(),
        started_at: stored_datetime(row, 5)?,
        created_by: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        created_by_id: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
        created_at: stored_datetime(row, 8)?,
        updated_at: stored_datetime(row, 9)?,
    })
}

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<VoteRecord> {
    Ok(VoteRecord {
        event_id: row.get(0)?,
        user: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        user_id: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
        option: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        active: !row.get::<_, Option<bool>>(4)?.unwrap_or(false),
    })
}

/// Timestamp column, falling back to now for unparseable legacy values
fn stored_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw
        .as_deref()
        .and_then(parse_sql_datetime)
        .unwrap_or_else(|| Utc::now().naive_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Actor;
    use chrono::{NaiveDate, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn sample_event(db: &Database) -> Event {
        let mut event = Event::draft();
        event.description = "Standup".to_string();
        event.options = vec!["A".to_string(), "B".to_string()];
        event.chat_id = -100;
        event.created_by = "Ada".to_string();
        event.created_by_id = 42;
        event.id = db.insert_event(&event).unwrap();
        event
    }

    fn sample_activity(name: &str, started_at: NaiveDateTime) -> Activity {
        let mut activity = Activity::draft();
        activity.name = name.to_string();
        activity.org = Org::Peak;
        activity.lead = "Lee".to_string();
        activity.co_leads = vec!["A".to_string(), "B".to_string()];
        activity.started_at = started_at;
        activity.created_by = "Ada".to_string();
        activity.created_by_id = 42;
        activity
    }

    fn vote_rows(db: &Database, event_id: i64) -> i64 {
        let conn = db.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM event_users WHERE event_id = ?1",
            params![event_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_database_is_at_target_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), TARGET_VERSION);
    }

    #[test]
    fn test_reopen_does_not_rerun_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.db");
        {
            let db = Database::open(&path).unwrap();
            sample_event(&db);
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), TARGET_VERSION);
        assert_eq!(db.get_event(1).unwrap().description, "Standup");
    }

    fn write_legacy_database(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE events (
                id INTEGER PRIMARY KEY AUTOINCREMENT, description TEXT, options TEXT,
                chat_id INTEGER, message_id INTEGER, created_by TEXT, created_by_id,
                started_at DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP);
             CREATE TABLE event_users (
                event_id INTEGER, user TEXT, user_id INTEGER, option TEXT,
                deleted BOOLEAN DEFAULT FALSE);
             CREATE UNIQUE INDEX idx_event_users ON event_users (event_id, user, option);
             CREATE TABLE activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, org TEXT NOT NULL,
                lead TEXT NOT NULL, co_leads TEXT, started_at DATETIME NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP);
             INSERT INTO events (description, options, chat_id, message_id, created_by)
                VALUES ('Old poll', 'Yes;No', -1, 10, 'Bob');
             INSERT INTO event_users (event_id, user, user_id, option, deleted)
                VALUES (1, 'Bob', NULL, 'Yes', NULL);
             INSERT INTO activities (name, org, lead, co_leads, started_at)
                VALUES ('Hike', 'CC', 'Lee', 'A,B', '2024-03-15 19:30:00');",
        )
        .unwrap();
    }

    #[test]
    fn test_migrates_legacy_name_keyed_votes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        write_legacy_database(&path);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), TARGET_VERSION);

        let votes = db.active_votes(1).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].user_id, 0);
        assert_eq!(votes[0].user, "Bob");

        // Conflict target is now the widened identity
        let bob = ActorIdentity::resolve(&Actor::new(0, "Bob", None));
        assert_eq!(
            db.toggle_vote(1, "Yes", &bob).unwrap(),
            VoteEffect::NowInactive
        );
        assert_eq!(vote_rows(&db, 1), 1);

        let activity = db.get_activity(1).unwrap();
        assert_eq!(activity.created_by, "S");
        assert_eq!(activity.created_by_id, 0);
        assert_eq!(activity.co_leads, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_numeric_actor_claims_legacy_vote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        write_legacy_database(&path);
        let db = Database::open(&path).unwrap();

        let bob = ActorIdentity::resolve(&Actor::new(7, "Bob", None));
        assert_eq!(
            db.toggle_vote(1, "Yes", &bob).unwrap(),
            VoteEffect::NowInactive
        );
        assert!(db.active_votes(1).unwrap().is_empty());
        assert_eq!(vote_rows(&db, 1), 1);

        assert!(db.set_vote(1, "Yes", &bob, true).unwrap().is_active());
        let votes = db.active_votes(1).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!((votes[0].user.as_str(), votes[0].user_id), ("Bob", 7));
    }

    #[test]
    fn test_claim_leaves_other_names_alone() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let anon = ActorIdentity::resolve(&Actor::new(0, "Carol", None));
        db.toggle_vote(event.id, "A", &anon).unwrap();

        let bob = ActorIdentity::resolve(&Actor::new(7, "Bob", None));
        assert!(db.toggle_vote(event.id, "A", &bob).unwrap().is_active());
        let votes = db.active_votes(event.id).unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].user_id, 0);
        assert_eq!(votes[1].user_id, 7);
    }

    #[test]
    fn test_add_column_skips_existing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE activities (
                    id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, org TEXT NOT NULL,
                    lead TEXT NOT NULL, co_leads TEXT, started_at DATETIME NOT NULL,
                    created_by TEXT DEFAULT 'S',
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP);",
            )
            .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), TARGET_VERSION);
    }

    #[test]
    fn test_event_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        db.update_event(event.id, &EventUpdate::StartedAt(Some(at(2024, 3, 15, 19, 30))))
            .unwrap();
        db.update_event(
            event.id,
            &EventUpdate::Posted {
                chat_id: -100,
                message_id: 77,
            },
        )
        .unwrap();

        let loaded = db.get_event(event.id).unwrap();
        assert_eq!(loaded.description, "Standup");
        assert_eq!(loaded.options, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(loaded.started_at, Some(at(2024, 3, 15, 19, 30)));
        assert_eq!(loaded.created_by_id, 42);

        let by_message = db.get_event_by_message(-100, 77).unwrap();
        assert_eq!(by_message.id, event.id);
    }

    #[test]
    fn test_event_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_event(99), Err(DbError::EventNotFound(_))));
        assert!(matches!(
            db.get_event_by_message(1, 2),
            Err(DbError::EventNotFound(_))
        ));
        assert!(matches!(
            db.update_event(99, &EventUpdate::Description("x".into())),
            Err(DbError::EventNotFound(_))
        ));
    }

    #[test]
    fn test_message_lookup_is_scoped_to_chat() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let posted = EventUpdate::Posted {
            chat_id: -100,
            message_id: 5,
        };
        db.update_event(event.id, &posted).unwrap();
        assert!(db.get_event_by_message(-100, 5).is_ok());
        assert!(db.get_event_by_message(-200, 5).is_err());
    }

    #[test]
    fn test_field_update_keeps_posted_message() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let posted = EventUpdate::Posted {
            chat_id: -100,
            message_id: 9,
        };
        db.update_event(event.id, &posted).unwrap();

        // `event` still carries the pre-send message id
        assert_eq!(event.message_id, 0);
        db.update_event(event.id, &EventUpdate::Description("Retro".into()))
            .unwrap();
        db.update_event(event.id, &EventUpdate::Options(vec!["A".into()]))
            .unwrap();

        let loaded = db.get_event_by_message(-100, 9).unwrap();
        assert_eq!(loaded.description, "Retro");
        assert_eq!(loaded.options, vec!["A".to_string()]);
        assert_eq!(loaded.created_by_id, 42);
    }

    #[test]
    fn test_toggle_twice_restores_state_with_one_row() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let ada = ActorIdentity::resolve(&Actor::new(42, "Ada", None));

        assert_eq!(db.toggle_vote(event.id, "A", &ada).unwrap(), VoteEffect::NowActive);
        assert_eq!(db.active_votes(event.id).unwrap().len(), 1);
        assert_eq!(
            db.toggle_vote(event.id, "A", &ada).unwrap(),
            VoteEffect::NowInactive
        );
        assert!(db.active_votes(event.id).unwrap().is_empty());
        assert_eq!(vote_rows(&db, event.id), 1);

        assert_eq!(db.toggle_vote(event.id, "A", &ada).unwrap(), VoteEffect::NowActive);
        assert_eq!(vote_rows(&db, event.id), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_keep_one_row() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let ada = ActorIdentity::resolve(&Actor::new(42, "Ada", None));

        for (option, presses) in [("A", 7_u32), ("B", 8)] {
            let handles: Vec<_> = (0..presses)
                .map(|_| {
                    let db = db.clone();
                    let ada = ada.clone();
                    tokio::task::spawn_blocking(move || db.toggle_vote(event.id, option, &ada))
                })
                .collect();
            let mut activations = 0;
            for handle in handles {
                if handle.await.unwrap().unwrap().is_active() {
                    activations += 1;
                }
            }
            // Presses serialize, so results alternate starting with active
            assert_eq!(activations, presses.div_ceil(2));
        }

        assert_eq!(vote_rows(&db, event.id), 2);
        let active = db.active_votes(event.id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].option, "A");
    }

    #[test]
    fn test_set_vote_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let ada = ActorIdentity::resolve(&Actor::new(42, "Ada", None));

        assert!(db.set_vote(event.id, "B", &ada, true).unwrap().is_active());
        assert!(db.set_vote(event.id, "B", &ada, true).unwrap().is_active());
        assert_eq!(vote_rows(&db, event.id), 1);
        assert!(!db.set_vote(event.id, "B", &ada, false).unwrap().is_active());
        assert!(!db.set_vote(event.id, "B", &ada, false).unwrap().is_active());
        assert!(db.active_votes(event.id).unwrap().is_empty());
    }

    #[test]
    fn test_rename_does_not_fork_row() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let before = ActorIdentity::resolve(&Actor::new(42, "Ada", None));
        let after = ActorIdentity::resolve(&Actor::new(42, "Ada", Some("L".into())));

        db.toggle_vote(event.id, "A", &before).unwrap();
        assert_eq!(
            db.toggle_vote(event.id, "A", &after).unwrap(),
            VoteEffect::NowInactive
        );
        assert_eq!(vote_rows(&db, event.id), 1);

        db.toggle_vote(event.id, "A", &after).unwrap();
        let votes = db.active_votes(event.id).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].user, "Ada L");
    }

    #[test]
    fn test_anonymous_identities_are_separate_by_name() {
        let db = Database::open_in_memory().unwrap();
        let event = sample_event(&db);
        let a = ActorIdentity::resolve(&Actor::new(0, "Anon", None));
        let b = ActorIdentity::resolve(&Actor::new(0, "Other", None));
        db.toggle_vote(event.id, "A", &a).unwrap();
        db.toggle_vote(event.id, "A", &b).unwrap();
        assert_eq!(db.active_votes(event.id).unwrap().len(), 2);
    }

    #[test]
    fn test_votes_by_actor() {
        let db = Database::open_in_memory().unwrap();
        let first = sample_event(&db);
        let second = sample_event(&db);
        let ada = ActorIdentity::resolve(&Actor::new(42, "Ada", None));
        let bob = ActorIdentity::resolve(&Actor::new(7, "Bob", None));

        db.toggle_vote(first.id, "A", &ada).unwrap();
        db.toggle_vote(second.id, "B", &ada).unwrap();
        db.toggle_vote(second.id, "B", &ada).unwrap();
        db.toggle_vote(second.id, "A", &bob).unwrap();

        let votes = db.votes_by_actor(&ada).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].event_id, first.id);

        let events = db.get_events_by_ids(&[first.id, second.id, 999]).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_activity_crud() {
        let db = Database::open_in_memory().unwrap();
        let mut activity = sample_activity("Hike", at(2024, 3, 15, 8, 0));
        activity.id = db.insert_activity(&activity).unwrap();

        activity.name = "Long hike".to_string();
        activity.org = Org::Cc;
        db.update_activity(&activity).unwrap();

        let loaded = db.get_activity(activity.id).unwrap();
        assert_eq!(loaded.name, "Long hike");
        assert_eq!(loaded.org, Org::Cc);
        assert_eq!(loaded.created_by_id, 42);
        assert_eq!(loaded.started_at, at(2024, 3, 15, 8, 0));

        assert_eq!(db.delete_activity(activity.id).unwrap(), 1);
        assert_eq!(db.delete_activity(activity.id).unwrap(), 0);
        assert!(db.find_activity(activity.id).unwrap().is_none());
        assert!(matches!(
            db.get_activity(activity.id),
            Err(DbError::ActivityNotFound(_))
        ));
    }

    #[test]
    fn test_activities_between_is_inclusive_of_final_day() {
        let db = Database::open_in_memory().unwrap();
        for (name, when) in [
            ("Jan", at(2024, 1, 31, 23, 59)),
            ("Start", at(2024, 2, 1, 0, 0)),
            ("Leap", at(2024, 2, 29, 23, 59)),
            ("Mar", at(2024, 3, 1, 0, 0)),
        ] {
            db.insert_activity(&sample_activity(name, when)).unwrap();
        }

        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() - chrono::Duration::nanoseconds(1);
        let names: Vec<_> = db
            .activities_between(start, end)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Start".to_string(), "Leap".to_string()]);
    }
}
