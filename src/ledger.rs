//! Vote ledger identity and outcomes
//!
//! A vote is keyed by (event, option, identity). The identity is the actor's
//! numeric id when the platform supplies one; otherwise the display name with
//! id 0. Rows are never hard-deleted: a toggle flips the soft `deleted` flag.

use serde::{Deserialize, Serialize};

/// Sender of a message or button press
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Actor {
    pub fn new(id: i64, first_name: impl Into<String>, last_name: Option<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name,
        }
    }

    /// `first` or `first last`
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }

    /// Creator check: numeric id when the record has one, display name otherwise
    pub fn owns(&self, created_by: &str, created_by_id: i64) -> bool {
        if created_by_id != 0 {
            return self.id == created_by_id;
        }
        self.display_name() == created_by
    }
}

/// Ledger identity of an actor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActorIdentity {
    pub user_id: i64,
    pub user: String,
}

impl ActorIdentity {
    pub fn resolve(actor: &Actor) -> Self {
        Self {
            user_id: actor.id,
            user: actor.display_name(),
        }
    }

    /// Identity backed by a numeric id, stable across renames
    pub fn is_numeric(&self) -> bool {
        self.user_id != 0
    }
}

/// State of a vote after a ledger mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoteEffect {
    NowActive,
    NowInactive,
}

impl VoteEffect {
    /// Map the stored soft-delete flag
    pub fn from_deleted(deleted: bool) -> Self {
        if deleted {
            VoteEffect::NowInactive
        } else {
            VoteEffect::NowActive
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, VoteEffect::NowActive)
    }
}
