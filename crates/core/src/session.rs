//! Conversation sessions.
//!
//! A session owns one working context. Sessions share nothing mutable with
//! each other, so independent conversations can be driven concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::WorkingContext;

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation: its id, its working context, and how many turns it has run.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub context: WorkingContext,
    pub turns: u64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            context: WorkingContext::new(),
            turns: 0,
            created_at: Utc::now(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_get_distinct_ids() {
        let a = Session::new();
        let b = Session::new();
        assert_ne!(a.id, b.id);
        assert!(a.context.is_empty());
        assert_eq!(a.turns, 0);
    }

    #[test]
    fn session_id_display() {
        assert_eq!(SessionId::from("abc").to_string(), "abc");
    }
}
