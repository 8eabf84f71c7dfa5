//! Session domain model.
//!
//! A session is one guest's run through one experience. The document store is
//! the system of record for it; the runtime holds a working copy while the
//! guest is attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::experience::{CapturedMedia, Response, Step};

/// Document key of a session: `(project_id, session_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub project_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(project_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.session_id)
    }
}

/// Durable session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Completed,
}

/// Snapshot of a session document as read from or written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub project_id: String,
    pub experience_id: String,
    #[serde(default)]
    pub status: SessionStatus,
    /// Step definitions the session was started with
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub captured_media: Vec<CapturedMedia>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Creates a fresh in-progress session for an experience.
    pub fn new(
        key: SessionKey,
        experience_id: impl Into<String>,
        steps: Vec<Step>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: key.session_id,
            project_id: key.project_id,
            experience_id: experience_id.into(),
            status: SessionStatus::InProgress,
            steps,
            responses: Vec::new(),
            captured_media: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.project_id.clone(), self.session_id.clone())
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Marks the session completed. Repeating the call keeps the first
    /// completion timestamp.
    pub fn mark_completed(&mut self) {
        let now = Utc::now();
        if self.status != SessionStatus::Completed {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(now);
        }
        self.updated_at = now;
    }
}
