//! Read-side views of the runtime store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::experience::{CapturedMedia, Response};
use crate::session::SessionKey;

/// Lifecycle of a store across one session attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimePhase {
    /// No session attached (before init, or after reset).
    Uninitialized,
    /// Attached; the cursor may move.
    Ready,
    /// Attached and complete; the cursor is frozen.
    Complete,
}

/// Cursor and sync status of the attached run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub current_step_index: usize,
    pub is_complete: bool,
    /// True while at least one write to the document store is outstanding
    pub is_syncing: bool,
    /// Time of the last successful write
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            current_step_index: 0,
            is_complete: false,
            is_syncing: false,
            last_synced_at: None,
        }
    }
}

/// Point-in-time copy of everything the store holds, for rendering code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub session: Option<SessionKey>,
    pub phase: RuntimePhase,
    #[serde(flatten)]
    pub state: RuntimeState,
    pub step_count: usize,
    pub responses: Vec<Response>,
    pub captured_media: Vec<CapturedMedia>,
    /// True once the durable completion marker has been written
    pub completion_persisted: bool,
}
