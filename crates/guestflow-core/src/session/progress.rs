//! Progress writes and the events that trigger them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::SessionSnapshot;
use crate::experience::{CapturedMedia, Response};

/// Why a write to the document store was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// The guest advanced to the next step.
    ForwardNavigation,
    /// Debounced write after response edits went quiet.
    ResponseEdit,
    /// Media was captured; pushed without debounce.
    MediaCapture,
    /// Final push preceding the completion marker.
    Completion,
    /// A pending debounced write forced out early (detach).
    Flush,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::ForwardNavigation => "forward_navigation",
            SyncTrigger::ResponseEdit => "response_edit",
            SyncTrigger::MediaCapture => "media_capture",
            SyncTrigger::Completion => "completion",
            SyncTrigger::Flush => "flush",
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial write of a session's collected data.
///
/// A `None` field leaves the stored collection unchanged. Collections are
/// always sent whole, so applying the same update twice yields the same
/// document as applying it once, and the later of two racing writes never
/// carries stale entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Response>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_media: Option<Vec<CapturedMedia>>,
}

impl ProgressUpdate {
    pub fn is_empty(&self) -> bool {
        self.responses.is_none() && self.captured_media.is_none()
    }

    /// Applies the update to a stored session document.
    pub fn apply_to(&self, session: &mut SessionSnapshot) {
        if self.is_empty() {
            return;
        }
        if let Some(responses) = &self.responses {
            session.responses = responses.clone();
        }
        if let Some(media) = &self.captured_media {
            session.captured_media = media.clone();
        }
        session.updated_at = Utc::now();
    }
}
