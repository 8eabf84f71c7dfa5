//! Session repository trait.
//!
//! Defines the interface the runtime uses to read and write session documents.

use async_trait::async_trait;

use super::model::{SessionKey, SessionSnapshot};
use super::progress::ProgressUpdate;
use crate::error::Result;

/// An abstract keyed document store for session data.
///
/// The runtime is the only writer of a given session, so implementations need
/// no cross-client locking; last write wins at the field level.
///
/// # Implementation Notes
///
/// - `write_progress` must be idempotent and must leave omitted fields intact
/// - `mark_completed` must only change the status fields of the document
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(SessionSnapshot))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>>;

    /// Saves a whole session document, creating it if needed.
    async fn save(&self, session: &SessionSnapshot) -> Result<()>;

    /// Applies a partial progress write to an existing session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session does not exist.
    async fn write_progress(&self, key: &SessionKey, update: &ProgressUpdate) -> Result<()>;

    /// Marks an existing session as completed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session does not exist.
    async fn mark_completed(&self, key: &SessionKey) -> Result<()>;

    /// Lists the sessions of a project, most recently updated first.
    async fn list_by_project(&self, project_id: &str) -> Result<Vec<SessionSnapshot>>;

    /// Deletes a session (no error if it didn't exist).
    async fn delete(&self, key: &SessionKey) -> Result<()>;
}
