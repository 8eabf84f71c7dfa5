//! In-memory SessionRepository implementation.

use async_trait::async_trait;
use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::session::{ProgressUpdate, SessionKey, SessionRepository, SessionSnapshot};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps session documents in process memory.
///
/// Used for ephemeral runs where nothing should survive the process, and as
/// a stand-in store in tests.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionKey, SessionSnapshot>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn save(&self, session: &SessionSnapshot) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.key(), session.clone());
        Ok(())
    }

    async fn write_progress(&self, key: &SessionKey, update: &ProgressUpdate) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| GuestflowError::not_found("Session", key.to_string()))?;
        update.apply_to(session);
        Ok(())
    }

    async fn mark_completed(&self, key: &SessionKey) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| GuestflowError::not_found("Session", key.to_string()))?;
        session.mark_completed();
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<SessionSnapshot>> {
        let mut sessions: Vec<SessionSnapshot> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        self.sessions.write().await.remove(key);
        Ok(())
    }
}
