//! Test doubles shared by the application unit tests.

use async_trait::async_trait;
use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::session::{ProgressUpdate, SessionKey, SessionRepository, SessionSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One call made against the repository.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedWrite {
    Progress(SessionKey, ProgressUpdate),
    MarkCompleted(SessionKey),
}

/// In-memory session repository that records writes and can be told to fail.
#[derive(Default)]
pub struct RecordingSessionRepository {
    sessions: Mutex<HashMap<SessionKey, SessionSnapshot>>,
    writes: Mutex<Vec<RecordedWrite>>,
    fail_progress: AtomicBool,
    fail_completion: AtomicBool,
    /// While set, `write_progress` waits for a notification before writing
    progress_gate: Mutex<Option<Arc<Notify>>>,
}

impl RecordingSessionRepository {
    pub fn with_session(session: SessionSnapshot) -> Self {
        let repo = Self::default();
        repo.sessions
            .lock()
            .unwrap()
            .insert(session.key(), session);
        repo
    }

    pub fn fail_progress(&self, fail: bool) {
        self.fail_progress.store(fail, Ordering::SeqCst);
    }

    pub fn fail_completion(&self, fail: bool) {
        self.fail_completion.store(fail, Ordering::SeqCst);
    }

    /// Holds every later progress write until the returned gate is notified.
    pub fn hold_progress(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.progress_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn progress_writes(&self) -> Vec<ProgressUpdate> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                RecordedWrite::Progress(_, update) => Some(update),
                RecordedWrite::MarkCompleted(_) => None,
            })
            .collect()
    }

    pub fn completion_marks(&self) -> usize {
        self.writes()
            .iter()
            .filter(|w| matches!(w, RecordedWrite::MarkCompleted(_)))
            .count()
    }

    pub fn stored(&self, key: &SessionKey) -> Option<SessionSnapshot> {
        self.sessions.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl SessionRepository for RecordingSessionRepository {
    async fn find_by_id(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>> {
        Ok(self.sessions.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, session: &SessionSnapshot) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.key(), session.clone());
        Ok(())
    }

    async fn write_progress(&self, key: &SessionKey, update: &ProgressUpdate) -> Result<()> {
        let gate = self.progress_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_progress.load(Ordering::SeqCst) {
            return Err(GuestflowError::data_access("connection reset"));
        }
        self.writes
            .lock()
            .unwrap()
            .push(RecordedWrite::Progress(key.clone(), update.clone()));

        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| GuestflowError::not_found("Session", key.to_string()))?;
        update.apply_to(session);
        Ok(())
    }

    async fn mark_completed(&self, key: &SessionKey) -> Result<()> {
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(GuestflowError::data_access("connection reset"));
        }
        self.writes
            .lock()
            .unwrap()
            .push(RecordedWrite::MarkCompleted(key.clone()));

        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(key)
            .ok_or_else(|| GuestflowError::not_found("Session", key.to_string()))?;
        session.mark_completed();
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<SessionSnapshot>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        self.sessions.lock().unwrap().remove(key);
        Ok(())
    }
}
