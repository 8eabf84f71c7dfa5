//! TOML-based SessionRepository implementation

use async_trait::async_trait;
use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::session::{ProgressUpdate, SessionKey, SessionRepository, SessionSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::storage::AtomicTomlFile;

/// Stores each session as its own TOML document.
///
/// ```text
/// root/
/// └── projects/
///     └── <project_id>/
///         └── sessions/
///             ├── <session_id>.toml
///             └── <session_id>.toml
/// ```
///
/// - **Atomic writes**: tmp file + fsync + rename, so a crash never leaves a
///   half-written session
/// - **Field-level writes**: `write_progress` replaces only the collections
///   the update carries
/// - **Async-safe**: All file I/O runs in `tokio::task::spawn_blocking`
pub struct TomlSessionRepository {
    root_dir: PathBuf,
}

impl TomlSessionRepository {
    /// Creates a repository rooted at `root_dir`. Directories are created on
    /// first write.
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn sessions_dir(&self, project_id: &str) -> Result<PathBuf> {
        ensure_path_segment("project id", project_id)?;
        Ok(self
            .root_dir
            .join("projects")
            .join(project_id)
            .join("sessions"))
    }

    fn session_file(&self, key: &SessionKey) -> Result<AtomicTomlFile<SessionSnapshot>> {
        ensure_path_segment("session id", &key.session_id)?;
        let path = self
            .sessions_dir(&key.project_id)?
            .join(format!("{}.toml", key.session_id));
        Ok(AtomicTomlFile::new(path))
    }

    fn list_sync(dir: &Path) -> Result<Vec<SessionSnapshot>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !is_document(&path) {
                continue;
            }
            match AtomicTomlFile::<SessionSnapshot>::new(path.clone()).load() {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("[TomlSessionRepository] Skipping unreadable session: {}", e)
                }
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

/// Rejects ids that would escape their directory.
fn ensure_path_segment(kind: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.starts_with('.');
    if invalid {
        return Err(GuestflowError::data_access(format!(
            "Invalid {}: '{}'",
            kind, value
        )));
    }
    Ok(())
}

/// True for `*.toml` files that are not temporary siblings.
fn is_document(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    !hidden && path.extension().and_then(|e| e.to_str()) == Some("toml")
}

fn join_error(e: task::JoinError) -> GuestflowError {
    GuestflowError::io(format!("Failed to spawn blocking task: {}", e))
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn find_by_id(&self, key: &SessionKey) -> Result<Option<SessionSnapshot>> {
        let file = self.session_file(key)?;

        task::spawn_blocking(move || file.load().map_err(GuestflowError::from))
            .await
            .map_err(join_error)?
    }

    async fn save(&self, session: &SessionSnapshot) -> Result<()> {
        let file = self.session_file(&session.key())?;
        let session = session.clone();

        task::spawn_blocking(move || file.save(&session).map_err(GuestflowError::from))
            .await
            .map_err(join_error)?
    }

    async fn write_progress(&self, key: &SessionKey, update: &ProgressUpdate) -> Result<()> {
        let file = self.session_file(key)?;
        let update = update.clone();
        let key = key.clone();

        task::spawn_blocking(move || {
            let found = file.update_existing(|session| update.apply_to(session))?;
            if !found {
                return Err(GuestflowError::not_found("Session", key.to_string()));
            }
            tracing::debug!("[TomlSessionRepository] Wrote progress for session {}", key);
            Ok(())
        })
        .await
        .map_err(join_error)?
    }

    async fn mark_completed(&self, key: &SessionKey) -> Result<()> {
        let file = self.session_file(key)?;
        let key = key.clone();

        task::spawn_blocking(move || {
            let found = file.update_existing(SessionSnapshot::mark_completed)?;
            if !found {
                return Err(GuestflowError::not_found("Session", key.to_string()));
            }
            tracing::debug!("[TomlSessionRepository] Marked session {} completed", key);
            Ok(())
        })
        .await
        .map_err(join_error)?
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<SessionSnapshot>> {
        let dir = self.sessions_dir(project_id)?;

        task::spawn_blocking(move || Self::list_sync(&dir))
            .await
            .map_err(join_error)?
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        let file = self.session_file(key)?;

        task::spawn_blocking(move || file.remove().map_err(GuestflowError::from))
            .await
            .map_err(join_error)?
    }
}
