//! Session use case implementation.
//!
//! This module provides the `SessionUseCase` which ties experience lookup,
//! session persistence and runtime construction together for the
//! application shell.

use guestflow_core::config::RuntimeConfig;
use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::experience::ExperienceRepository;
use guestflow_core::session::{SessionKey, SessionRepository, SessionSnapshot};
use std::sync::Arc;
use uuid::Uuid;

use crate::runtime::ExperienceRuntime;
use crate::sync::{CompletionCallback, SyncErrorCallback, SyncOrchestrator};

/// Use case for starting, resuming and running guest sessions.
///
/// # Responsibilities
///
/// - Creating new sessions from published experience definitions
/// - Loading existing sessions for resumption
/// - Building a `SyncOrchestrator` with the configured policy and callbacks
///   and attaching an `ExperienceRuntime` to it
pub struct SessionUseCase {
    /// Repository for published experience definitions
    experience_repository: Arc<dyn ExperienceRepository>,
    /// Repository for session documents
    session_repository: Arc<dyn SessionRepository>,
    /// Debounce and validation policy for new runtimes
    config: RuntimeConfig,
    /// Optional callback for sync failures (for UI notifications)
    sync_error_callback: Option<SyncErrorCallback>,
    /// Optional callback for durable completion
    completion_callback: Option<CompletionCallback>,
}

impl SessionUseCase {
    /// Creates a new `SessionUseCase` instance.
    pub fn new(
        experience_repository: Arc<dyn ExperienceRepository>,
        session_repository: Arc<dyn SessionRepository>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            experience_repository,
            session_repository,
            config,
            sync_error_callback: None,
            completion_callback: None,
        }
    }

    /// Sets the callback passed to every runtime's orchestrator for failed writes.
    pub fn with_sync_error_callback(mut self, callback: SyncErrorCallback) -> Self {
        self.sync_error_callback = Some(callback);
        self
    }

    /// Sets the callback passed to every runtime's orchestrator for completion.
    pub fn with_completion_callback(mut self, callback: CompletionCallback) -> Self {
        self.completion_callback = Some(callback);
        self
    }

    /// Starts a new in-progress session of an experience.
    ///
    /// The experience's steps are copied into the session document, so a
    /// later republish does not change a running session.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the experience does not exist
    /// - `IllegalOperation` if it belongs to another project
    /// - `InvalidDefinition` if its step list is malformed
    pub async fn start_session(
        &self,
        project_id: &str,
        experience_id: &str,
    ) -> Result<SessionSnapshot> {
        let experience = self
            .experience_repository
            .find_by_id(experience_id)
            .await?
            .ok_or_else(|| GuestflowError::not_found("Experience", experience_id))?;

        if experience.project_id != project_id {
            return Err(GuestflowError::illegal(
                "start_session",
                format!(
                    "experience '{}' belongs to project '{}', not '{}'",
                    experience.id, experience.project_id, project_id
                ),
            ));
        }
        experience.validate_definition()?;

        let key = SessionKey::new(project_id, Uuid::new_v4().to_string());
        let session = SessionSnapshot::new(key, experience.id.clone(), experience.steps.clone());
        self.session_repository.save(&session).await?;

        tracing::info!(
            "[SessionUseCase] Started session {} for experience '{}' ({} steps)",
            session.key(),
            experience.id,
            session.steps.len()
        );
        Ok(session)
    }

    /// Loads an existing session for resumption.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session does not exist.
    pub async fn resume_session(&self, key: &SessionKey) -> Result<SessionSnapshot> {
        let session = self
            .session_repository
            .find_by_id(key)
            .await?
            .ok_or_else(|| GuestflowError::not_found("Session", key.to_string()))?;

        tracing::debug!(
            "[SessionUseCase] Resuming session {} ({} responses recorded)",
            key,
            session.responses.len()
        );
        Ok(session)
    }

    /// Lists the sessions of a project.
    pub async fn list_sessions(&self, project_id: &str) -> Result<Vec<SessionSnapshot>> {
        self.session_repository.list_by_project(project_id).await
    }

    /// Builds an orchestrator for the session and attaches a runtime to it.
    pub async fn open_runtime(&self, session: &SessionSnapshot) -> Result<ExperienceRuntime> {
        let mut orchestrator =
            SyncOrchestrator::new(self.session_repository.clone(), &self.config)?;
        if let Some(callback) = &self.sync_error_callback {
            orchestrator = orchestrator.with_error_callback(callback.clone());
        }
        if let Some(callback) = &self.completion_callback {
            orchestrator = orchestrator.with_completion_callback(callback.clone());
        }

        ExperienceRuntime::attach(orchestrator, session, session.steps.clone()).await
    }
}
