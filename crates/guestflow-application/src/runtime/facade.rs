//! Runtime façade.
//!
//! The legality layer rendering code talks to. Navigation that the state
//! machine forbids is rejected with `IllegalOperation`; sync failures go to
//! the orchestrator's error callback and never fail navigation, except for
//! completion, where the guest must not be told they are done while their
//! answers failed to save.

use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::experience::{MediaAsset, Response, ResponseValue, Step};
use guestflow_core::runtime::{
    RuntimePhase, RuntimeSnapshot, SharedRuntimeStore, read_store, write_store,
};
use guestflow_core::session::{SessionKey, SessionSnapshot, SessionStatus};
use guestflow_core::validation::ValidationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sync::SyncOrchestrator;

/// Result of a successful [`ExperienceRuntime::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum NextOutcome {
    /// The cursor moved to `step_index`. `synced` is false when the
    /// forward-navigation write failed (already reported to the callback).
    Advanced { step_index: usize, synced: bool },
    /// The last step was confirmed and the session is durably completed.
    Completed,
}

enum Move {
    Advanced(usize),
    Completing,
}

/// One guest's attached run through an experience.
pub struct ExperienceRuntime {
    orchestrator: SyncOrchestrator,
    store: SharedRuntimeStore,
}

impl ExperienceRuntime {
    /// Attaches a session to the orchestrator's store.
    ///
    /// A session still marked in progress whose cursor starts at the end
    /// (nothing left to answer) is completed right away. If that completion
    /// fails to sync, the runtime is still returned and
    /// [`retry_completion`](Self::retry_completion) can be used.
    pub async fn attach(
        orchestrator: SyncOrchestrator,
        snapshot: &SessionSnapshot,
        steps: Vec<Step>,
    ) -> Result<Self> {
        let store = orchestrator.store();
        let needs_completion = {
            let mut store = write_store(&store)?;
            store.init_from_session(snapshot, steps);
            let at_end = store.current_step_index() >= store.steps().len();
            if snapshot.status == SessionStatus::InProgress && at_end {
                store.complete();
                true
            } else {
                false
            }
        };

        let runtime = Self {
            orchestrator,
            store,
        };

        if needs_completion {
            tracing::debug!(
                "[ExperienceRuntime] Session {} has nothing left to answer, completing",
                snapshot.key()
            );
            if let Err(e) = runtime.orchestrator.complete().await {
                tracing::warn!("[ExperienceRuntime] Completion on attach failed: {}", e);
            }
        }

        Ok(runtime)
    }

    /// Confirms the current step.
    ///
    /// On the last step this runs the completion protocol instead of
    /// advancing; its sync failure is returned and the guest stays on the
    /// step. Elsewhere the cursor advances and the forward write is awaited.
    pub async fn next(&self) -> Result<NextOutcome> {
        let movement = {
            let mut store = write_store(&self.store)?;
            if store.is_complete() {
                return Err(GuestflowError::illegal("next", "the session is already complete"));
            }
            let validation = store.validation().ok_or_else(|| {
                GuestflowError::illegal("next", "there is no current step")
            })?;
            if !validation.is_valid {
                return Err(GuestflowError::illegal(
                    "next",
                    validation
                        .error
                        .unwrap_or_else(|| "the current step is not valid".to_string()),
                ));
            }

            if store.is_last_step() {
                store.complete();
                Move::Completing
            } else if store.next_step() {
                Move::Advanced(store.current_step_index())
            } else {
                return Err(GuestflowError::illegal("next", "the cursor cannot advance"));
            }
        };

        match movement {
            Move::Completing => {
                self.orchestrator.complete().await?;
                Ok(NextOutcome::Completed)
            }
            Move::Advanced(step_index) => {
                let synced = self.orchestrator.sync_forward().await.is_ok();
                Ok(NextOutcome::Advanced { step_index, synced })
            }
        }
    }

    /// Moves back one step. Never writes.
    pub fn back(&self) -> Result<usize> {
        let mut store = write_store(&self.store)?;
        if !store.can_go_back() {
            return Err(GuestflowError::illegal(
                "back",
                if store.is_complete() {
                    "the session is already complete"
                } else {
                    "already at the first step"
                },
            ));
        }
        store.previous_step();
        Ok(store.current_step_index())
    }

    /// Jumps to a previously reached step. Never writes.
    pub fn go_to_step(&self, index: usize) -> Result<()> {
        let mut store = write_store(&self.store)?;
        let len = store.steps().len();
        if index >= len {
            return Err(GuestflowError::illegal(
                "go_to_step",
                format!("step {} is out of range (0..{})", index, len),
            ));
        }
        if index > store.current_step_index() {
            return Err(GuestflowError::illegal(
                "go_to_step",
                format!(
                    "cannot jump forward from step {} to step {}",
                    store.current_step_index(),
                    index
                ),
            ));
        }
        if !store.go_to_step(index) {
            return Err(GuestflowError::illegal("go_to_step", "the session is already complete"));
        }
        Ok(())
    }

    /// Records a response and schedules the debounced write.
    pub fn set_response(&self, step_id: &str, value: impl Into<ResponseValue>) -> Result<()> {
        write_store(&self.store)?.set_response(step_id, value.into())?;
        self.orchestrator.schedule_response_sync()
    }

    /// Records captured media and writes it immediately.
    ///
    /// Returns whether the write succeeded; a failure is reported to the
    /// error callback and the media stays recorded locally.
    pub async fn set_media(&self, step_id: &str, asset: MediaAsset) -> Result<bool> {
        write_store(&self.store)?.set_captured_media(step_id, asset)?;
        Ok(self.orchestrator.sync_media().await.is_ok())
    }

    /// Re-runs completion after a failed completion sync.
    ///
    /// A no-op once the completion marker is written.
    pub async fn retry_completion(&self) -> Result<()> {
        {
            let store = read_store(&self.store)?;
            if !store.is_complete() {
                return Err(GuestflowError::illegal(
                    "retry_completion",
                    "the session has not reached completion",
                ));
            }
            if store.completion_persisted() {
                return Ok(());
            }
        }
        self.orchestrator.complete().await
    }

    /// Writes any scheduled edit, then returns the store to its unattached
    /// state.
    pub async fn detach(&self) -> Result<()> {
        if let Err(e) = self.orchestrator.flush().await {
            tracing::warn!("[ExperienceRuntime] Flush on detach failed: {}", e);
        }
        write_store(&self.store)?.reset();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn session_key(&self) -> Result<Option<SessionKey>> {
        Ok(read_store(&self.store)?.session_key().cloned())
    }

    pub fn response(&self, step_id: &str) -> Result<Option<Response>> {
        Ok(read_store(&self.store)?.response(step_id).cloned())
    }

    pub fn responses_by_step(&self) -> Result<BTreeMap<String, Response>> {
        Ok(read_store(&self.store)?.responses_by_step())
    }

    pub fn response_values(&self) -> Result<BTreeMap<String, ResponseValue>> {
        Ok(read_store(&self.store)?.response_values())
    }

    pub fn state(&self) -> Result<RuntimeSnapshot> {
        Ok(read_store(&self.store)?.snapshot())
    }

    pub fn phase(&self) -> Result<RuntimePhase> {
        Ok(read_store(&self.store)?.phase())
    }

    pub fn current_step(&self) -> Result<Option<(usize, Step)>> {
        let store = read_store(&self.store)?;
        Ok(store
            .current_step()
            .map(|step| (store.current_step_index(), step.clone())))
    }

    pub fn steps(&self) -> Result<Vec<Step>> {
        Ok(read_store(&self.store)?.steps().to_vec())
    }

    pub fn can_proceed(&self) -> Result<bool> {
        Ok(read_store(&self.store)?.can_proceed())
    }

    pub fn can_go_back(&self) -> Result<bool> {
        Ok(read_store(&self.store)?.can_go_back())
    }

    pub fn has_captured_media(&self, step_id: &str) -> Result<bool> {
        Ok(read_store(&self.store)?.has_captured_media(step_id))
    }

    pub fn validation(&self) -> Result<Option<ValidationResult>> {
        Ok(read_store(&self.store)?.validation())
    }
}

#[cfg(test)]
#[path = "facade_test.rs"]
mod tests;
