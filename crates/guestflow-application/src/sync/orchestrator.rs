//! Sync orchestrator.
//!
//! Turns local runtime mutations into writes against the session document
//! store. Each trigger has its own policy:
//!
//! | Trigger              | Payload                 | Timing                      |
//! |----------------------|-------------------------|-----------------------------|
//! | forward navigation   | responses + media       | immediate, awaited          |
//! | response edit        | responses               | debounced, latest edit wins |
//! | media capture        | media                   | immediate, awaited          |
//! | completion           | responses + media, then | awaited, strictly ordered   |
//! |                      | the completion marker   |                             |
//!
//! Every payload is read from the store at the moment the write fires, so a
//! later write never carries older data than an earlier one.

use chrono::Utc;
use guestflow_core::config::RuntimeConfig;
use guestflow_core::error::{GuestflowError, Result};
use guestflow_core::runtime::{RuntimeStore, SharedRuntimeStore, read_store, write_store};
use guestflow_core::session::{SessionKey, SessionRepository, SyncTrigger};
use guestflow_core::validation::StepValidator;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// A failed write, as reported to the error callback.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub session: SessionKey,
    pub trigger: SyncTrigger,
    /// Always a `GuestflowError::Sync` wrapping the store's error
    pub error: GuestflowError,
}

/// Callback type for sync failures (toasts, telemetry).
pub type SyncErrorCallback = Arc<dyn Fn(&SyncFailure) + Send + Sync>;

/// Callback type invoked once the completion marker has been written.
pub type CompletionCallback = Arc<dyn Fn(&SessionKey) + Send + Sync>;

/// Writes store contents to the document store and settles sync bookkeeping.
///
/// Cheap to clone; debounced tasks carry their own copy.
#[derive(Clone)]
struct ProgressWriter {
    repository: Arc<dyn SessionRepository>,
    store: SharedRuntimeStore,
    on_error: Option<SyncErrorCallback>,
}

impl ProgressWriter {
    /// Pushes the requested collections as they are right now.
    async fn push(
        &self,
        trigger: SyncTrigger,
        include_responses: bool,
        include_media: bool,
    ) -> Result<()> {
        let (key, update, attachment) = {
            let mut store = write_store(&self.store)?;
            let key = attached_key(&store, trigger)?;
            let update = store.progress_update(include_responses, include_media);
            (key, update, store.begin_sync())
        };

        tracing::debug!(
            "[SyncOrchestrator] Pushing {} for session {} (responses: {}, media: {})",
            trigger,
            key,
            update.responses.as_ref().map_or(0, Vec::len),
            update.captured_media.as_ref().map_or(0, Vec::len)
        );

        let result = self.repository.write_progress(&key, &update).await;
        self.settle(trigger, key, attachment, result)
    }

    /// Writes the durable completion marker.
    async fn mark_completed(&self) -> Result<SessionKey> {
        let trigger = SyncTrigger::Completion;
        let (key, attachment) = {
            let mut store = write_store(&self.store)?;
            let key = attached_key(&store, trigger)?;
            (key, store.begin_sync())
        };

        let result = self.repository.mark_completed(&key).await;
        self.settle(trigger, key.clone(), attachment, result)?;

        let mut store = write_store(&self.store)?;
        if store.attachment() == attachment {
            store.settle_completion();
        }
        Ok(key)
    }

    fn settle(
        &self,
        trigger: SyncTrigger,
        key: SessionKey,
        attachment: u64,
        result: Result<()>,
    ) -> Result<()> {
        let current = {
            let mut store = write_store(&self.store)?;
            store.finish_sync(attachment, result.is_ok().then(Utc::now));
            store.attachment() == attachment
        };

        match result {
            Ok(()) => Ok(()),
            Err(source) => {
                let error = GuestflowError::sync(trigger, &source);
                tracing::warn!("[SyncOrchestrator] {} (session {})", error, key);

                // Writes outliving their attachment have no UI-visible effect.
                if current {
                    if let Some(callback) = &self.on_error {
                        callback(&SyncFailure {
                            session: key,
                            trigger,
                            error: error.clone(),
                        });
                    }
                }
                Err(error)
            }
        }
    }
}

fn attached_key(store: &RuntimeStore, trigger: SyncTrigger) -> Result<SessionKey> {
    store.session_key().cloned().ok_or_else(|| {
        GuestflowError::illegal("sync", format!("no session is attached ({})", trigger))
    })
}

/// Owns the runtime store of one attachment and every write made from it.
pub struct SyncOrchestrator {
    store: SharedRuntimeStore,
    writer: ProgressWriter,
    debounce: Duration,
    runtime: Handle,
    /// Token of the scheduled response-edit write, if any
    pending: Mutex<Option<CancellationToken>>,
    on_complete: Option<CompletionCallback>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator with a fresh, unattached store.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when called outside a Tokio runtime; debounced
    /// writes are spawned onto the runtime captured here.
    pub fn new(repository: Arc<dyn SessionRepository>, config: &RuntimeConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            GuestflowError::internal(format!("Sync orchestrator requires a Tokio runtime: {}", e))
        })?;
        let store: SharedRuntimeStore = Arc::new(RwLock::new(RuntimeStore::new(
            StepValidator::new(config.unknown_step_policy),
        )));

        Ok(Self {
            writer: ProgressWriter {
                repository,
                store: store.clone(),
                on_error: None,
            },
            store,
            debounce: config.debounce(),
            runtime,
            pending: Mutex::new(None),
            on_complete: None,
        })
    }

    /// Sets the callback invoked for every failed write.
    pub fn with_error_callback(mut self, callback: SyncErrorCallback) -> Self {
        self.writer.on_error = Some(callback);
        self
    }

    /// Sets the callback invoked after the completion marker is written.
    pub fn with_completion_callback(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn store(&self) -> SharedRuntimeStore {
        self.store.clone()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Schedules a responses-only write after the quiet period.
    ///
    /// A call made while a write is still scheduled cancels it and restarts
    /// the timer, so a burst of edits produces one write carrying the last
    /// value.
    pub fn schedule_response_sync(&self) -> Result<()> {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock_pending()?.replace(token.clone()) {
            previous.cancel();
        }

        let writer = self.writer.clone();
        let delay = self.debounce;
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Consumed; a later flush has nothing left to send.
                    token.cancel();
                    if let Err(e) = writer.push(SyncTrigger::ResponseEdit, true, false).await {
                        tracing::debug!("[SyncOrchestrator] Debounced write not applied: {}", e);
                    }
                }
            }
        });
        Ok(())
    }

    /// Writes a scheduled response edit now instead of waiting for the timer.
    ///
    /// Does nothing when no write is scheduled.
    pub async fn flush(&self) -> Result<()> {
        if self.cancel_pending()? {
            self.writer.push(SyncTrigger::Flush, true, false).await?;
        }
        Ok(())
    }

    /// Pushes responses and media after the cursor moved forward.
    pub async fn sync_forward(&self) -> Result<()> {
        // The full push supersedes any scheduled edit write.
        self.cancel_pending()?;
        self.writer
            .push(SyncTrigger::ForwardNavigation, true, true)
            .await
    }

    /// Pushes captured media immediately. Responses are not re-sent.
    pub async fn sync_media(&self) -> Result<()> {
        self.writer
            .push(SyncTrigger::MediaCapture, false, true)
            .await
    }

    /// Runs the completion protocol for a store already marked complete.
    ///
    /// 1. push the final responses and media, and wait for success
    /// 2. write the completion marker
    /// 3. invoke the completion callback
    ///
    /// A failure at any step stops the protocol; later steps never run.
    pub async fn complete(&self) -> Result<()> {
        {
            let store = read_store(&self.store)?;
            if !store.is_complete() {
                return Err(GuestflowError::illegal(
                    "complete",
                    "the runtime has not reached completion",
                ));
            }
        }
        self.cancel_pending()?;

        self.writer.push(SyncTrigger::Completion, true, true).await?;
        let key = self.writer.mark_completed().await?;

        tracing::info!("[SyncOrchestrator] Session {} completed", key);
        if let Some(callback) = &self.on_complete {
            callback(&key);
        }
        Ok(())
    }

    /// Cancels a scheduled response write. Returns `true` if one was pending.
    fn cancel_pending(&self) -> Result<bool> {
        match self.lock_pending()?.take() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn lock_pending(&self) -> Result<std::sync::MutexGuard<'_, Option<CancellationToken>>> {
        self.pending
            .lock()
            .map_err(|_| GuestflowError::internal("debounce lock poisoned"))
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
