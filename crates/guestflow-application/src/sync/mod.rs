//! Reconciliation of the runtime store with the session document store.

mod orchestrator;

pub use orchestrator::{CompletionCallback, SyncErrorCallback, SyncFailure, SyncOrchestrator};
