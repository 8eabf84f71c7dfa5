//! Application layer for Guestflow.
//!
//! This crate coordinates the domain runtime with the session document store:
//! the sync orchestrator, the runtime façade and the session use case.

pub mod runtime;
pub mod session_usecase;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use runtime::{ExperienceRuntime, NextOutcome};
pub use session_usecase::SessionUseCase;
pub use sync::{CompletionCallback, SyncErrorCallback, SyncFailure, SyncOrchestrator};
